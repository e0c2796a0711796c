//! Root-only user management.

#[cfg(test)]
#[path = "users_test.rs"]
mod users_test;

use jiuwen_session::{Requirement, SiteClient};
use leptos::prelude::*;
use leptos_router::hooks::use_navigate;
use schema::{NewUser, Role, User};

use crate::state::session::use_session;
use crate::util::auth::{install_access_guard, pending_message};

/// Build a create-user request from the form fields.
pub fn validate_new_user(username: &str, email: &str, password: &str, role: &str) -> Result<NewUser, &'static str> {
    let username = username.trim();
    let email = email.trim();
    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err("Username, email, and password are required.");
    }
    if !email.contains('@') {
        return Err("Enter a valid email address.");
    }
    let role = Role::parse(role).ok_or("Choose a role.")?;
    Ok(NewUser { username: username.to_owned(), email: email.to_owned(), password: password.to_owned(), role })
}

pub fn status_label(user: &User) -> &'static str {
    if user.is_active { "Active" } else { "Disabled" }
}

#[component]
pub fn UsersPage() -> impl IntoView {
    let session = use_session();
    let decision = install_access_guard(&session, Requirement::Root, use_navigate());

    view! {
        <div class="admin-page">
            {move || match pending_message(&decision.get()) {
                Some(message) => view! { <div class="admin-page__loading">{message}</div> }.into_any(),
                None => view! { <UserManagement/> }.into_any(),
            }}
        </div>
    }
}

#[component]
fn UserManagement() -> impl IntoView {
    let site = use_session().site;
    let users = RwSignal::new(Vec::<User>::new());
    let error = RwSignal::new(None::<String>);

    let username = RwSignal::new(String::new());
    let email = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let role = RwSignal::new(Role::Developer.as_str().to_owned());

    if let Some(site) = site.clone() {
        load_users(site, users, error);
    }

    let create_site = site.clone();
    let on_create = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let new_user = match validate_new_user(&username.get(), &email.get(), &password.get(), &role.get()) {
            Ok(new_user) => new_user,
            Err(message) => {
                error.set(Some(message.to_owned()));
                return;
            }
        };
        let Some(site) = create_site.clone() else {
            return;
        };
        #[cfg(feature = "hydrate")]
        leptos::task::spawn_local(async move {
            match site.create_user(&new_user).await {
                Ok(created) => {
                    users.update(|list| list.push(created));
                    username.set(String::new());
                    email.set(String::new());
                    password.set(String::new());
                    error.set(None);
                }
                Err(err) => error.set(Some(err.user_message())),
            }
        });
        #[cfg(not(feature = "hydrate"))]
        let _ = (site, new_user);
    };

    let delete = move |id: i64| {
        let Some(site) = site.clone() else {
            return;
        };
        #[cfg(feature = "hydrate")]
        leptos::task::spawn_local(async move {
            match site.delete_user(id).await {
                Ok(()) => users.update(|list| list.retain(|user| user.id != id)),
                Err(err) => error.set(Some(err.user_message())),
            }
        });
        #[cfg(not(feature = "hydrate"))]
        let _ = (site, id);
    };

    view! {
        <div class="users-console">
            <h1>"Users"</h1>
            <Show when=move || error.get().is_some()>
                <div class="admin-console__error">{move || error.get().unwrap_or_default()}</div>
            </Show>
            <table class="users-table">
                <thead>
                    <tr>
                        <th>"Username"</th>
                        <th>"Email"</th>
                        <th>"Role"</th>
                        <th>"Status"</th>
                        <th></th>
                    </tr>
                </thead>
                <tbody>
                    {move || {
                        users
                            .get()
                            .into_iter()
                            .map(|user| {
                                let delete = delete.clone();
                                let id = user.id;
                                let status = status_label(&user);
                                view! {
                                    <tr>
                                        <td>{user.username}</td>
                                        <td>{user.email.unwrap_or_default()}</td>
                                        <td>{user.role.label()}</td>
                                        <td>{status}</td>
                                        <td>
                                            <button on:click=move |_| delete(id)>"Delete"</button>
                                        </td>
                                    </tr>
                                }
                            })
                            .collect_view()
                    }}
                </tbody>
            </table>
            <form class="users-form" on:submit=on_create>
                <input
                    type="text"
                    placeholder="Username"
                    prop:value=move || username.get()
                    on:input=move |ev| username.set(event_target_value(&ev))
                />
                <input
                    type="email"
                    placeholder="Email"
                    prop:value=move || email.get()
                    on:input=move |ev| email.set(event_target_value(&ev))
                />
                <input
                    type="password"
                    placeholder="Password"
                    prop:value=move || password.get()
                    on:input=move |ev| password.set(event_target_value(&ev))
                />
                <select prop:value=move || role.get() on:change=move |ev| role.set(event_target_value(&ev))>
                    {Role::ALL
                        .into_iter()
                        .map(|option| view! { <option value=option.as_str()>{option.label()}</option> })
                        .collect_view()}
                </select>
                <button type="submit">"Create user"</button>
            </form>
        </div>
    }
}

fn load_users(site: SiteClient, users: RwSignal<Vec<User>>, error: RwSignal<Option<String>>) {
    #[cfg(feature = "hydrate")]
    leptos::task::spawn_local(async move {
        match site.list_users().await {
            Ok(list) => users.set(list),
            Err(err) => {
                log::warn!("user list failed: {err}");
                error.set(Some(err.user_message()));
            }
        }
    });
    #[cfg(not(feature = "hydrate"))]
    let _ = (site, users, error);
}
