//! Username + password login page.
//!
//! SYSTEM CONTEXT
//! ==============
//! Signs in through the page's session handle. When a token is already
//! persisted and still being checked, the form is replaced by a verifying
//! notice so a signed-in visitor is not asked for credentials again. The
//! notice lasts at most the session wait budget.

#[cfg(test)]
#[path = "login_test.rs"]
mod login_test;

use leptos::prelude::*;
use leptos_router::NavigateOptions;
use leptos_router::hooks::use_navigate;

use crate::state::auth::AuthState;
use crate::state::session::use_session;
use crate::util::auth::install_wait_budget;

/// What the login route shows for the current session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginView {
    /// A persisted token is still being resolved.
    Verifying,
    Form,
    /// Already signed in; leave for home.
    SignedIn,
}

/// `wait_expired` ends the verifying notice once the wait budget runs out.
pub fn login_view(state: &AuthState, wait_expired: bool) -> LoginView {
    if state.user.is_some() {
        LoginView::SignedIn
    } else if state.loading && state.token_present && !wait_expired {
        LoginView::Verifying
    } else {
        LoginView::Form
    }
}

/// Trim the username and require both fields.
pub fn validate_login_input(username: &str, password: &str) -> Result<(String, String), &'static str> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err("Enter both username and password.");
    }
    Ok((username.to_owned(), password.to_owned()))
}

pub fn submit_label(busy: bool) -> &'static str {
    if busy { "Signing in..." } else { "Sign in" }
}

#[component]
pub fn LoginPage() -> impl IntoView {
    let session = use_session();
    let auth = session.auth;
    let handle = session.handle.clone();
    let navigate = use_navigate();
    let wait_expired = install_wait_budget(&session);

    let username = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let error = RwSignal::new(None::<String>);
    let busy = RwSignal::new(false);

    let navigate_home = navigate.clone();
    Effect::new(move || {
        if login_view(&auth.get(), false) == LoginView::SignedIn {
            navigate_home("/", NavigateOptions::default());
        }
    });

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if busy.get() {
            return;
        }
        let (name, secret) = match validate_login_input(&username.get(), &password.get()) {
            Ok(values) => values,
            Err(message) => {
                error.set(Some(message.to_owned()));
                return;
            }
        };
        error.set(None);
        busy.set(true);

        #[cfg(feature = "hydrate")]
        {
            let handle = handle.clone();
            let navigate = navigate.clone();
            leptos::task::spawn_local(async move {
                match handle.login(&name, &secret).await {
                    Ok(()) => navigate("/", NavigateOptions::default()),
                    Err(err) => {
                        log::info!("login failed: {err}");
                        error.set(Some(err.user_message()));
                        busy.set(false);
                    }
                }
            });
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (&handle, &navigate, name, secret);
        }
    };

    view! {
        <div class="login-page">
            <div class="login-card">
                <h1>"Sign in"</h1>
                {move || match login_view(&auth.get(), wait_expired.get()) {
                    LoginView::Verifying | LoginView::SignedIn => {
                        view! { <p class="login-message">"Checking your session..."</p> }.into_any()
                    }
                    LoginView::Form => {
                        view! {
                            <form class="login-form" on:submit=on_submit.clone()>
                                <Show when=move || error.get().is_some()>
                                    <p class="login-message login-message--error">
                                        {move || error.get().unwrap_or_default()}
                                    </p>
                                </Show>
                                <input
                                    class="login-input"
                                    type="text"
                                    autocomplete="username"
                                    placeholder="Username"
                                    prop:value=move || username.get()
                                    on:input=move |ev| username.set(event_target_value(&ev))
                                />
                                <input
                                    class="login-input"
                                    type="password"
                                    autocomplete="current-password"
                                    placeholder="Password"
                                    prop:value=move || password.get()
                                    on:input=move |ev| password.set(event_target_value(&ev))
                                />
                                <button class="login-button" type="submit" disabled=move || busy.get()>
                                    {move || submit_label(busy.get())}
                                </button>
                            </form>
                        }
                            .into_any()
                    }
                }}
            </div>
        </div>
    }
}
