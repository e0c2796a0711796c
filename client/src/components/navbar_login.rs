//! Navbar sign-in control and account menu.
//!
//! SYSTEM CONTEXT
//! ==============
//! Renders nothing while the session loads, a sign-in link when signed out,
//! and the username with a role badge otherwise. The dropdown closes on any
//! click outside it; that document listener is removed when the item
//! unmounts.

#[cfg(test)]
#[path = "navbar_login_test.rs"]
mod navbar_login_test;

use leptos::html::Div;
use leptos::prelude::*;

use crate::state::auth::AuthState;
use crate::state::session::use_session;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuEntry {
    AdminConsole,
    ManageUsers,
    SignOut,
}

impl MenuEntry {
    pub fn label(self) -> &'static str {
        match self {
            Self::AdminConsole => "Admin console",
            Self::ManageUsers => "Manage users",
            Self::SignOut => "Sign out",
        }
    }

    pub fn href(self) -> Option<&'static str> {
        match self {
            Self::AdminConsole => Some("/admin"),
            Self::ManageUsers => Some("/admin/users"),
            Self::SignOut => None,
        }
    }
}

/// Dropdown entries for the signed-in account.
pub fn menu_entries(state: &AuthState) -> Vec<MenuEntry> {
    let mut entries = Vec::new();
    if state.is_admin {
        entries.push(MenuEntry::AdminConsole);
    }
    if state.is_root {
        entries.push(MenuEntry::ManageUsers);
    }
    entries.push(MenuEntry::SignOut);
    entries
}

pub fn role_badge(state: &AuthState) -> Option<&'static str> {
    state.user.as_ref().map(|user| user.role.label())
}

#[component]
pub fn LoginNavbarItem() -> impl IntoView {
    let session = use_session();
    let auth = session.auth;
    let handle = session.handle.clone();
    let open = RwSignal::new(false);
    let menu_ref = NodeRef::<Div>::new();

    #[cfg(feature = "hydrate")]
    {
        use wasm_bindgen::JsCast;

        let listener = window_event_listener(leptos::ev::mousedown, move |ev| {
            if !open.get_untracked() {
                return;
            }
            let Some(menu) = menu_ref.get_untracked() else {
                return;
            };
            let target = ev.target().and_then(|target| target.dyn_into::<web_sys::Node>().ok());
            if !menu.contains(target.as_ref()) {
                open.set(false);
            }
        });
        on_cleanup(move || listener.remove());
    }

    let sign_out = move || {
        open.set(false);
        #[cfg(feature = "hydrate")]
        {
            let handle = handle.clone();
            leptos::task::spawn_local(async move {
                if let Err(err) = handle.logout().await {
                    log::warn!("sign out did not complete cleanly: {err}");
                }
            });
        }
        #[cfg(not(feature = "hydrate"))]
        let _ = &handle;
    };

    view! {
        {move || {
            let state = auth.get();
            if state.loading {
                return view! { <span class="navbar-login navbar-login--pending"></span> }.into_any();
            }
            let Some(name) = state.display_name().map(str::to_owned) else {
                return view! { <a class="navbar-login__button" href="/login">"Sign in"</a> }.into_any();
            };
            let badge = role_badge(&state).unwrap_or_default();
            let entries = menu_entries(&state);
            let sign_out = sign_out.clone();
            view! {
                <div class="navbar-login" node_ref=menu_ref>
                    <button class="navbar-login__user" type="button" on:click=move |_| open.update(|o| *o = !*o)>
                        <span class="navbar-login__name">{name}</span>
                        <span class="navbar-login__role">{badge}</span>
                        <span class="navbar-login__arrow">"▼"</span>
                    </button>
                    <Show when=move || open.get()>
                        <div class="navbar-login__dropdown">
                            {entries
                                .iter()
                                .map(|entry| {
                                    let entry = *entry;
                                    let sign_out = sign_out.clone();
                                    match entry.href() {
                                        Some(href) => {
                                            view! {
                                                <a class="navbar-login__item" href=href on:click=move |_| open.set(false)>
                                                    {entry.label()}
                                                </a>
                                            }
                                                .into_any()
                                        }
                                        None => {
                                            view! {
                                                <button class="navbar-login__item" type="button" on:click=move |_| sign_out()>
                                                    {entry.label()}
                                                </button>
                                            }
                                                .into_any()
                                        }
                                    }
                                })
                                .collect_view()}
                        </div>
                    </Show>
                </div>
            }
                .into_any()
        }}
    }
}
