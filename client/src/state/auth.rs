//! Auth-session state for the current browser user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Used by route guards and user-aware components to coordinate login redirects
//! and identity-dependent rendering. The signal mirrors the session store; it
//! is never written from anywhere else.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use jiuwen_session::{Backing, Session, SessionView};
use schema::User;

/// Reactive copy of the session plus whether a token is persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub loading: bool,
    pub is_admin: bool,
    pub is_root: bool,
    /// Backed by the page's session store rather than a fallback.
    pub live: bool,
    pub token_present: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self { user: None, loading: true, is_admin: false, is_root: false, live: true, token_present: false }
    }
}

impl AuthState {
    pub fn from_view(view: &SessionView, token_present: bool) -> Self {
        Self {
            user: view.user.clone(),
            loading: view.loading,
            is_admin: view.is_admin,
            is_root: view.is_root,
            live: view.is_live(),
            token_present,
        }
    }

    pub fn from_session(session: &Session, token_present: bool) -> Self {
        Self::from_view(&SessionView::from_session(session), token_present)
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            user: self.user.clone(),
            loading: self.loading,
            is_admin: self.is_admin,
            is_root: self.is_root,
            backing: if self.live { Backing::Live } else { Backing::Fallback },
        }
    }

    /// Name shown in the navbar.
    pub fn display_name(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.username.as_str())
    }
}
