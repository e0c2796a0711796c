//! What pages and components hold instead of the store itself.
//!
//! DESIGN
//! ======
//! [`SessionHandle`] is either backed by a live [`SessionStore`] or detached.
//! A detached handle still answers every call. During pre-render it is inert.
//! In a browser with no reachable store it performs the remote call itself,
//! updates the persisted token, and reloads the page at the home route so the
//! next load mounts a proper store.
//!
//! [`SessionHandle::view`] is a pure read. Two views of an unchanged session
//! compare equal, so consumers can use them as memo or effect keys.

#[cfg(test)]
#[path = "facade_test.rs"]
mod facade_test;

use schema::{LoginRequest, RegisterRequest, User};
use tokio::sync::watch;

use crate::api::validate_auth_response;
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::platform::{Platform, RenderMode};
use crate::store::{Session, SessionStore};

/// Whether a view came from a live store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backing {
    Live,
    Fallback,
}

/// Read-only snapshot handed to consumers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionView {
    pub user: Option<User>,
    pub loading: bool,
    pub is_admin: bool,
    pub is_root: bool,
    pub backing: Backing,
}

impl SessionView {
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        Self {
            user: session.user.clone(),
            loading: session.loading(),
            is_admin: session.is_admin(),
            is_root: session.is_root(),
            backing: Backing::Live,
        }
    }

    /// Signed-out, settled view of a detached handle.
    #[must_use]
    pub fn detached() -> Self {
        Self { user: None, loading: false, is_admin: false, is_root: false, backing: Backing::Fallback }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.backing == Backing::Live
    }
}

/// Behavior of a handle with no live store.
#[derive(Clone, Debug)]
pub enum Fallback {
    /// Static, signed-out, every operation a no-op.
    PreRender,
    /// Direct API calls followed by a full reload.
    Direct(Platform),
}

#[derive(Clone, Debug)]
pub enum SessionHandle {
    Live(SessionStore),
    Detached(Fallback),
}

impl SessionHandle {
    /// Handle for `store`, or the fallback that fits `platform` when no store
    /// is reachable.
    #[must_use]
    pub fn connect(store: Option<&SessionStore>, platform: &Platform) -> Self {
        if let Some(store) = store {
            return Self::Live(store.clone());
        }
        match platform.mode {
            RenderMode::PreRender => Self::Detached(Fallback::PreRender),
            RenderMode::Browser => {
                tracing::warn!("session used outside a session provider; falling back to direct API calls");
                Self::Detached(Fallback::Direct(platform.clone()))
            }
        }
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        match self {
            Self::Live(store) => SessionView::from_session(&store.session()),
            Self::Detached(_) => SessionView::detached(),
        }
    }

    #[must_use]
    pub fn store(&self) -> Option<&SessionStore> {
        match self {
            Self::Live(store) => Some(store),
            Self::Detached(_) => None,
        }
    }

    /// Follow state changes. Detached handles never change.
    #[must_use]
    pub fn watch(&self) -> Option<watch::Receiver<Session>> {
        self.store().map(SessionStore::watch)
    }

    /// # Errors
    ///
    /// Returns the store's or the API's error unchanged; nothing is navigated
    /// on failure.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), SessionError> {
        match self {
            Self::Live(store) => store.login(username, password).await.map(drop),
            Self::Detached(Fallback::PreRender) => Ok(()),
            Self::Detached(Fallback::Direct(platform)) => {
                let request = LoginRequest { username: username.to_owned(), password: password.to_owned() };
                let response = validate_auth_response(platform.api.login(&request).await?)?;
                direct_sign_in(platform, &response.access_token, response.user)
            }
        }
    }

    /// # Errors
    ///
    /// Same contract as [`Self::login`].
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<(), SessionError> {
        match self {
            Self::Live(store) => store.register(username, email, password).await.map(drop),
            Self::Detached(Fallback::PreRender) => Ok(()),
            Self::Detached(Fallback::Direct(platform)) => {
                let request = RegisterRequest {
                    username: username.to_owned(),
                    email: email.to_owned(),
                    password: password.to_owned(),
                };
                let response = validate_auth_response(platform.api.register(&request).await?)?;
                direct_sign_in(platform, &response.access_token, response.user)
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`SessionError::CallerMisuse`] if the live store is closed.
    pub async fn logout(&self) -> Result<(), SessionError> {
        match self {
            Self::Live(store) => store.logout().await,
            Self::Detached(Fallback::PreRender) => Ok(()),
            Self::Detached(Fallback::Direct(platform)) => {
                let token = platform.tokens.get();
                if let Some(token) = token.as_deref() {
                    if let Err(error) = platform.api.logout(Some(token)).await {
                        tracing::warn!(%error, "remote logout failed; clearing local token anyway");
                    }
                }
                if let Err(error) = platform.tokens.remove() {
                    tracing::warn!(%error, "failed to remove persisted token");
                }
                platform.events.emit(&SessionEvent::Logout);
                platform.navigator.reload_to(&platform.home_route);
                Ok(())
            }
        }
    }

    /// Re-resolve a live store. Detached handles have nothing to refresh.
    pub async fn refresh(&self) {
        if let Self::Live(store) = self {
            store.refresh().await;
        }
    }
}

fn direct_sign_in(platform: &Platform, token: &str, user: User) -> Result<(), SessionError> {
    platform.tokens.set(token)?;
    tracing::info!(user_id = user.id, username = %user.username, "signed in without a session store; reloading");
    platform.events.emit(&SessionEvent::Login(user));
    platform.navigator.reload_to(&platform.home_route);
    Ok(())
}
