//! The session store: one page's source of truth for who is signed in.
//!
//! SYSTEM CONTEXT
//! ==============
//! A store owns the in-memory [`Session`] for one rendering root. It
//! reconciles that state with the persisted token (on mount and whenever
//! another tab changes it) and with [`SessionEvent`]s raised by other
//! components on the page.
//!
//! DESIGN
//! ======
//! State lives in a `tokio::sync::watch` channel so reactive consumers can
//! follow it. Every local mutation (login, register, logout, a cross-tab
//! change, a bus event) bumps a generation counter before writing. A
//! resolution records the generation it started under and applies its result
//! only if nothing newer was written meanwhile, so a slow `/me` lookup never
//! overwrites a login that completed first. Resolutions are serialized
//! through an async gate.
//!
//! ERROR HANDLING
//! ==============
//! `login`/`register` return failures unchanged and leave state untouched.
//! `resolve`/`refresh` log failures and settle on an unauthenticated
//! session. `logout` always clears locally; its remote call is advisory.
//! After [`SessionStore::close`], in-flight completions are discarded and
//! mutating calls return [`SessionError::CallerMisuse`].

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use schema::{AuthResponse, LoginRequest, RegisterRequest, User};
use tokio::sync::watch;

use crate::api::validate_auth_response;
use crate::error::SessionError;
use crate::events::{SessionEvent, Subscription};
use crate::platform::Platform;
use crate::token::TokenChange;

// =============================================================================
// SESSION
// =============================================================================

/// Resolution progress. Moves forward only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Resolving,
    Ready,
}

/// In-memory authentication state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub status: SessionStatus,
}

impl Default for Session {
    fn default() -> Self {
        Self { user: None, status: SessionStatus::Uninitialized }
    }
}

impl Session {
    fn ready(user: Option<User>) -> Self {
        Self { user, status: SessionStatus::Ready }
    }

    /// True until the first resolution settles.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.status != SessionStatus::Ready
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_root)
    }
}

// =============================================================================
// STORE
// =============================================================================

struct StoreInner {
    platform: Platform,
    state: watch::Sender<Session>,
    generation: AtomicU64,
    resolve_gate: tokio::sync::Mutex<()>,
    closed: watch::Sender<bool>,
    bus_listener: Mutex<Option<Subscription>>,
}

impl StoreInner {
    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Write a settled session as the newest state.
    fn commit(&self, user: Option<User>, reason: &'static str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let next = Session::ready(user);
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            tracing::debug!(reason, "session updated");
        }
    }

    /// Write a resolution result unless a newer state landed since `started`.
    fn commit_resolved(&self, started: u64, user: Option<User>) -> bool {
        let generation = &self.generation;
        let mut applied = false;
        self.state.send_if_modified(|current| {
            if generation.load(Ordering::SeqCst) != started {
                return false;
            }
            applied = true;
            let next = Session::ready(user);
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        applied
    }

    fn apply_event(&self, event: &SessionEvent) {
        if self.is_closed() {
            return;
        }
        match event {
            SessionEvent::Login(user) => {
                if self.platform.tokens.get().is_some() {
                    self.commit(Some(user.clone()), "login event");
                } else {
                    tracing::debug!(user_id = user.id, "ignoring login event without a persisted token");
                }
            }
            SessionEvent::Logout => self.commit(None, "logout event"),
        }
    }
}

/// Cloneable handle to one page's session store.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.inner.state.borrow())
            .field("closed", &self.inner.is_closed())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store in `Uninitialized` state and start listening on the
    /// platform's event bus. Nothing is resolved until [`Self::initialize`].
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        let (state, _) = watch::channel(Session::default());
        let (closed, _) = watch::channel(false);
        let inner = Arc::new(StoreInner {
            platform,
            state,
            generation: AtomicU64::new(0),
            resolve_gate: tokio::sync::Mutex::new(()),
            closed,
            bus_listener: Mutex::new(None),
        });

        let weak: Weak<StoreInner> = Arc::downgrade(&inner);
        let listener = inner.platform.events.subscribe(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.apply_event(event);
            }
        });
        *inner.bus_listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(listener);

        Self { inner }
    }

    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.inner.platform
    }

    /// Current state.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Follow state changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Whether a token is currently persisted.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.inner.platform.tokens.get().is_some()
    }

    fn ensure_open(&self, operation: &str) -> Result<(), SessionError> {
        if self.inner.is_closed() {
            return Err(SessionError::CallerMisuse(format!("{operation} called on a closed session store")));
        }
        Ok(())
    }

    /// Mount-time entry point: resolves once, while still `Uninitialized`.
    pub async fn initialize(&self) {
        if self.inner.state.borrow().status == SessionStatus::Uninitialized {
            self.resolve().await;
        }
    }

    /// Reconcile state with the persisted token.
    ///
    /// Never fails: lookup errors and malformed records discard the token and
    /// settle on a signed-out session.
    pub async fn resolve(&self) {
        let inner = &self.inner;
        if inner.is_closed() {
            return;
        }
        if inner.platform.is_prerender() {
            inner.commit(None, "pre-render");
            return;
        }

        let _gate = inner.resolve_gate.lock().await;
        if inner.is_closed() {
            return;
        }

        let Some(token) = inner.platform.tokens.get() else {
            inner.commit(None, "no persisted token");
            return;
        };

        let started = inner.generation();
        inner.state.send_if_modified(|current| {
            if current.status != SessionStatus::Uninitialized {
                return false;
            }
            current.status = SessionStatus::Resolving;
            true
        });

        let outcome = inner
            .platform
            .api
            .current_user(&token)
            .await
            .and_then(|user| user.validate().map(|()| user).map_err(SessionError::from));

        if inner.is_closed() {
            tracing::debug!("discarding resolution completed after close");
            return;
        }

        match outcome {
            Ok(user) => {
                let (user_id, role) = (user.id, user.role);
                if inner.commit_resolved(started, Some(user)) {
                    tracing::debug!(user_id, %role, "session resolved");
                } else {
                    tracing::debug!(user_id, "stale resolution discarded");
                }
            }
            Err(error) => {
                tracing::warn!(%error, "persisted token rejected; signing out locally");
                if inner.platform.tokens.get().as_deref() == Some(token.as_str()) {
                    if let Err(error) = inner.platform.tokens.remove() {
                        tracing::warn!(%error, "failed to discard rejected token");
                    }
                }
                inner.commit_resolved(started, None);
            }
        }
    }

    /// Re-run [`Self::resolve`].
    pub async fn refresh(&self) {
        self.resolve().await;
    }

    /// Sign in with credentials.
    ///
    /// # Errors
    ///
    /// Returns the API failure unchanged, [`SessionError::Storage`] if the
    /// token cannot be persisted, or [`SessionError::CallerMisuse`] after close.
    /// State is untouched on every error path.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, SessionError> {
        self.ensure_open("login")?;
        let request = LoginRequest { username: username.to_owned(), password: password.to_owned() };
        let response = self.inner.platform.api.login(&request).await?;
        self.establish(response, "login")
    }

    /// Create an account and sign in as it.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::login`].
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User, SessionError> {
        self.ensure_open("register")?;
        let request =
            RegisterRequest { username: username.to_owned(), email: email.to_owned(), password: password.to_owned() };
        let response = self.inner.platform.api.register(&request).await?;
        self.establish(response, "register")
    }

    fn establish(&self, response: AuthResponse, operation: &'static str) -> Result<User, SessionError> {
        self.ensure_open(operation)?;
        let AuthResponse { access_token, user } = validate_auth_response(response)?;
        self.inner.platform.tokens.set(&access_token)?;
        self.inner.commit(Some(user.clone()), operation);
        tracing::info!(user_id = user.id, username = %user.username, role = %user.role, operation, "signed in");
        self.inner.platform.events.emit(&SessionEvent::Login(user.clone()));
        Ok(user)
    }

    /// Sign out. Local state is cleared first; the remote call is best-effort
    /// and only made when a token was persisted.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CallerMisuse`] after close. Remote failures are
    /// logged, never returned.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.ensure_open("logout")?;
        let inner = &self.inner;
        let token = inner.platform.tokens.get();
        if let Err(error) = inner.platform.tokens.remove() {
            tracing::warn!(%error, "failed to remove persisted token");
        }
        inner.commit(None, "logout");
        tracing::info!("signed out");
        inner.platform.events.emit(&SessionEvent::Logout);

        if let Some(token) = token {
            if let Err(error) = inner.platform.api.logout(Some(&token)).await {
                tracing::warn!(%error, "remote logout failed; local session already cleared");
            }
        }
        Ok(())
    }

    /// React to another tab changing the persisted token.
    pub async fn handle_token_change(&self, change: TokenChange) {
        if self.inner.is_closed() {
            return;
        }
        if change.is_removal() {
            self.inner.commit(None, "token removed in another tab");
        } else {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            self.resolve().await;
        }
    }

    /// Task that follows the token store's change feed until the store
    /// closes or the feed ends. The subscription is taken when this is
    /// called, so changes made after the call are never missed.
    pub fn run_sync(&self) -> impl Future<Output = ()> + use<> {
        let store = self.clone();
        let mut changes = self.inner.platform.tokens.subscribe();
        let mut closed = self.inner.closed.subscribe();
        async move {
            loop {
                if *closed.borrow_and_update() {
                    break;
                }
                tokio::select! {
                    change = changes.changed() => match change {
                        Some(change) => store.handle_token_change(change).await,
                        None => break,
                    },
                    result = closed.changed() => {
                        if result.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("token sync stopped");
        }
    }

    /// Tear the store down. Pending completions are discarded, the bus
    /// listener is dropped, and [`Self::run_sync`] exits.
    pub fn close(&self) {
        if self.inner.closed.send_replace(true) {
            return;
        }
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let listener = self.inner.bus_listener.lock().unwrap_or_else(PoisonError::into_inner).take();
        drop(listener);
        tracing::debug!("session store closed");
    }
}
