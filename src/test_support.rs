//! Fakes shared by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use schema::{AuthResponse, LoginRequest, RegisterRequest, Role, User};
use tokio::sync::Notify;

use crate::api::AuthApi;
use crate::error::SessionError;
use crate::platform::{Navigator, Platform};
use crate::token::{MemoryTokenStore, TokenStore};

pub(crate) fn user(id: i64, username: &str, role: Role) -> User {
    User { id, username: username.to_owned(), email: None, role, is_active: true }
}

pub(crate) fn developer001() -> User {
    user(1, "developer001", Role::Developer)
}

struct Account {
    password: String,
    user: User,
    token: String,
}

#[derive(Default)]
struct FakeState {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, Result<User, SessionError>>,
    me_calls: Vec<String>,
    login_calls: usize,
    logout_calls: Vec<Option<String>>,
    logout_error: Option<SessionError>,
    next_id: i64,
}

/// In-memory auth backend. `current_user` can be held open with
/// [`FakeAuthApi::hold_current_user`] to interleave operations.
#[derive(Default)]
pub(crate) struct FakeAuthApi {
    state: Mutex<FakeState>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeAuthApi {
    pub(crate) fn new() -> Self {
        let api = Self::default();
        api.state.lock().unwrap().next_id = 100;
        api
    }

    pub(crate) fn with_account(self, password: &str, user: User, token: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.sessions.insert(token.to_owned(), Ok(user.clone()));
            state
                .accounts
                .insert(user.username.clone(), Account { password: password.to_owned(), user, token: token.to_owned() });
        }
        self
    }

    pub(crate) fn with_session(self, token: &str, outcome: Result<User, SessionError>) -> Self {
        self.state.lock().unwrap().sessions.insert(token.to_owned(), outcome);
        self
    }

    pub(crate) fn failing_logout(self, error: SessionError) -> Self {
        self.state.lock().unwrap().logout_error = Some(error);
        self
    }

    /// Make `current_user` wait until the returned notify fires.
    pub(crate) fn hold_current_user(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    pub(crate) fn me_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().me_calls.clone()
    }

    pub(crate) fn login_calls(&self) -> usize {
        self.state.lock().unwrap().login_calls
    }

    pub(crate) fn logout_calls(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().logout_calls.clone()
    }
}

#[async_trait::async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, SessionError> {
        let mut state = self.state.lock().unwrap();
        state.login_calls += 1;
        match state.accounts.get(&request.username) {
            Some(account) if account.password == request.password => {
                Ok(AuthResponse { access_token: account.token.clone(), user: account.user.clone() })
            }
            _ => Err(SessionError::Unauthorized("Incorrect username or password".to_owned())),
        }
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, SessionError> {
        let mut state = self.state.lock().unwrap();
        if state.accounts.contains_key(&request.username) {
            return Err(SessionError::Api { status: 400, message: "Username already registered".to_owned() });
        }
        state.next_id += 1;
        let mut created = user(state.next_id, &request.username, Role::Developer);
        created.email = Some(request.email.clone());
        let token = format!("reg-{}", request.username);
        state.sessions.insert(token.clone(), Ok(created.clone()));
        state.accounts.insert(
            request.username.clone(),
            Account { password: request.password.clone(), user: created.clone(), token: token.clone() },
        );
        Ok(AuthResponse { access_token: token, user: created })
    }

    async fn logout(&self, token: Option<&str>) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        state.logout_calls.push(token.map(str::to_owned));
        match &state.logout_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn current_user(&self, token: &str) -> Result<User, SessionError> {
        self.state.lock().unwrap().me_calls.push(token.to_owned());
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.state
            .lock()
            .unwrap()
            .sessions
            .get(token)
            .cloned()
            .unwrap_or_else(|| Err(SessionError::Unauthorized("Could not validate credentials".to_owned())))
    }
}

/// Navigator that records every requested route.
#[derive(Default)]
pub(crate) struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub(crate) fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn reload_to(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_owned());
    }
}

/// Browser platform over `api` and `tokens`.
pub(crate) fn platform(api: &Arc<FakeAuthApi>, tokens: &MemoryTokenStore) -> Platform {
    let api: Arc<dyn AuthApi> = api.clone();
    let tokens: Arc<dyn TokenStore> = Arc::new(tokens.clone());
    Platform::browser(api, tokens)
}
