//! Auth API seam and its HTTP implementation.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session store talks to the backend only through [`AuthApi`]. The
//! production implementation, [`HttpAuthApi`], speaks JSON to the four
//! `/api/auth/*` endpoints; tests substitute an in-memory fake.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use reqwest::Method;
use schema::{AuthResponse, LoginRequest, RegisterRequest, User};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::rest::RestClient;

const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";
const LOGOUT_PATH: &str = "/api/auth/logout";
const ME_PATH: &str = "/api/auth/me";

/// Backend operations the session store depends on.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token and the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns the transport, status, or decode failure unchanged.
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, SessionError>;

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns the transport, status, or decode failure unchanged.
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, SessionError>;

    /// Tell the backend the session ended.
    ///
    /// # Errors
    ///
    /// Returns the transport or status failure; callers treat it as advisory.
    async fn logout(&self, token: Option<&str>) -> Result<(), SessionError>;

    /// Look up the user a bearer token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for rejected tokens and `MalformedResponse` for
    /// ill-formed user records.
    async fn current_user(&self, token: &str) -> Result<User, SessionError>;
}

/// [`AuthApi`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpAuthApi {
    rest: RestClient,
}

impl HttpAuthApi {
    /// # Errors
    ///
    /// Returns [`SessionError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        Ok(Self { rest: RestClient::new(config)? })
    }

    #[must_use]
    pub fn from_rest(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, SessionError> {
        let response = self.rest.send_json(Method::POST, LOGIN_PATH, None, request).await?;
        validate_auth_response(response)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, SessionError> {
        let response = self.rest.send_json(Method::POST, REGISTER_PATH, None, request).await?;
        validate_auth_response(response)
    }

    async fn logout(&self, token: Option<&str>) -> Result<(), SessionError> {
        self.rest.send_empty(Method::POST, LOGOUT_PATH, token).await
    }

    async fn current_user(&self, token: &str) -> Result<User, SessionError> {
        let user: User = self.rest.get(ME_PATH, Some(token), &[]).await?;
        user.validate()?;
        Ok(user)
    }
}

/// Reject responses whose token is blank or whose user record is ill-formed.
///
/// # Errors
///
/// Returns [`SessionError::MalformedResponse`].
pub fn validate_auth_response(response: AuthResponse) -> Result<AuthResponse, SessionError> {
    if response.access_token.trim().is_empty() {
        return Err(SessionError::MalformedResponse("empty access token".to_owned()));
    }
    response.user.validate()?;
    Ok(response)
}
