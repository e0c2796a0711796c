//! Error taxonomy for session operations.
//!
//! PROPAGATION
//! ===========
//! `login`/`register` hand these back to the caller unchanged. `resolve` and
//! `refresh` log and swallow them, degrading to an unauthenticated session.
//! `logout` never fails locally; a remote failure is only logged.

/// Errors raised by the session core and its HTTP collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The API could not be reached or the transport failed mid-request.
    #[error("auth API unreachable: {0}")]
    Network(String),

    /// The credentials or the bearer token were rejected (401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The response body could not be decoded or the user record is ill-formed.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A mutating operation ran without a reachable live store.
    #[error("session store unavailable: {0}")]
    CallerMisuse(String),

    /// Any other non-success status. `message` comes from the error body when present.
    #[error("API returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// The persisted token could not be written or removed.
    #[error("token storage failed: {0}")]
    Storage(String),

    /// A configuration value could not be parsed.
    #[error("invalid config: {0}")]
    Config(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl SessionError {
    /// Whether the failure means the current credential is no longer valid.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Text suitable for showing next to a login form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized(message) | Self::Api { message, .. } if !message.is_empty() => message.clone(),
            Self::Unauthorized(_) => "Incorrect username or password".to_owned(),
            Self::Network(_) => "Cannot reach the server, please try again later".to_owned(),
            other => other.to_string(),
        }
    }
}

impl From<schema::UserRecordError> for SessionError {
    fn from(error: schema::UserRecordError) -> Self {
        Self::MalformedResponse(error.to_string())
    }
}
