//! Session configuration parsed from environment variables.
//!
//! Browser builds have no process environment, so parsing goes through a
//! lookup function; [`SessionConfig::from_env`] is the native convenience.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::error::SessionError;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TOKEN_KEY: &str = "auth_token";
pub const DEFAULT_HOME_ROUTE: &str = "/";
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// API origin without a trailing slash.
    pub api_base_url: String,
    /// Persistent-storage key holding the bearer token.
    pub token_key: String,
    /// Route a detached fallback navigates to after a direct login/logout.
    pub home_route: String,
    /// How long pages wait for the first resolution before giving up.
    pub ready_timeout: Duration,
    pub timeouts: HttpTimeouts,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            token_key: DEFAULT_TOKEN_KEY.to_owned(),
            home_route: DEFAULT_HOME_ROUTE.to_owned(),
            ready_timeout: Duration::from_millis(DEFAULT_READY_TIMEOUT_MS),
            timeouts: HttpTimeouts::default(),
        }
    }
}

impl SessionConfig {
    /// Build typed config from the process environment.
    ///
    /// Optional:
    /// - `JIUWEN_API_BASE_URL`: default `http://127.0.0.1:8000`
    /// - `JIUWEN_TOKEN_KEY`: default `auth_token`
    /// - `JIUWEN_HOME_ROUTE`: default `/`
    /// - `JIUWEN_READY_TIMEOUT_MS`: default 3000
    /// - `JIUWEN_REQUEST_TIMEOUT_SECS`: default 30
    /// - `JIUWEN_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] when a present value does not parse.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] when a present value does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SessionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = parse_base_url(lookup("JIUWEN_API_BASE_URL").as_deref())?;
        let token_key = non_empty(lookup("JIUWEN_TOKEN_KEY")).unwrap_or_else(|| DEFAULT_TOKEN_KEY.to_owned());
        let home_route = parse_route(lookup("JIUWEN_HOME_ROUTE").as_deref())?;
        let ready_timeout_ms =
            parse_u64("JIUWEN_READY_TIMEOUT_MS", lookup("JIUWEN_READY_TIMEOUT_MS").as_deref(), DEFAULT_READY_TIMEOUT_MS)?;
        let request_secs = parse_u64(
            "JIUWEN_REQUEST_TIMEOUT_SECS",
            lookup("JIUWEN_REQUEST_TIMEOUT_SECS").as_deref(),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let connect_secs = parse_u64(
            "JIUWEN_CONNECT_TIMEOUT_SECS",
            lookup("JIUWEN_CONNECT_TIMEOUT_SECS").as_deref(),
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )?;

        Ok(Self {
            api_base_url,
            token_key,
            home_route,
            ready_timeout: Duration::from_millis(ready_timeout_ms),
            timeouts: HttpTimeouts { request_secs, connect_secs },
        })
    }

    /// Same config pointed at another API origin.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.api_base_url = base_url.trim().trim_end_matches('/').to_owned();
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn parse_base_url(value: Option<&str>) -> Result<String, SessionError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(DEFAULT_API_BASE_URL.to_owned());
    };
    if !(raw.starts_with("http://") || raw.starts_with("https://")) {
        return Err(SessionError::Config(format!("JIUWEN_API_BASE_URL must be an http(s) URL, got '{raw}'")));
    }
    Ok(raw.trim_end_matches('/').to_owned())
}

fn parse_route(value: Option<&str>) -> Result<String, SessionError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(DEFAULT_HOME_ROUTE.to_owned()),
        Some(route) if route.starts_with('/') => Ok(route.to_owned()),
        Some(route) => Err(SessionError::Config(format!("JIUWEN_HOME_ROUTE must start with '/', got '{route}'"))),
    }
}

fn parse_u64(key: &str, value: Option<&str>, default: u64) -> Result<u64, SessionError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| SessionError::Config(format!("{key} must be a non-negative integer, got '{raw}'"))),
    }
}
