//! Thin JSON-over-HTTP wrapper shared by the auth and content clients.
//!
//! Pure status/body classification lives in [`decode_response`] and
//! [`check_status`] so error mapping is testable without a server.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures map to `Network`, 401/403 to `Unauthorized`, other
//! non-success statuses to `Api` (message taken from the `detail` body when
//! present), and undecodable bodies to `MalformedResponse`.

#[cfg(test)]
#[path = "rest_test.rs"]
mod rest_test;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{HttpTimeouts, SessionConfig};
use crate::error::SessionError;

#[derive(Clone, Debug)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    /// Build a client for `config.api_base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        let http = build_http_client(config.timeouts)?;
        Ok(Self { http, base_url: config.api_base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path such as `/api/auth/me`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET path?query` decoding a JSON body.
    ///
    /// # Errors
    ///
    /// See the module-level error mapping.
    pub async fn get<T>(&self, path: &str, bearer: Option<&str>, query: &[(&str, String)]) -> Result<T, SessionError>
    where
        T: DeserializeOwned,
    {
        let mut request = self.request(Method::GET, path, bearer);
        if !query.is_empty() {
            request = request.query(query);
        }
        let (status, body) = execute(request).await?;
        decode_response(status, &body)
    }

    /// Send `body` as JSON and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See the module-level error mapping.
    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<T, SessionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(method, path, bearer).json(body);
        let (status, text) = execute(request).await?;
        decode_response(status, &text)
    }

    /// Send a request without a body and ignore any response body.
    ///
    /// # Errors
    ///
    /// See the module-level error mapping.
    pub async fn send_empty(&self, method: Method, path: &str, bearer: Option<&str>) -> Result<(), SessionError> {
        let (status, body) = execute(self.request(method, path, bearer)).await?;
        check_status(status, &body)
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> reqwest::RequestBuilder {
        let request = self
            .http
            .request(method, self.endpoint(path))
            .header(reqwest::header::ACCEPT, "application/json");
        match bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn build_http_client(timeouts: HttpTimeouts) -> Result<reqwest::Client, SessionError> {
    let builder = reqwest::Client::builder();
    #[cfg(not(target_arch = "wasm32"))]
    let builder = builder
        .timeout(std::time::Duration::from_secs(timeouts.request_secs))
        .connect_timeout(std::time::Duration::from_secs(timeouts.connect_secs));
    #[cfg(target_arch = "wasm32")]
    let _ = timeouts;
    builder.build().map_err(|e| SessionError::HttpClientBuild(e.to_string()))
}

async fn execute(request: reqwest::RequestBuilder) -> Result<(u16, String), SessionError> {
    let response = request.send().await.map_err(|e| SessionError::Network(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| SessionError::Network(e.to_string()))?;
    Ok((status, body))
}

/// Map a non-success status to the error taxonomy.
///
/// # Errors
///
/// Returns `Unauthorized` for 401/403 and `Api` for every other non-2xx status.
pub fn check_status(status: u16, body: &str) -> Result<(), SessionError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    let message = serde_json::from_str::<schema::ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message())
        .unwrap_or_default();
    match status {
        401 | 403 => Err(SessionError::Unauthorized(message)),
        _ => Err(SessionError::Api { status, message }),
    }
}

/// Check `status`, then decode `body` as `T`.
///
/// # Errors
///
/// Status errors per [`check_status`]; undecodable bodies yield `MalformedResponse`.
pub fn decode_response<T>(status: u16, body: &str) -> Result<T, SessionError>
where
    T: DeserializeOwned,
{
    check_status(status, body)?;
    serde_json::from_str(body).map_err(|e| SessionError::MalformedResponse(e.to_string()))
}
