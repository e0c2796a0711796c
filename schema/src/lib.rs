//! Shared REST DTOs for the site API.
//!
//! This crate owns the JSON shapes exchanged with the backend and is used by
//! the session core, the CLI, and the browser client alike. Field names match
//! the backend's snake_case payloads so serde round-trips stay lossless.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Default page size requested by discussion listings.
pub const DEFAULT_DISCUSSION_LIMIT: u32 = 50;

/// Error returned by [`User::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserRecordError {
    /// The identifier is zero or negative.
    #[error("user record has no usable identifier (id = {0})")]
    MissingId(i64),
    /// The username is empty or whitespace.
    #[error("user record {0} has an empty username")]
    EmptyUsername(i64),
}

// =============================================================================
// ROLES AND USERS
// =============================================================================

/// Account role. Closed set with privilege order `root ⊇ admin ⊇ developer`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Developer,
    Admin,
    Root,
}

impl Role {
    /// Every role, lowest privilege first.
    pub const ALL: [Self; 3] = [Self::Developer, Self::Admin, Self::Root];

    /// `true` for `admin` and `root`.
    #[must_use]
    pub fn is_admin(self) -> bool {
        self >= Self::Admin
    }

    #[must_use]
    pub fn is_root(self) -> bool {
        self == Self::Root
    }

    /// Whether this role carries at least the privileges of `required`.
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self >= required
    }

    /// Wire name, as sent by the backend.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Developer => "developer",
            Self::Admin => "admin",
            Self::Root => "root",
        }
    }

    /// Human label shown next to a username.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Developer => "Developer",
            Self::Admin => "Admin",
            Self::Root => "Root",
        }
    }

    /// Parse a wire name. Returns `None` for anything outside the closed set.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == value)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An account as returned by `/api/auth/me`, the auth responses, and `/api/users`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend primary key.
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    pub username: String,
    /// Absent from the login response body.
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Check that the record identifies someone: positive id, non-empty username.
    ///
    /// # Errors
    ///
    /// Returns the first [`UserRecordError`] found.
    pub fn validate(&self) -> Result<(), UserRecordError> {
        if self.id <= 0 {
            return Err(UserRecordError::MissingId(self.id));
        }
        if self.username.trim().is_empty() {
            return Err(UserRecordError::EmptyUsername(self.id));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.validate().is_ok()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.role.is_root()
    }
}

// =============================================================================
// AUTH PAYLOADS
// =============================================================================

/// Body of `POST /api/auth/login`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of `POST /api/auth/register`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Response of both login and register: a bearer token plus the account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

/// Error body returned by the backend on non-success statuses.
///
/// `detail` is either a plain message or a list of validation entries each
/// carrying a `msg`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ApiErrorBody {
    /// Best human-readable message in the body, if any.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            serde_json::Value::Array(entries) => {
                let parts: Vec<&str> = entries
                    .iter()
                    .filter_map(|entry| entry.get("msg").and_then(serde_json::Value::as_str))
                    .collect();
                if parts.is_empty() { None } else { Some(parts.join("; ")) }
            }
            _ => None,
        }
    }
}

// =============================================================================
// ADMIN: SITE CONFIG AND NEWS
// =============================================================================

/// One editable site configuration entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of `PUT /api/admin/configs/{key}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct News {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST /api/admin/news`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsDraft {
    pub title: String,
    pub content: String,
    pub author: String,
}

// =============================================================================
// USER MANAGEMENT
// =============================================================================

/// Body of `POST /api/users`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Body of `PUT /api/users/{id}`. Only present fields are sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UserUpdate {
    /// Set a new password; an empty string leaves the password unchanged.
    #[must_use]
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = if password.is_empty() { None } else { Some(password.to_owned()) };
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.role.is_none() && self.password.is_none() && self.is_active.is_none()
    }
}

// =============================================================================
// BLOGS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Markdown body; only present on the detail endpoint.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogList {
    #[serde(default)]
    pub items: Vec<Blog>,
    #[serde(default)]
    pub total: u64,
}

impl BlogList {
    /// Up to `limit` entries other than `current`, in listing order.
    #[must_use]
    pub fn related(&self, current: i64, limit: usize) -> Vec<&Blog> {
        self.items.iter().filter(|blog| blog.id != current).take(limit).collect()
    }
}

// =============================================================================
// DISCUSSIONS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscussionCategory {
    Usage,
    Bug,
    Feature,
    #[serde(other)]
    Other,
}

impl DiscussionCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Usage => "usage",
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Usage => "Usage question",
            Self::Bug => "Bug report",
            Self::Feature => "Feature request",
            Self::Other => "Other",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscussionStatus {
    Open,
    Solved,
    Closed,
    #[serde(other)]
    Other,
}

impl DiscussionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Solved => "solved",
            Self::Closed => "closed",
            Self::Other => "other",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discussion {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub category: DiscussionCategory,
    pub status: DiscussionStatus,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionReply {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionList {
    #[serde(default)]
    pub items: Vec<Discussion>,
    #[serde(default)]
    pub total: u64,
}

/// Filters for `GET /api/discussions`. `None` means "all".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscussionQuery {
    pub limit: Option<u32>,
    pub category: Option<DiscussionCategory>,
    pub status: Option<DiscussionStatus>,
}

impl Default for DiscussionQuery {
    fn default() -> Self {
        Self { limit: Some(DEFAULT_DISCUSSION_LIMIT), category: None, status: None }
    }
}

impl DiscussionQuery {
    /// Query-string pairs in a stable order.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(category) = self.category {
            pairs.push(("category", category.as_str().to_owned()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_owned()));
        }
        pairs
    }
}

// =============================================================================
// NUMBER HELPERS
// =============================================================================

fn deserialize_i64_from_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return Ok(int);
            }
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            if let Some(float) = number.as_f64()
                && float.is_finite()
                && float.fract() == 0.0
                && float >= i64::MIN as f64
                && float <= i64::MAX as f64
            {
                return Ok(float as i64);
            }
            Err(D::Error::custom("expected integer-compatible number"))
        }
        _ => Err(D::Error::custom("expected number")),
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
