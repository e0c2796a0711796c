//! Client for the site's content endpoints: admin config and news, user
//! management, blogs, and discussions.
//!
//! Authenticated calls read the bearer token from the token store at call
//! time, so a client built before sign-in picks up the token afterwards.

#[cfg(test)]
#[path = "content_test.rs"]
mod content_test;

use std::sync::Arc;

use reqwest::Method;
use schema::{
    Blog, BlogList, ConfigUpdate, Discussion, DiscussionList, DiscussionQuery, DiscussionReply, NewUser, News,
    NewsDraft, SiteConfig, User, UserUpdate,
};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::rest::RestClient;
use crate::token::TokenStore;

#[derive(Clone)]
pub struct SiteClient {
    rest: RestClient,
    tokens: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for SiteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteClient").field("base_url", &self.rest.base_url()).finish_non_exhaustive()
    }
}

impl SiteClient {
    /// # Errors
    ///
    /// Returns [`SessionError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &SessionConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, SessionError> {
        Ok(Self { rest: RestClient::new(config)?, tokens })
    }

    #[must_use]
    pub fn from_rest(rest: RestClient, tokens: Arc<dyn TokenStore>) -> Self {
        Self { rest, tokens }
    }

    fn bearer(&self) -> Option<String> {
        self.tokens.get()
    }

    // =========================================================================
    // ADMIN
    // =========================================================================

    /// # Errors
    ///
    /// Returns the request's [`SessionError`].
    pub async fn list_configs(&self) -> Result<Vec<SiteConfig>, SessionError> {
        self.rest.get("/api/admin/configs", self.bearer().as_deref(), &[]).await
    }

    /// # Errors
    ///
    /// Returns the request's [`SessionError`].
    pub async fn update_config(&self, key: &str, value: &str) -> Result<SiteConfig, SessionError> {
        let body = ConfigUpdate { value: value.to_owned() };
        let path = format!("/api/admin/configs/{key}");
        self.rest.send_json(Method::PUT, &path, self.bearer().as_deref(), &body).await
    }

    /// # Errors
    ///
    /// Returns the request's [`SessionError`].
    pub async fn list_news(&self) -> Result<Vec<News>, SessionError> {
        self.rest.get("/api/admin/news", self.bearer().as_deref(), &[]).await
    }

    /// # Errors
    ///
    /// Returns the request's [`SessionError`].
    pub async fn create_news(&self, draft: &NewsDraft) -> Result<News, SessionError> {
        self.rest.send_json(Method::POST, "/api/admin/news", self.bearer().as_deref(), draft).await
    }

    /// # Errors
    ///
    /// Returns the request's [`SessionError`].
    pub async fn delete_news(&self, id: i64) -> Result<(), SessionError> {
        let path = format!("/api/admin/news/{id}");
        self.rest.send_empty(Method::DELETE, &path, self.bearer().as_deref()).await
    }

    // =========================================================================
    // USERS
    // =========================================================================

    /// # Errors
    ///
    /// Returns the request's [`SessionError`].
    pub async fn list_users(&self) -> Result<Vec<User>, SessionError> {
        self.rest.get("/api/users", self.bearer().as_deref(), &[]).await
    }

    /// # Errors
    ///
    /// Returns the request's [`SessionError`].
    pub async fn create_user(&self, user: &NewUser) -> Result<User, SessionError> {
        self.rest.send_json(Method::POST, "/api/users", self.bearer().as_deref(), user).await
    }

    /// # Errors
    ///
    /// Returns [`SessionError::CallerMisuse`] for an update with no fields,
    /// otherwise the request's [`SessionError`].
    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<User, SessionError> {
        if update.is_empty() {
            return Err(SessionError::CallerMisuse(format!("update for user {id} has no fields")));
        }
        let path = format!("/api/users/{id}");
        self.rest.send_json(Method::PUT, &path, self.bearer().as_deref(), update).await
    }

    /// # Errors
    ///
    /// Returns the request's [`SessionError`].
    pub async fn delete_user(&self, id: i64) -> Result<(), SessionError> {
        let path = format!("/api/users/{id}");
        self.rest.send_empty(Method::DELETE, &path, self.bearer().as_deref()).await
    }

    // =========================================================================
    // BLOGS
    // =========================================================================

    /// # Errors
    ///
    /// Returns the request's [`SessionError`].
    pub async fn list_blogs(&self) -> Result<BlogList, SessionError> {
        self.rest.get("/api/blogs", self.bearer().as_deref(), &[]).await
    }

    /// # Errors
    ///
    /// Returns the request's [`SessionError`].
    pub async fn get_blog(&self, id: i64) -> Result<Blog, SessionError> {
        self.rest.get(&format!("/api/blogs/{id}"), self.bearer().as_deref(), &[]).await
    }

    // =========================================================================
    // DISCUSSIONS
    // =========================================================================

    /// # Errors
    ///
    /// Returns the request's [`SessionError`].
    pub async fn list_discussions(&self, query: &DiscussionQuery) -> Result<DiscussionList, SessionError> {
        self.rest.get("/api/discussions", self.bearer().as_deref(), &query.to_pairs()).await
    }

    /// # Errors
    ///
    /// Returns the request's [`SessionError`].
    pub async fn get_discussion(&self, id: i64) -> Result<Discussion, SessionError> {
        self.rest.get(&format!("/api/discussions/{id}"), self.bearer().as_deref(), &[]).await
    }

    /// # Errors
    ///
    /// Returns the request's [`SessionError`].
    pub async fn list_replies(&self, discussion_id: i64) -> Result<Vec<DiscussionReply>, SessionError> {
        let path = format!("/api/discussions/{discussion_id}/replies");
        self.rest.get(&path, self.bearer().as_deref(), &[]).await
    }
}
