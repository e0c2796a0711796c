//! Collaborators injected into a session store or a fallback handle.

use std::sync::Arc;

use crate::api::AuthApi;
use crate::events::EventBus;
use crate::token::TokenStore;

/// Where the code is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    /// Interactive page with storage, network, and navigation.
    Browser,
    /// Build-time rendering: no storage, no network, no navigation.
    PreRender,
}

/// Full-page navigation.
pub trait Navigator: Send + Sync {
    /// Navigate to `route`, discarding in-memory page state.
    fn reload_to(&self, route: &str);
}

/// Navigator for hosts with no page to reload; logs and does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn reload_to(&self, route: &str) {
        tracing::debug!(route, "navigation requested without a page");
    }
}

/// Everything a store needs from its environment.
#[derive(Clone)]
pub struct Platform {
    pub mode: RenderMode,
    pub api: Arc<dyn AuthApi>,
    pub tokens: Arc<dyn TokenStore>,
    pub events: EventBus,
    pub navigator: Arc<dyn Navigator>,
    /// Route a forced reload lands on.
    pub home_route: String,
}

impl Platform {
    /// Interactive platform with a no-op navigator and `/` as home.
    #[must_use]
    pub fn browser(api: Arc<dyn AuthApi>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            mode: RenderMode::Browser,
            api,
            tokens,
            events: EventBus::new(),
            navigator: Arc::new(NoopNavigator),
            home_route: crate::config::DEFAULT_HOME_ROUTE.to_owned(),
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>, home_route: &str) -> Self {
        self.navigator = navigator;
        self.home_route = home_route.to_owned();
        self
    }

    #[must_use]
    pub fn is_prerender(&self) -> bool {
        self.mode == RenderMode::PreRender
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("mode", &self.mode)
            .field("token_key", &self.tokens.key())
            .field("events", &self.events)
            .field("home_route", &self.home_route)
            .finish_non_exhaustive()
    }
}
