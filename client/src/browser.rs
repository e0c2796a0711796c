//! Browser implementations of the session collaborators.
//!
//! SYSTEM CONTEXT
//! ==============
//! The token lives in `localStorage` under the configured key. Writes made by
//! other tabs arrive as `storage` events; [`StorageBridge`] forwards them onto
//! the token store's change feed so the session store can follow them.
//!
//! TRADE-OFFS
//! ==========
//! Storage is best-effort: private browsing modes may refuse writes, and
//! non-hydrate builds have no window at all. Both degrade to "no token".

#[cfg(test)]
#[path = "browser_test.rs"]
mod browser_test;

use std::sync::Arc;

use jiuwen_session::{
    AuthApi, HttpAuthApi, Navigator, Platform, RenderMode, SessionConfig, SessionError, TabId, TokenChange,
    TokenChannel, TokenStore, TokenWatch,
};

// =============================================================================
// CONFIG
// =============================================================================

/// Config baked in at build time from `JIUWEN_*` variables.
///
/// # Errors
///
/// Returns [`SessionError::Config`] when a baked-in value does not parse.
pub fn build_time_config() -> Result<SessionConfig, SessionError> {
    SessionConfig::from_lookup(|key| {
        let value = match key {
            "JIUWEN_API_BASE_URL" => option_env!("JIUWEN_API_BASE_URL"),
            "JIUWEN_TOKEN_KEY" => option_env!("JIUWEN_TOKEN_KEY"),
            "JIUWEN_HOME_ROUTE" => option_env!("JIUWEN_HOME_ROUTE"),
            "JIUWEN_READY_TIMEOUT_MS" => option_env!("JIUWEN_READY_TIMEOUT_MS"),
            _ => None,
        };
        value.map(str::to_owned)
    })
}

// =============================================================================
// TOKEN STORE
// =============================================================================

/// The token slot in `window.localStorage`.
#[derive(Clone)]
pub struct LocalStorageTokenStore {
    key: String,
    channel: TokenChannel,
    tab: TabId,
}

impl LocalStorageTokenStore {
    #[must_use]
    pub fn new(key: &str) -> Self {
        let channel = TokenChannel::new();
        let tab = channel.open_tab();
        Self { key: key.to_owned(), channel, tab }
    }

    /// Announce a change observed through a `storage` event.
    pub fn publish_external(&self, change: TokenChange) {
        self.channel.publish(TabId::EXTERNAL, change);
    }
}

#[cfg(feature = "hydrate")]
fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

impl TokenStore for LocalStorageTokenStore {
    fn key(&self) -> &str {
        &self.key
    }

    fn get(&self) -> Option<String> {
        #[cfg(feature = "hydrate")]
        {
            local_storage()?.get_item(&self.key).ok().flatten().filter(|token| !token.is_empty())
        }
        #[cfg(not(feature = "hydrate"))]
        {
            None
        }
    }

    fn set(&self, token: &str) -> Result<(), SessionError> {
        #[cfg(feature = "hydrate")]
        {
            let storage =
                local_storage().ok_or_else(|| SessionError::Storage("localStorage unavailable".to_owned()))?;
            storage
                .set_item(&self.key, token)
                .map_err(|_| SessionError::Storage(format!("could not write {}", self.key)))?;
            self.channel.publish(self.tab, TokenChange::stored(token));
            Ok(())
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = token;
            Err(SessionError::Storage("no browser storage outside the page".to_owned()))
        }
    }

    fn remove(&self) -> Result<(), SessionError> {
        #[cfg(feature = "hydrate")]
        {
            if let Some(storage) = local_storage() {
                storage
                    .remove_item(&self.key)
                    .map_err(|_| SessionError::Storage(format!("could not remove {}", self.key)))?;
                self.channel.publish(self.tab, TokenChange::removed());
            }
        }
        Ok(())
    }

    fn subscribe(&self) -> TokenWatch {
        self.channel.subscribe(self.tab)
    }
}

/// Map a `storage` event to a change of the token under `key`.
///
/// A `None` event key means the whole storage area was cleared.
pub fn storage_change(key: &str, event_key: Option<&str>, new_value: Option<String>) -> Option<TokenChange> {
    match event_key {
        None => Some(TokenChange::removed()),
        Some(changed) if changed == key => Some(TokenChange { token: new_value.filter(|v| !v.is_empty()) }),
        Some(_) => None,
    }
}

// =============================================================================
// STORAGE EVENT BRIDGE
// =============================================================================

/// Forwards `storage` events for the token key while alive.
pub struct StorageBridge {
    #[cfg(feature = "hydrate")]
    window: web_sys::Window,
    #[cfg(feature = "hydrate")]
    listener: wasm_bindgen::closure::Closure<dyn FnMut(web_sys::StorageEvent)>,
}

impl StorageBridge {
    /// Start forwarding. Returns `None` without a window.
    pub fn install(store: &LocalStorageTokenStore) -> Option<Self> {
        #[cfg(feature = "hydrate")]
        {
            use wasm_bindgen::JsCast;

            let window = web_sys::window()?;
            let target = store.clone();
            let listener = wasm_bindgen::closure::Closure::<dyn FnMut(web_sys::StorageEvent)>::new(
                move |event: web_sys::StorageEvent| {
                    let event_key = event.key();
                    if let Some(change) = storage_change(target.key(), event_key.as_deref(), event.new_value()) {
                        log::debug!("token changed in another tab (removed: {})", change.is_removal());
                        target.publish_external(change);
                    }
                },
            );
            window.add_event_listener_with_callback("storage", listener.as_ref().unchecked_ref()).ok()?;
            Some(Self { window, listener })
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = store;
            None
        }
    }
}

#[cfg(feature = "hydrate")]
impl Drop for StorageBridge {
    fn drop(&mut self) {
        use wasm_bindgen::JsCast;

        let _ = self.window.remove_event_listener_with_callback("storage", self.listener.as_ref().unchecked_ref());
    }
}

// =============================================================================
// NAVIGATION
// =============================================================================

/// Full reload through `window.location`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn reload_to(&self, route: &str) {
        #[cfg(feature = "hydrate")]
        {
            if let Some(window) = web_sys::window() {
                let _ = window.location().set_href(route);
            }
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = route;
        }
    }
}

// =============================================================================
// PLATFORM
// =============================================================================

/// Collaborators for this page. Builds without `hydrate` render ahead of
/// time, so they get a pre-render platform.
///
/// # Errors
///
/// Returns [`SessionError::HttpClientBuild`] when the HTTP client cannot be
/// constructed.
pub fn browser_platform(config: &SessionConfig) -> Result<(Platform, LocalStorageTokenStore), SessionError> {
    let tokens = LocalStorageTokenStore::new(&config.token_key);
    let api: Arc<dyn AuthApi> = Arc::new(HttpAuthApi::new(config)?);
    let mode = if cfg!(feature = "hydrate") { RenderMode::Browser } else { RenderMode::PreRender };
    let platform = Platform::browser(api, Arc::new(tokens.clone()))
        .with_mode(mode)
        .with_navigator(Arc::new(BrowserNavigator), &config.home_route);
    Ok((platform, tokens))
}
