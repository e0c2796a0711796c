//! Page-wide session context.
//!
//! SYSTEM CONTEXT
//! ==============
//! `App` calls [`provide_session`] once. It owns the single session store for
//! the page, mirrors it into an `RwSignal<AuthState>`, and tears everything
//! down on cleanup. Components reach it through [`use_session`], which hands
//! out a detached fallback when no provider is mounted.

use std::time::Duration;

use jiuwen_session::{Fallback, SessionConfig, SessionHandle, SessionStore, SessionView, SiteClient};
use leptos::prelude::*;

use crate::browser::{LocalStorageTokenStore, browser_platform, build_time_config};
use crate::state::auth::AuthState;

#[derive(Clone)]
pub struct SessionContext {
    pub handle: SessionHandle,
    pub auth: RwSignal<AuthState>,
    /// Content API client sharing the session's token; `None` before render.
    pub site: Option<SiteClient>,
    pub ready_timeout: Duration,
}

impl SessionContext {
    /// Static signed-out context used while rendering ahead of time.
    pub fn prerender(ready_timeout: Duration) -> Self {
        Self {
            handle: SessionHandle::Detached(Fallback::PreRender),
            auth: RwSignal::new(AuthState::from_view(&SessionView::detached(), false)),
            site: None,
            ready_timeout,
        }
    }

    /// Context for a component mounted outside the provider.
    pub fn detached() -> Self {
        let config = page_config();
        match browser_platform(&config) {
            Ok((platform, _)) => {
                let handle = SessionHandle::connect(None, &platform);
                let site = SiteClient::new(&config, platform.tokens.clone()).ok();
                let auth = RwSignal::new(AuthState::from_view(&handle.view(), platform.tokens.get().is_some()));
                Self { handle, auth, site, ready_timeout: config.ready_timeout }
            }
            Err(_) => Self::prerender(config.ready_timeout),
        }
    }
}

fn page_config() -> SessionConfig {
    build_time_config().unwrap_or_else(|err| {
        #[cfg(feature = "hydrate")]
        log::warn!("invalid build-time session config, using defaults: {err}");
        #[cfg(not(feature = "hydrate"))]
        let _ = err;
        SessionConfig::default()
    })
}

/// Create the page's session store and provide it as context.
pub fn provide_session() -> SessionContext {
    let config = page_config();
    let ctx = match browser_platform(&config) {
        Ok((platform, _)) if platform.is_prerender() => SessionContext::prerender(config.ready_timeout),
        Ok((platform, tokens)) => {
            let site = SiteClient::new(&config, platform.tokens.clone()).ok();
            let store = SessionStore::new(platform);
            let auth = RwSignal::new(AuthState::from_session(&store.session(), store.has_token()));
            start(&store, tokens, auth);
            SessionContext { handle: SessionHandle::Live(store), auth, site, ready_timeout: config.ready_timeout }
        }
        Err(err) => {
            #[cfg(feature = "hydrate")]
            log::error!("session store unavailable: {err}");
            #[cfg(not(feature = "hydrate"))]
            let _ = err;
            SessionContext::prerender(config.ready_timeout)
        }
    };
    provide_context(ctx.clone());
    ctx
}

/// The provided session, or a detached fallback outside the provider.
pub fn use_session() -> SessionContext {
    use_context::<SessionContext>().unwrap_or_else(SessionContext::detached)
}

#[cfg(feature = "hydrate")]
fn start(store: &SessionStore, tokens: LocalStorageTokenStore, auth: RwSignal<AuthState>) {
    use crate::browser::StorageBridge;

    let initializing = store.clone();
    leptos::task::spawn_local(async move { initializing.initialize().await });
    leptos::task::spawn_local(store.run_sync());

    let mut states = store.watch();
    let tokens_of = store.clone();
    leptos::task::spawn_local(async move {
        loop {
            let next = {
                let session = states.borrow_and_update();
                AuthState::from_session(&session, tokens_of.has_token())
            };
            if auth.try_set(next).is_some() {
                break;
            }
            if states.changed().await.is_err() {
                break;
            }
        }
    });

    let bridge = StoredValue::new_local(StorageBridge::install(&tokens));
    let closing = store.clone();
    on_cleanup(move || {
        closing.close();
        bridge.dispose();
    });
}

#[cfg(not(feature = "hydrate"))]
fn start(_store: &SessionStore, _tokens: LocalStorageTokenStore, _auth: RwSignal<AuthState>) {}
