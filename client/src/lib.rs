//! Leptos bindings for the openJiuwen session.
//!
//! SYSTEM CONTEXT
//! ==============
//! `App` provides one session store per page; pages and components read it
//! through `state::session::use_session`. Browser specifics (storage, the
//! `storage` event, navigation) live in `browser`.
//!
//! RENDERING
//! =========
//! Pages are rendered ahead of time by a host built with the `ssr` feature
//! that serves [`app::shell`]; this crate does not ship that host. The
//! `hydrate` build then attaches to the rendered markup. Without `hydrate`
//! the session is the static, signed-out pre-render view.

pub mod app;
pub mod browser;
pub mod components;
pub mod pages;
pub mod state;
pub mod util;

/// WASM entry point: hydrate the markup rendered from [`app::shell`].
#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    leptos::mount::hydrate_body(app::App);
}
