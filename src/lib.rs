//! Session core for the openJiuwen site.
//!
//! SYSTEM CONTEXT
//! ==============
//! Pages of the site are rendered on the client and talk to a REST backend.
//! The only state they share is who is signed in. This crate owns that state:
//! a [`SessionStore`] per rendering root, the [`SessionHandle`] pages hold,
//! the persisted bearer token and its cross-tab change feed, the in-page
//! [`EventBus`], and the HTTP clients for the auth and content endpoints.
//!
//! DESIGN
//! ======
//! Every environment dependency is injected through a [`Platform`]: the auth
//! API, the token slot, the event bus, and the navigator. The browser
//! bindings and the CLI supply their own implementations; tests supply fakes.

pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod events;
pub mod facade;
pub mod guard;
pub mod platform;
pub mod rest;
pub mod store;
pub mod token;
pub mod wait;

#[cfg(test)]
mod test_support;

pub use api::{AuthApi, HttpAuthApi};
pub use config::SessionConfig;
pub use content::SiteClient;
pub use error::SessionError;
pub use events::{EventBus, SessionEvent, Subscription};
pub use facade::{Backing, Fallback, SessionHandle, SessionView};
pub use guard::{AccessDecision, Requirement};
pub use platform::{Navigator, NoopNavigator, Platform, RenderMode};
pub use store::{Session, SessionStatus, SessionStore};
#[cfg(not(target_arch = "wasm32"))]
pub use token::FileTokenStore;
pub use token::{MemoryTokenStore, TabId, TokenChange, TokenChannel, TokenStore, TokenWatch};
pub use wait::{Readiness, ready_or_timeout, signed_in_or_timeout};

pub use schema;
