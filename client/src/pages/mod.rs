//! Page modules for route-level screens.
//!
//! ARCHITECTURE
//! ============
//! Each page owns route-scoped orchestration and delegates rendering details
//! to `components`. Guarded pages go through `util::auth`.

pub mod admin;
pub mod home;
pub mod login;
pub mod users;
