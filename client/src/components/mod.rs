//! Reusable UI component modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Components read the session from Leptos context and never write it
//! directly; changes go through the session handle.

pub mod navbar_login;
