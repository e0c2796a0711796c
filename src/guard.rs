//! Access decisions for protected pages.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route components gate on the session the same way: spinner while the
//! session loads, a transitional "verifying" message while a persisted token
//! has not yet produced a user, and a redirect once the check conclusively
//! fails. The wait budget from [`crate::wait`] bounds the first two states.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use schema::Role;

use crate::facade::SessionView;

pub const LOGIN_ROUTE: &str = "/login";

/// What a page requires of the visitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Authenticated,
    Admin,
    Root,
}

impl Requirement {
    /// Where to send visitors who do not meet the requirement.
    #[must_use]
    pub fn redirect(self) -> &'static str {
        match self {
            Self::Authenticated => LOGIN_ROUTE,
            Self::Admin | Self::Root => crate::config::DEFAULT_HOME_ROUTE,
        }
    }

    #[must_use]
    pub fn is_met_by(self, view: &SessionView) -> bool {
        let Some(user) = view.user.as_ref() else {
            return false;
        };
        match self {
            Self::Authenticated => true,
            Self::Admin => user.role.satisfies(Role::Admin),
            Self::Root => user.role.satisfies(Role::Root),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    /// Session still loading; show a spinner.
    Loading,
    /// A token is persisted but no user yet; show "verifying".
    Verifying,
    Granted,
    Denied { redirect: &'static str },
}

impl AccessDecision {
    /// Route to navigate to, if any.
    #[must_use]
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            Self::Denied { redirect } => Some(*redirect),
            _ => None,
        }
    }
}

/// Decide whether `view` may see a page with `requirement`.
///
/// `wait_expired` is set once the wait budget has run out; from then on
/// loading and verifying states are treated as a failed check.
#[must_use]
pub fn evaluate(view: &SessionView, requirement: Requirement, token_present: bool, wait_expired: bool) -> AccessDecision {
    if view.loading && !wait_expired {
        return AccessDecision::Loading;
    }
    if requirement.is_met_by(view) {
        return AccessDecision::Granted;
    }
    if view.user.is_none() && token_present && !wait_expired {
        return AccessDecision::Verifying;
    }
    AccessDecision::Denied { redirect: requirement.redirect() }
}
