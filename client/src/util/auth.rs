//! Shared auth UI helpers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route components should apply identical redirect behavior. A guarded page
//! waits for a signed-in user for at most the configured budget; after that a
//! missing user counts as signed out, even with a token still persisted.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use jiuwen_session::guard::{self, AccessDecision, Requirement};
use leptos::prelude::*;
use leptos_router::NavigateOptions;

use crate::state::auth::AuthState;
use crate::state::session::SessionContext;

/// Decision for `state` once `wait_expired` is known.
pub fn access_decision(state: &AuthState, requirement: Requirement, wait_expired: bool) -> AccessDecision {
    guard::evaluate(&state.view(), requirement, state.token_present, wait_expired)
}

/// Placeholder text for decisions that render no page content.
pub fn pending_message(decision: &AccessDecision) -> Option<&'static str> {
    match decision {
        AccessDecision::Loading => Some("Loading..."),
        AccessDecision::Verifying => Some("Verifying your session..."),
        AccessDecision::Denied { .. } => Some("Redirecting..."),
        AccessDecision::Granted => None,
    }
}

/// Flag that turns true once the wait budget runs out without a signed-in
/// user. Started on every call, whether or not the session has settled, so
/// no "loading" or "verifying" state outlives the budget.
pub fn install_wait_budget(session: &SessionContext) -> RwSignal<bool> {
    let wait_expired = RwSignal::new(false);

    #[cfg(feature = "hydrate")]
    {
        let handle = session.handle.clone();
        let budget = session.ready_timeout;
        leptos::task::spawn_local(async move {
            let readiness = jiuwen_session::signed_in_or_timeout(&handle, budget).await;
            if !readiness.is_ready() {
                log::info!("no signed-in user after {budget:?}; treating visitor as signed out");
                let _ = wait_expired.try_set(true);
            }
        });
    }
    #[cfg(not(feature = "hydrate"))]
    let _ = session;

    wait_expired
}

/// Guard the current route and return the live decision.
///
/// Navigates away when access is denied.
pub fn install_access_guard<F>(session: &SessionContext, requirement: Requirement, navigate: F) -> Memo<AccessDecision>
where
    F: Fn(&str, NavigateOptions) + Clone + 'static,
{
    let auth = session.auth;
    let wait_expired = install_wait_budget(session);

    let decision = Memo::new(move |_| access_decision(&auth.get(), requirement, wait_expired.get()));
    Effect::new(move || {
        if let Some(route) = decision.get().redirect() {
            navigate(route, NavigateOptions { replace: true, ..NavigateOptions::default() });
        }
    });
    decision
}
