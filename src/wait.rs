//! Bounded wait for the first resolution.
//!
//! Pages that gate on the session wait at most a fixed budget before
//! treating the visitor as signed out, so a store that never settles cannot
//! leave a spinner up forever.

#[cfg(test)]
#[path = "wait_test.rs"]
mod wait_test;

use std::pin::pin;
use std::time::Duration;

use futures::future::{Either, select};
use schema::User;

use crate::facade::SessionHandle;

/// Outcome of [`ready_or_timeout`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// The session settled; the user, if any, is signed in.
    Ready(Option<User>),
    /// The budget ran out while the session was still loading.
    TimedOut,
}

impl Readiness {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The settled user. A timeout counts as signed out.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Ready(user) => user.as_ref(),
            Self::TimedOut => None,
        }
    }
}

/// Wait until `handle` stops loading or `budget` elapses, whichever is first.
pub async fn ready_or_timeout(handle: &SessionHandle, budget: Duration) -> Readiness {
    let Some(mut states) = handle.watch() else {
        return Readiness::Ready(handle.view().user);
    };

    let settled = pin!(async move {
        match states.wait_for(|session| !session.loading()).await {
            Ok(session) => session.user.clone(),
            Err(_) => None,
        }
    });
    let timer = pin!(sleep(budget));

    match select(settled, timer).await {
        Either::Left((user, _)) => Readiness::Ready(user),
        Either::Right(((), _)) => {
            tracing::debug!(budget_ms = budget.as_millis(), "gave up waiting for the session");
            Readiness::TimedOut
        }
    }
}

/// Wait until `handle` holds a signed-in user or `budget` elapses.
///
/// Unlike [`ready_or_timeout`], a session that settles signed out keeps
/// waiting: a persisted token may still produce a user (another tab signing
/// in, a refresh). Guards use the timeout to stop showing "verifying".
pub async fn signed_in_or_timeout(handle: &SessionHandle, budget: Duration) -> Readiness {
    let watched = handle.watch();
    let signed_in = pin!(async move {
        if let Some(mut states) = watched {
            let settled = states
                .wait_for(|session| !session.loading() && session.user.is_some())
                .await
                .ok()
                .and_then(|session| session.user.clone());
            if let Some(user) = settled {
                return user;
            }
        }
        std::future::pending().await
    });
    let timer = pin!(sleep(budget));

    match select(signed_in, timer).await {
        Either::Left((user, _)) => Readiness::Ready(Some(user)),
        Either::Right(((), _)) => {
            tracing::debug!(budget_ms = budget.as_millis(), "no signed-in user within the wait budget");
            Readiness::TimedOut
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[cfg(target_arch = "wasm32")]
async fn sleep(duration: Duration) {
    gloo_timers::future::sleep(duration).await;
}
