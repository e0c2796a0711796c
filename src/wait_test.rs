use std::sync::Arc;

use super::*;
use crate::api::AuthApi;
use crate::error::SessionError;
use crate::facade::Fallback;
use crate::guard::{self, AccessDecision, Requirement};
use crate::platform::Platform;
use crate::store::SessionStore;
use crate::test_support::{FakeAuthApi, developer001, platform};
use crate::token::{MemoryTokenStore, TokenStore, TokenWatch};

const BUDGET: Duration = Duration::from_millis(3000);

fn pending_store() -> (Arc<FakeAuthApi>, Arc<tokio::sync::Notify>, SessionStore) {
    let api = Arc::new(FakeAuthApi::new().with_account("123456", developer001(), "t1"));
    let gate = api.hold_current_user();
    let tokens = MemoryTokenStore::with_token("auth_token", "t1");
    let store = SessionStore::new(platform(&api, &tokens));
    (api, gate, store)
}

#[tokio::test]
async fn settled_store_is_ready_immediately() {
    let api = Arc::new(FakeAuthApi::new());
    let store = SessionStore::new(platform(&api, &MemoryTokenStore::new("auth_token")));
    store.resolve().await;

    let outcome = ready_or_timeout(&SessionHandle::Live(store), BUDGET).await;

    assert_eq!(outcome, Readiness::Ready(None));
}

#[tokio::test]
async fn detached_handle_is_ready_and_signed_out() {
    let outcome = ready_or_timeout(&SessionHandle::Detached(Fallback::PreRender), BUDGET).await;
    assert!(outcome.is_ready());
    assert_eq!(outcome.user(), None);
}

#[tokio::test(start_paused = true)]
async fn stuck_resolution_times_out_after_budget() {
    let (api, _gate, store) = pending_store();
    let resolving = tokio::spawn({
        let store = store.clone();
        async move { store.resolve().await }
    });
    while api.me_calls().is_empty() {
        tokio::task::yield_now().await;
    }

    let started = tokio::time::Instant::now();
    let outcome = ready_or_timeout(&SessionHandle::Live(store), BUDGET).await;

    assert_eq!(outcome, Readiness::TimedOut);
    assert_eq!(outcome.user(), None);
    assert!(started.elapsed() >= BUDGET);
    resolving.abort();
}

#[tokio::test(start_paused = true)]
async fn resolution_within_budget_returns_user() {
    let (_api, gate, store) = pending_store();
    tokio::spawn({
        let store = store.clone();
        async move { store.resolve().await }
    });
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        gate.notify_one();
    });

    let outcome = ready_or_timeout(&SessionHandle::Live(store), BUDGET).await;

    assert_eq!(outcome, Readiness::Ready(Some(developer001())));
}

// =============================================================
// signed_in_or_timeout
// =============================================================

/// Token slot that refuses to forget its token.
struct StickyTokenStore(MemoryTokenStore);

impl TokenStore for StickyTokenStore {
    fn key(&self) -> &str {
        self.0.key()
    }

    fn get(&self) -> Option<String> {
        self.0.get()
    }

    fn set(&self, token: &str) -> Result<(), SessionError> {
        self.0.set(token)
    }

    fn remove(&self) -> Result<(), SessionError> {
        Err(SessionError::Storage("storage is read-only".to_owned()))
    }

    fn subscribe(&self) -> TokenWatch {
        self.0.subscribe()
    }
}

#[tokio::test(start_paused = true)]
async fn unremovable_rejected_token_stops_verifying_after_budget() {
    let api: Arc<dyn AuthApi> =
        Arc::new(FakeAuthApi::new().with_session("expired", Err(SessionError::Unauthorized(String::new()))));
    let tokens: Arc<dyn TokenStore> =
        Arc::new(StickyTokenStore(MemoryTokenStore::with_token("auth_token", "expired")));
    let store = SessionStore::new(Platform::browser(api, tokens));
    store.initialize().await;
    assert!(store.has_token());

    let handle = SessionHandle::Live(store);
    assert_eq!(
        guard::evaluate(&handle.view(), Requirement::Authenticated, true, false),
        AccessDecision::Verifying
    );

    let started = tokio::time::Instant::now();
    let outcome = signed_in_or_timeout(&handle, BUDGET).await;

    assert_eq!(outcome, Readiness::TimedOut);
    assert!(started.elapsed() >= BUDGET);
    assert_eq!(
        guard::evaluate(&handle.view(), Requirement::Authenticated, true, !outcome.is_ready()),
        AccessDecision::Denied { redirect: "/login" }
    );
}

#[tokio::test(start_paused = true)]
async fn detached_handle_with_token_stops_verifying_after_budget() {
    let api: Arc<dyn AuthApi> = Arc::new(FakeAuthApi::new());
    let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_token("auth_token", "t1"));
    let handle = SessionHandle::Detached(Fallback::Direct(Platform::browser(api, tokens)));
    assert_eq!(ready_or_timeout(&handle, BUDGET).await, Readiness::Ready(None));

    let outcome = signed_in_or_timeout(&handle, BUDGET).await;

    assert_eq!(outcome, Readiness::TimedOut);
    assert_eq!(
        guard::evaluate(&handle.view(), Requirement::Admin, true, !outcome.is_ready()),
        AccessDecision::Denied { redirect: "/" }
    );
}

#[tokio::test(start_paused = true)]
async fn login_during_wait_returns_user() {
    let api = Arc::new(FakeAuthApi::new().with_account("123456", developer001(), "t1"));
    let store = SessionStore::new(platform(&api, &MemoryTokenStore::new("auth_token")));
    store.initialize().await;
    tokio::spawn({
        let store = store.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            store.login("developer001", "123456").await.unwrap();
        }
    });

    let outcome = signed_in_or_timeout(&SessionHandle::Live(store), BUDGET).await;

    assert_eq!(outcome, Readiness::Ready(Some(developer001())));
}
