use std::sync::Arc;

use schema::Role;

use super::*;
use crate::events::EventBus;
use crate::platform::RenderMode;
use crate::test_support::{FakeAuthApi, developer001, platform, user};
use crate::token::{MemoryTokenStore, TokenStore};

fn fixture() -> (Arc<FakeAuthApi>, MemoryTokenStore, SessionStore) {
    let api = Arc::new(FakeAuthApi::new().with_account("123456", developer001(), "t1"));
    let tokens = MemoryTokenStore::new("auth_token");
    let store = SessionStore::new(platform(&api, &tokens));
    (api, tokens, store)
}

async fn wait_for_me_calls(api: &FakeAuthApi, count: usize) {
    while api.me_calls().len() < count {
        tokio::task::yield_now().await;
    }
}

// =============================================================
// login / register
// =============================================================

#[tokio::test]
async fn login_developer001_sets_session_from_response() {
    let (api, tokens, store) = fixture();

    let signed_in = store.login("developer001", "123456").await.unwrap();

    let session = store.session();
    assert_eq!(signed_in, developer001());
    assert_eq!(session.user.as_ref().map(|u| u.id), Some(1));
    assert!(!session.is_admin());
    assert!(!session.is_root());
    assert!(!session.loading());
    assert_eq!(tokens.get().as_deref(), Some("t1"));
    assert!(api.me_calls().is_empty());
}

#[tokio::test]
async fn login_then_resolve_keeps_login_user() {
    let (api, _tokens, store) = fixture();

    let signed_in = store.login("developer001", "123456").await.unwrap();
    store.resolve().await;

    assert_eq!(store.session().user, Some(signed_in));
    assert_eq!(api.me_calls(), vec!["t1".to_owned()]);
}

#[tokio::test]
async fn failed_login_leaves_existing_session() {
    let (_api, tokens, store) = fixture();
    store.login("developer001", "123456").await.unwrap();
    let before = store.session();

    let err = store.login("developer001", "wrong").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(store.session(), before);
    assert_eq!(tokens.get().as_deref(), Some("t1"));
}

#[tokio::test]
async fn failed_login_on_fresh_store_changes_nothing() {
    let (_api, tokens, store) = fixture();

    assert!(store.login("nobody", "x").await.is_err());

    assert_eq!(store.session(), Session::default());
    assert_eq!(tokens.get(), None);
}

#[tokio::test]
async fn login_broadcasts_to_page_listeners() {
    let (_api, _tokens, store) = fixture();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = store.platform().events.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

    store.login("developer001", "123456").await.unwrap();
    store.logout().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![SessionEvent::Login(developer001()), SessionEvent::Logout]);
}

#[tokio::test]
async fn register_signs_in_new_account() {
    let (_api, tokens, store) = fixture();

    let created = store.register("alice", "alice@example.com", "pw").await.unwrap();

    assert_eq!(created.username, "alice");
    assert_eq!(created.email.as_deref(), Some("alice@example.com"));
    assert_eq!(store.session().user, Some(created));
    assert_eq!(tokens.get().as_deref(), Some("reg-alice"));
}

#[tokio::test]
async fn duplicate_register_propagates_api_error() {
    let (_api, tokens, store) = fixture();

    let err = store.register("developer001", "d@example.com", "pw").await.unwrap_err();

    assert_eq!(err, SessionError::Api { status: 400, message: "Username already registered".to_owned() });
    assert_eq!(tokens.get(), None);
    assert_eq!(store.session().status, SessionStatus::Uninitialized);
}

#[tokio::test]
async fn role_matrix_derives_flags() {
    let cases = [(Role::Root, true, true), (Role::Admin, true, false), (Role::Developer, false, false)];
    for (role, admin, root) in cases {
        let api = Arc::new(FakeAuthApi::new().with_account("pw", user(5, "someone", role), "tok"));
        let store = SessionStore::new(platform(&api, &MemoryTokenStore::new("auth_token")));

        store.login("someone", "pw").await.unwrap();

        let session = store.session();
        assert_eq!(session.is_admin(), admin, "{role}");
        assert_eq!(session.is_root(), root, "{role}");
    }
}

// =============================================================
// logout
// =============================================================

#[tokio::test]
async fn logout_clears_even_when_remote_fails() {
    let api = Arc::new(
        FakeAuthApi::new()
            .with_account("123456", developer001(), "t1")
            .failing_logout(SessionError::Network("connection refused".to_owned())),
    );
    let tokens = MemoryTokenStore::new("auth_token");
    let store = SessionStore::new(platform(&api, &tokens));
    store.login("developer001", "123456").await.unwrap();

    store.logout().await.unwrap();

    assert_eq!(store.session(), Session { user: None, status: SessionStatus::Ready });
    assert_eq!(tokens.get(), None);
    assert_eq!(api.logout_calls(), vec![Some("t1".to_owned())]);
}

#[tokio::test]
async fn logout_without_token_skips_remote_call() {
    let (api, _tokens, store) = fixture();

    store.logout().await.unwrap();

    assert!(api.logout_calls().is_empty());
    assert_eq!(store.session().status, SessionStatus::Ready);
}

// =============================================================
// resolve
// =============================================================

#[tokio::test]
async fn resolve_without_token_makes_no_call() {
    let (api, _tokens, store) = fixture();

    store.resolve().await;
    store.resolve().await;

    assert!(api.me_calls().is_empty());
    assert_eq!(store.session(), Session { user: None, status: SessionStatus::Ready });
}

#[tokio::test]
async fn resolve_with_valid_token_sets_user() {
    let api = Arc::new(FakeAuthApi::new().with_account("123456", developer001(), "t1"));
    let tokens = MemoryTokenStore::with_token("auth_token", "t1");
    let store = SessionStore::new(platform(&api, &tokens));

    store.resolve().await;

    assert_eq!(store.session().user, Some(developer001()));
    assert_eq!(tokens.get().as_deref(), Some("t1"));
}

#[tokio::test]
async fn expired_token_is_discarded() {
    let api = Arc::new(
        FakeAuthApi::new().with_session("expired", Err(SessionError::Unauthorized("Token expired".to_owned()))),
    );
    let tokens = MemoryTokenStore::with_token("auth_token", "expired");
    let store = SessionStore::new(platform(&api, &tokens));

    store.resolve().await;

    assert_eq!(tokens.get(), None);
    let session = store.session();
    assert_eq!(session.user, None);
    assert!(!session.loading());
    assert_eq!(api.me_calls(), vec!["expired".to_owned()]);
}

#[tokio::test]
async fn malformed_user_is_treated_as_failure() {
    let api = Arc::new(FakeAuthApi::new().with_session("t1", Ok(user(0, "ghost", Role::Admin))));
    let tokens = MemoryTokenStore::with_token("auth_token", "t1");
    let store = SessionStore::new(platform(&api, &tokens));

    store.resolve().await;

    assert_eq!(tokens.get(), None);
    assert_eq!(store.session(), Session { user: None, status: SessionStatus::Ready });
}

#[tokio::test]
async fn network_failure_is_swallowed() {
    let api = Arc::new(FakeAuthApi::new().with_session("t1", Err(SessionError::Network("down".to_owned()))));
    let tokens = MemoryTokenStore::with_token("auth_token", "t1");
    let store = SessionStore::new(platform(&api, &tokens));

    store.refresh().await;

    assert_eq!(tokens.get(), None);
    assert_eq!(store.session().user, None);
}

#[tokio::test]
async fn prerender_resolves_without_network() {
    let api = Arc::new(FakeAuthApi::new().with_account("123456", developer001(), "t1"));
    let tokens = MemoryTokenStore::with_token("auth_token", "t1");
    let store = SessionStore::new(platform(&api, &tokens).with_mode(RenderMode::PreRender));

    store.resolve().await;

    assert!(api.me_calls().is_empty());
    assert_eq!(store.session(), Session { user: None, status: SessionStatus::Ready });
}

#[tokio::test]
async fn initialize_resolves_once() {
    let api = Arc::new(FakeAuthApi::new().with_account("123456", developer001(), "t1"));
    let tokens = MemoryTokenStore::with_token("auth_token", "t1");
    let store = SessionStore::new(platform(&api, &tokens));

    store.initialize().await;
    store.initialize().await;

    assert_eq!(api.me_calls().len(), 1);
    assert_eq!(store.session().user, Some(developer001()));
}

#[tokio::test]
async fn status_passes_through_resolving() {
    let api = Arc::new(FakeAuthApi::new().with_account("123456", developer001(), "t1"));
    let gate = api.hold_current_user();
    let tokens = MemoryTokenStore::with_token("auth_token", "t1");
    let store = SessionStore::new(platform(&api, &tokens));

    let task = tokio::spawn({
        let store = store.clone();
        async move { store.resolve().await }
    });
    wait_for_me_calls(&api, 1).await;
    assert_eq!(store.session().status, SessionStatus::Resolving);
    assert!(store.session().loading());

    gate.notify_one();
    task.await.unwrap();
    assert_eq!(store.session().status, SessionStatus::Ready);
}

#[tokio::test]
async fn concurrent_resolves_are_serialized() {
    let api = Arc::new(FakeAuthApi::new().with_account("123456", developer001(), "t1"));
    let gate = api.hold_current_user();
    let tokens = MemoryTokenStore::with_token("auth_token", "t1");
    let store = SessionStore::new(platform(&api, &tokens));

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.resolve().await }
    });
    let second = tokio::spawn({
        let store = store.clone();
        async move { store.resolve().await }
    });
    wait_for_me_calls(&api, 1).await;
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    assert_eq!(api.me_calls().len(), 1);

    gate.notify_one();
    wait_for_me_calls(&api, 2).await;
    gate.notify_one();
    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(api.me_calls().len(), 2);
    assert_eq!(store.session().user, Some(developer001()));
}

#[tokio::test]
async fn refresh_from_ready_stays_ready() {
    let api = Arc::new(FakeAuthApi::new().with_account("123456", developer001(), "t1"));
    let tokens = MemoryTokenStore::new("auth_token");
    let store = SessionStore::new(platform(&api, &tokens));
    store.login("developer001", "123456").await.unwrap();
    let states = store.watch();

    let gate = api.hold_current_user();
    let task = tokio::spawn({
        let store = store.clone();
        async move { store.refresh().await }
    });
    wait_for_me_calls(&api, 1).await;
    assert_eq!(store.session().status, SessionStatus::Ready);

    gate.notify_one();
    task.await.unwrap();
    assert!(!states.has_changed().unwrap());
}

#[tokio::test]
async fn stale_resolution_does_not_overwrite_login() {
    let api = Arc::new(
        FakeAuthApi::new()
            .with_account("123456", developer001(), "t1")
            .with_session("old", Err(SessionError::Unauthorized(String::new()))),
    );
    let gate = api.hold_current_user();
    let tokens = MemoryTokenStore::with_token("auth_token", "old");
    let store = SessionStore::new(platform(&api, &tokens));

    let pending = tokio::spawn({
        let store = store.clone();
        async move { store.resolve().await }
    });
    wait_for_me_calls(&api, 1).await;

    store.login("developer001", "123456").await.unwrap();
    gate.notify_one();
    pending.await.unwrap();

    assert_eq!(store.session().user, Some(developer001()));
    assert_eq!(tokens.get().as_deref(), Some("t1"));
}

// =============================================================
// cross-tab
// =============================================================

#[tokio::test]
async fn other_tab_login_is_picked_up_on_notification() {
    let api = Arc::new(FakeAuthApi::new().with_account("123456", developer001(), "t1"));
    let tab_a = MemoryTokenStore::new("auth_token");
    let tab_b = tab_a.open_tab();
    let store_a = SessionStore::new(platform(&api, &tab_a));
    let store_b = SessionStore::new(platform(&api, &tab_b));
    let mut feed_b = tab_b.subscribe();

    let signed_in = store_a.login("developer001", "123456").await.unwrap();
    let change = feed_b.try_changed().unwrap();
    store_b.handle_token_change(change).await;

    assert_eq!(store_b.session().user, Some(signed_in));
}

#[tokio::test]
async fn other_tab_logout_clears_without_network() {
    let api = Arc::new(FakeAuthApi::new().with_account("123456", developer001(), "t1"));
    let tab_a = MemoryTokenStore::new("auth_token");
    let tab_b = tab_a.open_tab();
    let store_a = SessionStore::new(platform(&api, &tab_a));
    let store_b = SessionStore::new(platform(&api, &tab_b));
    store_a.login("developer001", "123456").await.unwrap();
    store_b.resolve().await;
    let calls = api.me_calls().len();

    store_b.handle_token_change(TokenChange::removed()).await;

    assert_eq!(store_b.session(), Session { user: None, status: SessionStatus::Ready });
    assert_eq!(api.me_calls().len(), calls);
}

#[tokio::test]
async fn run_sync_follows_other_tab_until_closed() {
    let api = Arc::new(FakeAuthApi::new().with_account("123456", developer001(), "t1"));
    let tab_a = MemoryTokenStore::new("auth_token");
    let tab_b = tab_a.open_tab();
    let store_a = SessionStore::new(platform(&api, &tab_a));
    let store_b = SessionStore::new(platform(&api, &tab_b));
    let sync = tokio::spawn(store_b.run_sync());
    let mut states_b = store_b.watch();

    store_a.login("developer001", "123456").await.unwrap();
    states_b.wait_for(|s| s.user.is_some()).await.unwrap();
    assert_eq!(store_b.session().user, Some(developer001()));

    store_a.logout().await.unwrap();
    states_b.wait_for(|s| s.user.is_none()).await.unwrap();

    store_b.close();
    sync.await.unwrap();
}

// =============================================================
// event bus
// =============================================================

#[tokio::test]
async fn login_event_from_page_applies_when_token_present() {
    let api = Arc::new(FakeAuthApi::new());
    let tokens = MemoryTokenStore::with_token("auth_token", "t1");
    let events = EventBus::new();
    let store = SessionStore::new(platform(&api, &tokens).with_events(events.clone()));

    events.emit(&SessionEvent::Login(developer001()));
    assert_eq!(store.session().user, Some(developer001()));

    events.emit(&SessionEvent::Logout);
    assert_eq!(store.session().user, None);
}

#[tokio::test]
async fn login_event_without_token_is_ignored() {
    let api = Arc::new(FakeAuthApi::new());
    let tokens = MemoryTokenStore::new("auth_token");
    let events = EventBus::new();
    let store = SessionStore::new(platform(&api, &tokens).with_events(events.clone()));

    events.emit(&SessionEvent::Login(developer001()));

    assert_eq!(store.session(), Session::default());
}

// =============================================================
// close
// =============================================================

#[tokio::test]
async fn close_rejects_mutations_and_drops_listener() {
    let (api, tokens, store) = fixture();
    assert_eq!(store.platform().events.listener_count(), 1);

    store.close();

    assert!(store.is_closed());
    assert_eq!(store.platform().events.listener_count(), 0);
    assert!(matches!(store.login("developer001", "123456").await, Err(SessionError::CallerMisuse(_))));
    assert!(matches!(store.logout().await, Err(SessionError::CallerMisuse(_))));
    assert_eq!(api.login_calls(), 0);
    assert_eq!(tokens.get(), None);
}

#[tokio::test]
async fn completion_after_close_is_discarded() {
    let api = Arc::new(FakeAuthApi::new().with_account("123456", developer001(), "t1"));
    let gate = api.hold_current_user();
    let tokens = MemoryTokenStore::with_token("auth_token", "t1");
    let store = SessionStore::new(platform(&api, &tokens));

    let pending = tokio::spawn({
        let store = store.clone();
        async move { store.resolve().await }
    });
    wait_for_me_calls(&api, 1).await;
    store.close();
    gate.notify_one();
    pending.await.unwrap();

    assert_eq!(store.session().user, None);
    assert_eq!(store.session().status, SessionStatus::Resolving);
}
