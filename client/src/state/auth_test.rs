use super::*;
use jiuwen_session::SessionStatus;
use schema::Role;

fn user(role: Role) -> User {
    User { id: 1, username: "developer001".to_owned(), email: None, role, is_active: true }
}

#[test]
fn default_state_is_loading() {
    let state = AuthState::default();
    assert!(state.loading);
    assert!(state.user.is_none());
}

#[test]
fn ready_admin_session_maps_flags() {
    let session = Session { user: Some(user(Role::Admin)), status: SessionStatus::Ready };
    let state = AuthState::from_session(&session, true);

    assert!(!state.loading);
    assert!(state.is_admin);
    assert!(!state.is_root);
    assert!(state.live);
    assert!(state.token_present);
    assert_eq!(state.display_name(), Some("developer001"));
}

#[test]
fn detached_view_round_trips_backing() {
    let state = AuthState::from_view(&SessionView::detached(), false);
    assert!(!state.live);
    assert_eq!(state.view(), SessionView::detached());
}
