use super::*;
use schema::{Role, User};

fn signed_in(role: Role) -> AuthState {
    AuthState {
        user: Some(User { id: 7, username: "jiuwen_root".to_owned(), email: None, role, is_active: true }),
        loading: false,
        is_admin: role.is_admin(),
        is_root: role.is_root(),
        live: true,
        token_present: true,
    }
}

#[test]
fn developer_menu_only_signs_out() {
    assert_eq!(menu_entries(&signed_in(Role::Developer)), vec![MenuEntry::SignOut]);
}

#[test]
fn admin_menu_links_console() {
    assert_eq!(menu_entries(&signed_in(Role::Admin)), vec![MenuEntry::AdminConsole, MenuEntry::SignOut]);
    assert_eq!(MenuEntry::AdminConsole.href(), Some("/admin"));
}

#[test]
fn root_menu_links_console_and_users() {
    assert_eq!(
        menu_entries(&signed_in(Role::Root)),
        vec![MenuEntry::AdminConsole, MenuEntry::ManageUsers, MenuEntry::SignOut]
    );
    assert_eq!(MenuEntry::SignOut.href(), None);
}

#[test]
fn role_badge_uses_role_label() {
    assert_eq!(role_badge(&signed_in(Role::Root)), Some(Role::Root.label()));
    assert_eq!(role_badge(&AuthState::default()), None);
}
