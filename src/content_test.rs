use super::*;
use crate::token::MemoryTokenStore;

fn client(tokens: &MemoryTokenStore) -> SiteClient {
    let config = SessionConfig::default().with_base_url("http://127.0.0.1:9");
    SiteClient::new(&config, Arc::new(tokens.clone())).unwrap()
}

#[tokio::test]
async fn empty_user_update_is_rejected_before_sending() {
    let client = client(&MemoryTokenStore::new("auth_token"));

    let err = client.update_user(3, &UserUpdate::default()).await.unwrap_err();

    assert!(matches!(err, SessionError::CallerMisuse(_)));
}

#[test]
fn bearer_follows_token_store() {
    let tokens = MemoryTokenStore::new("auth_token");
    let client = client(&tokens);
    assert_eq!(client.bearer(), None);

    tokens.set("t1").unwrap();
    assert_eq!(client.bearer().as_deref(), Some("t1"));
}

#[test]
fn debug_shows_base_url_only() {
    let tokens = MemoryTokenStore::with_token("auth_token", "secret-token");
    let rendered = format!("{:?}", client(&tokens));
    assert!(rendered.contains("127.0.0.1:9"));
    assert!(!rendered.contains("secret-token"));
}
