//! Profile fetch, update, and cache behavior.

use juniper_client::types::{AvatarUpload, ProfileUpdate};
use juniper_client::{ClientConfig, StoreContext, StoreError};
use juniper_integration_tests::{MockApi, MockResponse};

fn profile_body(first_name: &str) -> String {
    serde_json::json!({
        "id": "u1",
        "email": "ada@example.com",
        "firstName": first_name,
    })
    .to_string()
}

fn authenticated_context(base_url: &str, dir: &tempfile::TempDir) -> StoreContext {
    let config = ClientConfig::new(base_url, dir.path()).expect("config");
    let store = StoreContext::new(config).expect("context");
    store.session().set_token("tok").expect("set token");
    store
}

#[tokio::test]
async fn test_fetch_populates_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockApi::start(vec![MockResponse::ok(profile_body("Ada"))]).await;

    let store = authenticated_context(&server.base_url(), &dir);
    let profile = store.profile().fetch_profile().await.expect("fetch");
    assert_eq!(profile.first_name.as_deref(), Some("Ada"));

    let cached = store.profile().cached_profile().await.expect("cached");
    assert_eq!(cached.first_name.as_deref(), Some("Ada"));
    assert!(dir.path().join("profile-store.json").exists());
}

#[tokio::test]
async fn test_cache_survives_restart_while_authenticated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockApi::start(vec![MockResponse::ok(profile_body("Ada"))]).await;

    let store = authenticated_context(&server.base_url(), &dir);
    store.profile().fetch_profile().await.expect("fetch");

    // A new context over the same data dir sees the cache without any
    // network traffic.
    let config = ClientConfig::new(&server.base_url(), dir.path()).expect("config");
    let rebuilt = StoreContext::new(config).expect("context");
    let cached = rebuilt.profile().cached_profile().await.expect("cached");
    assert_eq!(cached.first_name.as_deref(), Some("Ada"));
    assert_eq!(server.captured().await.len(), 1);
}

#[tokio::test]
async fn test_update_sends_multipart_and_refreshes_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockApi::start(vec![MockResponse::ok(profile_body("Grace"))]).await;

    let store = authenticated_context(&server.base_url(), &dir);
    let update = ProfileUpdate {
        first_name: Some("Grace".to_string()),
        avatar: Some(AvatarUpload {
            file_name: "avatar.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        }),
        ..ProfileUpdate::default()
    };
    let profile = store.profile().update_profile(update).await.expect("update");
    assert_eq!(profile.first_name.as_deref(), Some("Grace"));

    let captured = server.captured().await;
    assert_eq!(captured[0].method, "PUT");
    assert_eq!(captured[0].path, "/users/update");
    assert!(captured[0].body.contains("firstName"));
    assert!(captured[0].body.contains("avatar.png"));

    let cached = store.profile().cached_profile().await.expect("cached");
    assert_eq!(cached.first_name.as_deref(), Some("Grace"));
}

#[tokio::test]
async fn test_logout_drops_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockApi::start(vec![MockResponse::ok(profile_body("Ada"))]).await;

    let store = authenticated_context(&server.base_url(), &dir);
    store.profile().fetch_profile().await.expect("fetch");
    store.logout().await.expect("logout");

    assert!(store.profile().cached_profile().await.is_none());
    assert!(!dir.path().join("profile-store.json").exists());
}

#[tokio::test]
async fn test_anonymous_fetch_is_auth_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockApi::start(vec![]).await;

    let config = ClientConfig::new(&server.base_url(), dir.path()).expect("config");
    let store = StoreContext::new(config).expect("context");
    let result = store.profile().fetch_profile().await;
    assert!(matches!(result, Err(StoreError::Auth(_))));
    assert!(server.captured().await.is_empty());
}
