//! Authenticated wishlist flows against the scripted mock API.

use juniper_client::types::ProductSnapshot;
use juniper_client::{ClientConfig, StoreContext, StoreError};
use juniper_core::{CurrencyCode, Price, ProductId};
use juniper_integration_tests::{MockApi, MockResponse};
use rust_decimal::Decimal;

fn wishlist_body(items: &[(&str, &str)]) -> String {
    let items: Vec<serde_json::Value> = items
        .iter()
        .map(|(id, size)| {
            serde_json::json!({
                "productId": id,
                "size": size,
                "addedAt": "2026-08-01T00:00:00Z",
                "product": {
                    "id": id,
                    "name": "Wool Scarf",
                    "price": {"amount": "35.00", "currencyCode": "USD"},
                },
            })
        })
        .collect();
    serde_json::json!({ "items": items }).to_string()
}

fn cart_body(items: &[(&str, &str, u32)]) -> String {
    let items: Vec<serde_json::Value> = items
        .iter()
        .map(|(id, size, quantity)| {
            serde_json::json!({
                "productId": id,
                "size": size,
                "quantity": quantity,
                "price": {"amount": "35.00", "currencyCode": "USD"},
            })
        })
        .collect();
    serde_json::json!({ "items": items }).to_string()
}

fn authenticated_context(base_url: &str, dir: &tempfile::TempDir) -> StoreContext {
    let config = ClientConfig::new(base_url, dir.path()).expect("config");
    let store = StoreContext::new(config).expect("context");
    store.session().set_token("tok").expect("set token");
    store
}

fn product(id: &str) -> ProductSnapshot {
    ProductSnapshot {
        id: ProductId::new(id),
        name: "Wool Scarf".to_string(),
        price: Price::new(Decimal::new(3500, 2), CurrencyCode::USD),
        image: None,
    }
}

#[tokio::test]
async fn test_add_replaces_state_from_server_response() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockApi::start(vec![MockResponse::ok(wishlist_body(&[
        ("p1", "M"),
        ("p9", "default"),
    ]))])
    .await;

    let store = authenticated_context(&server.base_url(), &dir);
    store
        .wishlist()
        .add_item(product("p1"), Some("M"))
        .await
        .expect("add");

    let snapshot = store.wishlist().snapshot().await;
    assert_eq!(snapshot.entries.len(), 2);

    let captured = server.captured().await;
    assert_eq!(captured[0].method, "POST");
    assert_eq!(captured[0].path, "/wishlist");
    assert_eq!(captured[0].json()["productId"], "p1");
    assert_eq!(captured[0].json()["size"], "M");
}

#[tokio::test]
async fn test_duplicate_add_rejected_by_server() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockApi::start(vec![
        MockResponse::ok(wishlist_body(&[("p1", "M")])),
        MockResponse::error(400, "item is already in the wishlist"),
    ])
    .await;

    let store = authenticated_context(&server.base_url(), &dir);
    store
        .wishlist()
        .add_item(product("p1"), Some("M"))
        .await
        .expect("add");

    // The server owns the duplicate check; the request still goes out.
    let result = store.wishlist().add_item(product("p1"), Some("M")).await;
    assert!(matches!(result, Err(StoreError::Business(_))));
    assert_eq!(store.wishlist().snapshot().await.entries.len(), 1);
    assert_eq!(server.captured().await.len(), 2);
}

#[tokio::test]
async fn test_move_to_cart_updates_both_engines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockApi::start(vec![
        MockResponse::ok(wishlist_body(&[("p1", "M")])),
        MockResponse::ok(
            serde_json::json!({
                "wishlist": serde_json::from_str::<serde_json::Value>(&wishlist_body(&[]))
                    .expect("wishlist json"),
                "cart": serde_json::from_str::<serde_json::Value>(&cart_body(&[("p1", "M", 1)]))
                    .expect("cart json"),
            })
            .to_string(),
        ),
    ])
    .await;

    let store = authenticated_context(&server.base_url(), &dir);
    store
        .wishlist()
        .add_item(product("p1"), Some("M"))
        .await
        .expect("add");
    store
        .move_wishlist_item_to_cart(&ProductId::new("p1"), Some("M"), 1)
        .await
        .expect("move");

    // One atomic server response updated both engines.
    assert!(store.wishlist().snapshot().await.entries.is_empty());
    let cart = store.cart().snapshot().await;
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].product_id, ProductId::new("p1"));

    let captured = server.captured().await;
    assert_eq!(captured[1].method, "POST");
    assert_eq!(captured[1].path, "/wishlist/p1/M/move-to-cart");
    assert_eq!(captured[1].json()["quantity"], 1);
}

#[tokio::test]
async fn test_entry_key_is_percent_encoded_in_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockApi::start(vec![MockResponse::ok(wishlist_body(&[]))]).await;

    let store = authenticated_context(&server.base_url(), &dir);
    store
        .wishlist()
        .remove_item(&ProductId::new("gid://shop/1"), Some("M / L"))
        .await
        .expect("remove");

    let captured = server.captured().await;
    assert_eq!(
        captured[0].path,
        "/wishlist/gid%3A%2F%2Fshop%2F1/M%20%2F%20L"
    );
}

#[tokio::test]
async fn test_clear_wishlist_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockApi::start(vec![
        MockResponse::ok(wishlist_body(&[("p1", "default")])),
        MockResponse::ok(r#"{"success":true}"#),
    ])
    .await;

    let store = authenticated_context(&server.base_url(), &dir);
    store
        .wishlist()
        .add_item(product("p1"), None)
        .await
        .expect("add");
    store.wishlist().clear().await.expect("clear");

    let captured = server.captured().await;
    assert_eq!(captured[1].method, "DELETE");
    assert_eq!(captured[1].path, "/wishlist/clear");
    assert!(store.wishlist().snapshot().await.entries.is_empty());
}

#[tokio::test]
async fn test_unauthorized_in_one_engine_resets_the_other() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockApi::start(vec![
        MockResponse::ok(wishlist_body(&[("p1", "M")])),
        MockResponse::error(401, "session expired"),
    ])
    .await;

    let store = authenticated_context(&server.base_url(), &dir);
    store
        .wishlist()
        .add_item(product("p1"), Some("M"))
        .await
        .expect("add");
    assert_eq!(store.wishlist().snapshot().await.entries.len(), 1);

    // The cart call discovers the expired session.
    let result = store.cart().refresh().await;
    assert!(matches!(result, Err(StoreError::Auth(_))));
    assert!(!store.session().is_authenticated());

    // The logged-out user's wishlist must not linger in memory, or the
    // next guest mutation would persist it locally.
    assert!(store.wishlist().snapshot().await.entries.is_empty());
    store
        .wishlist()
        .add_item(product("p2"), None)
        .await
        .expect("guest add");
    let snapshot = store.wishlist().snapshot().await;
    assert_eq!(snapshot.entries.len(), 1);
    assert_eq!(snapshot.entries[0].product_id, ProductId::new("p2"));
}

#[tokio::test]
async fn test_business_error_surfaces_server_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockApi::start(vec![MockResponse::error(400, "item is already in the wishlist")])
        .await;

    let store = authenticated_context(&server.base_url(), &dir);
    let result = store.wishlist().add_item(product("p1"), None).await;

    match result {
        Err(StoreError::Business(message)) => {
            assert_eq!(message, "item is already in the wishlist");
        }
        other => panic!("expected business error, got {other:?}"),
    }
}
