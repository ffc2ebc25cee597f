//! Integration tests for the storefront hook endpoints.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use abandoned_cart_core::{CartItem, CartStatus};
use abandoned_cart_integration_tests::{TestApp, request};
use abandoned_cart_service::config::TrackerSettings;

fn app() -> TestApp {
    TestApp::new(TrackerSettings::default())
}

#[tokio::test]
async fn test_cart_hook_creates_then_refreshes() {
    let app = app();
    let body = json!({
        "email": "Shopper@Example.com",
        "phone": "555-0100",
        "name": "Ada",
        "items": [{"product_id": 11, "quantity": 2}]
    });

    let (status, _) = app
        .send(request(Method::POST, "/hooks/cart", Some(&body), None))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let updated = json!({
        "email": "shopper@example.com",
        "items": [{"product_id": 12, "quantity": 1}]
    });
    let (status, _) = app
        .send(request(Method::POST, "/hooks/cart", Some(&updated), None))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let records = app.store.all().await;
    assert_eq!(records.len(), 1);
    let record = records.first().unwrap();
    assert_eq!(record.email.as_str(), "shopper@example.com");
    assert_eq!(record.cart_items, vec![CartItem::new(12, 1)]);
    assert_eq!(record.phone.as_deref(), Some("555-0100"));
    assert_eq!(record.status, CartStatus::Pending);
}

#[tokio::test]
async fn test_cart_hook_ignores_unusable_input() {
    let app = app();
    let bodies = [
        json!({"items": [{"product_id": 1, "quantity": 1}]}),
        json!({"email": "not-an-email", "items": [{"product_id": 1, "quantity": 1}]}),
        json!({"email": "a@b.com", "items": []}),
    ];

    for body in &bodies {
        let (status, _) = app
            .send(request(Method::POST, "/hooks/cart", Some(body), None))
            .await;
        assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    }

    assert!(app.store.all().await.is_empty());
}

#[tokio::test]
async fn test_order_hook_recovers_pending_cart() {
    let app = app();
    let cart = json!({
        "email": "buyer@example.com",
        "items": [{"product_id": 3, "quantity": 1}]
    });
    app.send(request(Method::POST, "/hooks/cart", Some(&cart), None))
        .await;

    let order = json!({"order_id": "1001", "billing_email": "BUYER@example.com"});
    let (status, _) = app
        .send(request(
            Method::POST,
            "/hooks/order-completed",
            Some(&order),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let records = app.store.all().await;
    assert_eq!(records.first().unwrap().status, CartStatus::Recovered);
}

#[tokio::test]
async fn test_order_hook_with_bad_email_is_accepted() {
    let app = app();
    let order = json!({"billing_email": ""});
    let (status, _) = app
        .send(request(
            Method::POST,
            "/hooks/order-completed",
            Some(&order),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
}
