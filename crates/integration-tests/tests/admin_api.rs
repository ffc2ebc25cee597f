//! Integration tests for the admin API: authentication, cart actions,
//! settings and manual sweeps.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use chrono::{TimeDelta, Utc};
use serde_json::{Value, json};

use abandoned_cart_core::{CartItem, CartRecordId, CartSnapshot, CartStatus, Email};
use abandoned_cart_integration_tests::{
    MockWebhook, TEST_ADMIN_TOKEN, TestApp, closed_port_url, request, settings_with_url,
};
use abandoned_cart_service::config::TrackerSettings;
use abandoned_cart_service::db::CartStore;

async fn seed(app: &TestApp, email: &str, minutes_ago: i64) -> CartRecordId {
    app.state
        .tracker()
        .track(
            CartSnapshot {
                email: Some(Email::parse(email).unwrap()),
                phone: None,
                name: Some("Ada".to_string()),
                items: vec![CartItem::new(1, 1)],
            },
            Utc::now() - TimeDelta::minutes(minutes_ago),
        )
        .await
        .unwrap()
        .record_id()
        .unwrap()
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_token_required_when_configured() {
    let app = TestApp::with_admin_token(TrackerSettings::default());

    let (status, _) = app
        .send(request(Method::GET, "/api/carts", None, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(request(Method::GET, "/api/carts", None, Some("wrong-token")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(request(Method::GET, "/api/carts", None, Some(TEST_ADMIN_TOKEN)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_hooks_do_not_need_token() {
    let app = TestApp::with_admin_token(TrackerSettings::default());
    let body = json!({"email": "a@b.com", "items": [{"product_id": 1, "quantity": 1}]});

    let (status, _) = app
        .send(request(Method::POST, "/hooks/cart", Some(&body), None))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(app.store.all().await.len(), 1);
}

// =============================================================================
// Cart listing and detail
// =============================================================================

#[tokio::test]
async fn test_list_newest_first_with_filter() {
    let app = TestApp::new(TrackerSettings::default());
    seed(&app, "old@b.com", 30).await;
    let recovered = seed(&app, "mid@b.com", 20).await;
    seed(&app, "new@b.com", 10).await;
    app.store.recover(recovered).await.unwrap();

    let (status, body) = app
        .send(request(Method::GET, "/api/carts", None, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    let emails: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails, vec!["new@b.com", "mid@b.com", "old@b.com"]);

    let (_, body) = app
        .send(request(
            Method::GET,
            "/api/carts?status=pending&limit=1",
            None,
            None,
        ))
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["email"], "new@b.com");

    let (status, _) = app
        .send(request(Method::GET, "/api/carts?status=lost", None, None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_cart_and_not_found() {
    let app = TestApp::new(TrackerSettings::default());
    let id = seed(&app, "a@b.com", 5).await;

    let (status, body) = app
        .send(request(Method::GET, &format!("/api/carts/{id}"), None, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@b.com");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["sent_to_make"], false);

    let (status, _) = app
        .send(request(Method::GET, "/api/carts/999", None, None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Cart actions
// =============================================================================

#[tokio::test]
async fn test_resend_delivers_and_flags() {
    let webhook = MockWebhook::start(StatusCode::OK).await;
    let app = TestApp::new(settings_with_url(webhook.url()));
    let id = seed(&app, "a@b.com", 1).await;

    let (status, body) = app
        .send(request(
            Method::POST,
            &format!("/api/carts/{id}/resend"),
            None,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sent_to_make"], true);

    let received = webhook.received().await;
    assert_eq!(received.len(), 1);
    let payload = received.first().unwrap();
    assert_eq!(payload["cart_id"], Value::from(i64::from(id)));
    assert_eq!(payload["name"], "Ada");
}

#[tokio::test]
async fn test_resend_failure_leaves_record_unsent() {
    let app = TestApp::new(settings_with_url(&closed_port_url()));
    let id = seed(&app, "a@b.com", 1).await;

    let (status, _) = app
        .send(request(
            Method::POST,
            &format!("/api/carts/{id}/resend"),
            None,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!app.store.get(id).await.unwrap().unwrap().sent_to_make);
}

#[tokio::test]
async fn test_resend_without_url_is_bad_request() {
    let app = TestApp::new(TrackerSettings::default());
    let id = seed(&app, "a@b.com", 1).await;

    let (status, _) = app
        .send(request(
            Method::POST,
            &format!("/api/carts/{id}/resend"),
            None,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recover_and_delete() {
    let app = TestApp::new(TrackerSettings::default());
    let id = seed(&app, "a@b.com", 1).await;

    let (status, body) = app
        .send(request(
            Method::POST,
            &format!("/api/carts/{id}/recover"),
            None,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "recovered");

    let (status, _) = app
        .send(request(Method::DELETE, &format!("/api/carts/{id}"), None, None))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.store.get(id).await.unwrap().is_none());

    let (status, _) = app
        .send(request(Method::DELETE, &format!("/api/carts/{id}"), None, None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(request(
            Method::POST,
            &format!("/api/carts/{id}/recover"),
            None,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Settings and sweeps
// =============================================================================

#[tokio::test]
async fn test_settings_round_trip() {
    let app = TestApp::new(TrackerSettings::default());

    let (status, body) = app
        .send(request(Method::GET, "/api/settings", None, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "webhook_url": null,
            "timeout_minutes": 60,
            "logging_enabled": false,
            "expiry_days": 30
        })
    );

    let update = json!({"webhook_url": "https://hook.make.com/abc", "timeout_minutes": 15});
    let (status, body) = app
        .send(request(Method::PUT, "/api/settings", Some(&update), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["webhook_url"], "https://hook.make.com/abc");
    assert_eq!(body["timeout_minutes"], 15);

    let invalid = json!({"timeout_minutes": 0});
    let (status, _) = app
        .send(request(Method::PUT, "/api/settings", Some(&invalid), None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .send(request(Method::GET, "/api/settings", None, None))
        .await;
    assert_eq!(body["timeout_minutes"], 15);
}

#[tokio::test]
async fn test_manual_sweep_uses_updated_settings() {
    let webhook = MockWebhook::start(StatusCode::OK).await;
    let app = TestApp::new(TrackerSettings::default());
    let id = seed(&app, "a@b.com", 20).await;

    let (status, body) = app
        .send(request(Method::POST, "/api/sweep", None, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidates"], 0);

    let update = json!({"webhook_url": webhook.url().as_str(), "timeout_minutes": 10});
    app.send(request(Method::PUT, "/api/settings", Some(&update), None))
        .await;

    let (status, body) = app
        .send(request(Method::POST, "/api/sweep", None, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], 1);
    assert_eq!(webhook.received().await.len(), 1);

    let record = app.store.get(id).await.unwrap().unwrap();
    assert!(record.sent_to_make);
    assert_eq!(record.status, CartStatus::Pending);
}
