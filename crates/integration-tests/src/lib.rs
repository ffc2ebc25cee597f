//! Integration tests for the abandoned cart tracker.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p abandoned-cart-integration-tests
//! ```
//!
//! No database is needed: the application runs over the in-memory store and
//! webhooks go to a throwaway local server.
//!
//! # Test Categories
//!
//! - `lifecycle` - Tracker, sweeper and reconciler working together
//! - `hooks` - Storefront hook endpoints
//! - `admin_api` - Admin API endpoints and authentication

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, header},
    routing::post,
};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;
use url::Url;

use abandoned_cart_service::config::TrackerSettings;
use abandoned_cart_service::db::MemoryStore;
use abandoned_cart_service::routes;
use abandoned_cart_service::state::{AppState, StateOptions};

/// Admin token used by tests that exercise authentication.
pub const TEST_ADMIN_TOKEN: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

type Received = Arc<Mutex<Vec<Value>>>;

/// Local webhook endpoint that records every JSON body it receives.
pub struct MockWebhook {
    url: Url,
    received: Received,
}

impl MockWebhook {
    /// Start a webhook that answers every request with `status`.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start(status: StatusCode) -> Self {
        Self::start_delayed(status, Duration::ZERO).await
    }

    /// Start a webhook that holds every request for `delay` before answering.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start_delayed(status: StatusCode, delay: Duration) -> Self {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/hook", post(record_body))
            .with_state(MockState {
                received: received.clone(),
                status,
                delay,
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock webhook");
        let addr = listener.local_addr().expect("mock webhook address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let url = format!("http://{addr}/hook")
            .parse()
            .expect("mock webhook url");
        Self { url, received }
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Bodies received so far, in arrival order.
    pub async fn received(&self) -> Vec<Value> {
        self.received.lock().await.clone()
    }
}

#[derive(Clone)]
struct MockState {
    received: Received,
    status: StatusCode,
    delay: Duration,
}

async fn record_body(State(state): State<MockState>, Json(body): Json<Value>) -> StatusCode {
    state.received.lock().await.push(body);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    state.status
}

/// URL of a local port with nothing listening on it.
///
/// # Panics
///
/// Panics if no local port can be bound.
#[must_use]
pub fn closed_port_url() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe port");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{addr}/hook").parse().expect("closed port url")
}

/// Default settings pointed at `url`.
#[must_use]
pub fn settings_with_url(url: &Url) -> TrackerSettings {
    TrackerSettings {
        webhook_url: Some(url.clone()),
        ..TrackerSettings::default()
    }
}

/// Parse an RFC 3339 instant.
///
/// # Panics
///
/// Panics on malformed input.
#[must_use]
pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid RFC 3339 timestamp")
        .with_timezone(&Utc)
}

/// Webhook client timeout used by [`TestApp`].
pub const TEST_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(2);

/// The application wired over an in-memory store.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestApp {
    /// Open admin API, given tracker defaults.
    ///
    /// # Panics
    ///
    /// Panics if the webhook client cannot be built.
    #[must_use]
    pub fn new(defaults: TrackerSettings) -> Self {
        Self::build(defaults, None)
    }

    /// Admin API guarded by [`TEST_ADMIN_TOKEN`].
    ///
    /// # Panics
    ///
    /// Panics if the webhook client cannot be built.
    #[must_use]
    pub fn with_admin_token(defaults: TrackerSettings) -> Self {
        Self::build(defaults, Some(SecretString::from(TEST_ADMIN_TOKEN)))
    }

    fn build(defaults: TrackerSettings, admin_token: Option<SecretString>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            store.clone(),
            store.clone(),
            StateOptions {
                admin_token,
                tracker_defaults: defaults,
                webhook_timeout: TEST_WEBHOOK_TIMEOUT,
                dispatch_concurrency: 2,
            },
        )
        .expect("application state");
        Self { store, state }
    }

    #[must_use]
    pub fn router(&self) -> Router {
        routes::router(self.state.clone())
    }

    /// Send one request through the router; returns the status and the JSON
    /// body (`Value::Null` when the body is empty or not JSON).
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body cannot be read.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.expect("router response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

/// Build a request with an optional JSON body and bearer token.
///
/// # Panics
///
/// Panics on an invalid method/URI combination.
#[must_use]
pub fn request(
    method: Method,
    uri: &str,
    body: Option<&Value>,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    };
    request.expect("valid request")
}
