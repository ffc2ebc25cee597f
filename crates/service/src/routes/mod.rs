//! HTTP route handlers for the tracker.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Liveness
//! GET    /health/ready            - Readiness (store ping)
//!
//! # Storefront hooks (always 202)
//! POST   /hooks/cart              - Cart snapshot
//! POST   /hooks/order-completed   - Completed order
//!
//! # Admin API (bearer token)
//! GET    /api/carts               - List carts (?status=&limit=)
//! GET    /api/carts/{id}          - Cart detail
//! DELETE /api/carts/{id}          - Delete cart
//! POST   /api/carts/{id}/resend   - Send to webhook now
//! POST   /api/carts/{id}/recover  - Mark recovered
//! GET    /api/settings            - Current settings
//! PUT    /api/settings            - Update settings
//! POST   /api/sweep               - Run one sweep
//! ```

pub mod carts;
pub mod hooks;
pub mod settings;
pub mod sweep;

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::state::AppState;

/// Build the full application router (without outer middleware layers).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(hooks::router())
        .merge(carts::router())
        .merge(settings::router())
        .merge(sweep::router())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.carts().ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::db::MemoryStore;
    use crate::state::StateOptions;

    fn app() -> Router {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), store, StateOptions::default()).unwrap();
        router(state)
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        for path in ["/health", "/health/ready"] {
            let response = app()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{path}");
        }
    }

    #[tokio::test]
    async fn test_malformed_hook_body_still_accepted() {
        let response = app()
            .oneshot(
                Request::post("/hooks/cart")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
