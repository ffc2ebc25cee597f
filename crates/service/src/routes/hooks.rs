//! Storefront hooks.
//!
//! These endpoints sit on the shopper's request path, so they never fail:
//! every problem is logged (and reported to Sentry when it is ours) and the
//! answer is always `202 Accepted`.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use abandoned_cart_core::{CartItem, CartSnapshot, Email};

use crate::state::AppState;

/// Build the hooks router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/hooks/cart", post(cart_updated))
        .route("/hooks/order-completed", post(order_completed))
}

/// Cart snapshot as posted by the storefront.
///
/// The email stays a raw string here so a malformed address degrades to
/// "no email known" instead of rejecting the whole body.
#[derive(Debug, Deserialize)]
pub struct CartHookRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl CartHookRequest {
    fn into_snapshot(self) -> CartSnapshot {
        let email = self
            .email
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| match Email::parse(&raw) {
                Ok(email) => Some(email),
                Err(e) => {
                    debug!(error = %e, "Ignoring unusable cart email");
                    None
                }
            });

        CartSnapshot {
            email,
            phone: self.phone.filter(|s| !s.trim().is_empty()),
            name: self.name.filter(|s| !s.trim().is_empty()),
            items: self.items,
        }
    }
}

/// Completed order notification.
#[derive(Debug, Deserialize)]
pub struct OrderCompletedRequest {
    #[serde(default)]
    pub order_id: Option<String>,
    pub billing_email: String,
}

/// Record a cart change.
pub async fn cart_updated(
    State(state): State<AppState>,
    payload: Result<Json<CartHookRequest>, JsonRejection>,
) -> StatusCode {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed cart hook body");
            return StatusCode::ACCEPTED;
        }
    };

    if let Err(e) = state
        .tracker()
        .track(request.into_snapshot(), Utc::now())
        .await
    {
        let event_id = sentry::capture_error(&e);
        tracing::error!(error = %e, sentry_event_id = %event_id, "Failed to track cart");
    }

    StatusCode::ACCEPTED
}

/// Recover carts for a completed order's billing email.
pub async fn order_completed(
    State(state): State<AppState>,
    payload: Result<Json<OrderCompletedRequest>, JsonRejection>,
) -> StatusCode {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed order hook body");
            return StatusCode::ACCEPTED;
        }
    };

    let email = match Email::parse(&request.billing_email) {
        Ok(email) => email,
        Err(e) => {
            warn!(order_id = ?request.order_id, error = %e, "Order without usable billing email");
            return StatusCode::ACCEPTED;
        }
    };

    if let Err(e) = state.reconciler().order_completed(&email).await {
        let event_id = sentry::capture_error(&e);
        tracing::error!(
            order_id = ?request.order_id,
            error = %e,
            sentry_event_id = %event_id,
            "Failed to reconcile completed order"
        );
    }

    StatusCode::ACCEPTED
}
