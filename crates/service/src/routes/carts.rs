//! Admin API for cart records.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

use abandoned_cart_core::{CartRecord, CartRecordId, CartStatus};

use crate::db::{CartFilter, DEFAULT_LIST_LIMIT};
use crate::error::AppError;
use crate::middleware::RequireAdminToken;
use crate::state::AppState;

/// Upper bound on `limit` for listings.
const MAX_LIST_LIMIT: i64 = 1000;

/// Build the carts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/carts", get(list_carts))
        .route("/api/carts/{id}", get(get_cart).delete(delete_cart))
        .route("/api/carts/{id}/resend", post(resend_cart))
        .route("/api/carts/{id}/recover", post(recover_cart))
}

/// Query parameters for the cart listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

impl ListQuery {
    fn into_filter(self) -> Result<CartFilter, AppError> {
        let status = self
            .status
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<CartStatus>())
            .transpose()
            .map_err(AppError::BadRequest)?;

        let limit = self
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);

        Ok(CartFilter { status, limit })
    }
}

/// List carts, newest first.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an unknown status filter.
pub async fn list_carts(
    _auth: RequireAdminToken,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CartRecord>>, AppError> {
    let carts = state.admin().list(query.into_filter()?).await?;
    Ok(Json(carts))
}

/// Show one cart.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown id.
pub async fn get_cart(
    _auth: RequireAdminToken,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CartRecord>, AppError> {
    Ok(Json(state.admin().get(CartRecordId::new(id)).await?))
}

/// Send the cart to the webhook now.
///
/// # Errors
///
/// Returns `AppError::NotFound`, `AppError::BadRequest` (no webhook URL) or
/// `AppError::Webhook` (no response from the endpoint).
pub async fn resend_cart(
    _auth: RequireAdminToken,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CartRecord>, AppError> {
    Ok(Json(state.admin().resend(CartRecordId::new(id)).await?))
}

/// Mark the cart recovered.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown id.
pub async fn recover_cart(
    _auth: RequireAdminToken,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CartRecord>, AppError> {
    Ok(Json(state.admin().recover(CartRecordId::new(id)).await?))
}

/// Delete the cart.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown id.
pub async fn delete_cart(
    _auth: RequireAdminToken,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.admin().delete(CartRecordId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
