//! Manual sweep trigger.

use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;

use crate::error::AppError;
use crate::middleware::RequireAdminToken;
use crate::services::SweepReport;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/sweep", post(run_sweep))
}

/// Run one sweep now, outside the timer.
///
/// # Errors
///
/// Returns `AppError` if settings or the store cannot be read.
pub async fn run_sweep(
    _auth: RequireAdminToken,
    State(state): State<AppState>,
) -> Result<Json<SweepReport>, AppError> {
    Ok(Json(state.sweeper().sweep(Utc::now()).await?))
}
