//! Admin API for the tracker settings.

use axum::{Json, Router, extract::State, routing::get};

use crate::config::TrackerSettings;
use crate::error::AppError;
use crate::middleware::RequireAdminToken;
use crate::services::SettingsUpdate;
use crate::state::AppState;

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/settings", get(get_settings).put(update_settings))
}

/// Current effective settings.
///
/// # Errors
///
/// Returns `AppError::Settings` if the settings table cannot be read.
pub async fn get_settings(
    _auth: RequireAdminToken,
    State(state): State<AppState>,
) -> Result<Json<TrackerSettings>, AppError> {
    Ok(Json(state.settings().load().await?))
}

/// Change some or all of the settings. Applies on the next sweep.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the result would be invalid.
pub async fn update_settings(
    _auth: RequireAdminToken,
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<TrackerSettings>, AppError> {
    Ok(Json(state.settings().update(update).await?))
}
