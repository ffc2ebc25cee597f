//! Tracker settings commands.

use abandoned_cart_service::services::SettingsUpdate;
use abandoned_cart_service::state::AppState;

/// Print the effective settings as JSON.
///
/// # Errors
///
/// Returns an error if the settings table cannot be read.
pub async fn get(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    let settings = state.settings().load().await?;
    super::print_json(&settings)?;
    Ok(())
}

/// Change one setting and print the result.
///
/// # Errors
///
/// Returns an error for an unknown key, an invalid value, or a failed write.
pub async fn set(
    state: &AppState,
    key: &str,
    value: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let update = SettingsUpdate::from_pair(key, value)?;
    let settings = state.settings().update(update).await?;

    tracing::info!("Setting {} updated", key);
    super::print_json(&settings)?;
    Ok(())
}
