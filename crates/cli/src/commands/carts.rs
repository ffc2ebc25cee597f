//! Cart record management commands.
//!
//! # Usage
//!
//! ```bash
//! ac-cli carts list --status pending
//! ac-cli carts resend 42
//! ac-cli carts recover 42
//! ac-cli carts delete 42
//! ```

use abandoned_cart_core::{CartRecordId, CartStatus};
use abandoned_cart_service::db::CartFilter;
use abandoned_cart_service::state::AppState;

/// Print carts as JSON, newest first.
///
/// # Errors
///
/// Returns an error for an unknown status or a failed query.
pub async fn list(
    state: &AppState,
    status: Option<String>,
    limit: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = status.map(|s| s.parse::<CartStatus>()).transpose()?;
    let carts = state
        .admin()
        .list(CartFilter {
            status,
            limit: limit.max(1),
        })
        .await?;

    tracing::info!("Found {} cart(s)", carts.len());
    super::print_json(&carts)?;
    Ok(())
}

/// Send one cart to the webhook now.
///
/// # Errors
///
/// Returns an error if the cart does not exist, no webhook URL is set, or
/// the endpoint cannot be reached.
pub async fn resend(state: &AppState, id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let cart = state.admin().resend(CartRecordId::new(id)).await?;
    tracing::info!("Cart {} sent to webhook", cart.id);
    Ok(())
}

/// Mark one cart recovered.
///
/// # Errors
///
/// Returns an error if the cart does not exist.
pub async fn recover(state: &AppState, id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let cart = state.admin().recover(CartRecordId::new(id)).await?;
    tracing::info!("Cart {} is now {}", cart.id, cart.status);
    Ok(())
}

/// Delete one cart.
///
/// # Errors
///
/// Returns an error if the cart does not exist.
pub async fn delete(state: &AppState, id: i64) -> Result<(), Box<dyn std::error::Error>> {
    state.admin().delete(CartRecordId::new(id)).await?;
    tracing::info!("Cart {} deleted", id);
    Ok(())
}
