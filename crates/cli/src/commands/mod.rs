//! CLI subcommands.

pub mod carts;
pub mod migrate;
pub mod settings;
pub mod sweep;

use std::sync::Arc;

use abandoned_cart_service::config::{ConfigError, ServiceConfig};
use abandoned_cart_service::db::{self, PgStore};
use abandoned_cart_service::services::DispatchError;
use abandoned_cart_service::state::{AppState, StateOptions};
use thiserror::Error;

/// Errors from setting up a command.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Webhook client error: {0}")]
    Client(#[from] DispatchError),
}

/// Load configuration and wire the services over the `PostgreSQL` store.
///
/// # Errors
///
/// Returns `ConnectError` if configuration is invalid or the database is
/// unreachable.
pub async fn connect() -> Result<AppState, ConnectError> {
    let config = ServiceConfig::from_env()?;

    tracing::info!("Connecting to tracker database...");
    let pool = db::create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(pool));

    Ok(AppState::new(
        store.clone(),
        store,
        StateOptions::from(&config),
    )?)
}

/// Print a value as pretty JSON on stdout.
fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    let rendered = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}
