//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! ac-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `TRACKER_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Tracker migrations: `crates/service/migrations/`

use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the tracker migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("TRACKER_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| MigrationError::MissingEnvVar("TRACKER_DATABASE_URL"))?;

    tracing::info!("Connecting to tracker database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running tracker migrations...");
    sqlx::migrate!("../service/migrations").run(&pool).await?;

    tracing::info!("Tracker migrations complete!");
    Ok(())
}

