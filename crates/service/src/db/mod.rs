//! Record store for abandoned carts.
//!
//! # Tables
//!
//! - `abandoned_carts` - One row per tracked cart (see [`CartRecord`])
//! - `settings` - Tracker options editable from the admin API (JSONB values)
//!
//! # Backends
//!
//! - [`postgres::PgStore`] - Production store
//! - [`memory::MemoryStore`] - In-process store for tests and local runs
//!
//! # Migrations
//!
//! Migrations are stored in `crates/service/migrations/` and run via:
//! ```bash
//! cargo run -p abandoned-cart-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;
pub mod settings;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use abandoned_cart_core::{CartItem, CartRecord, CartRecordId, CartStatus, Email};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use settings::{SettingsError, SettingsStore};

/// Default page size for record listings.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., a second pending row for one email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Fields of a cart written by the tracker.
#[derive(Debug, Clone)]
pub struct NewCartRecord {
    pub email: Email,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub cart_items: Vec<CartItem>,
}

/// Result of upserting a pending cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: CartRecordId,
    /// `true` when a new row was inserted, `false` when a pending row was refreshed.
    pub created: bool,
}

/// Listing filter for the admin surface.
#[derive(Debug, Clone, Copy)]
pub struct CartFilter {
    pub status: Option<CartStatus>,
    pub limit: i64,
}

impl Default for CartFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

/// Durable table of cart records.
///
/// Every method is atomic on its own; no transaction spans two calls.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The pending record for `email`, if any.
    async fn find_pending_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<CartRecord>, RepositoryError>;

    /// Insert a pending record for the email, or refresh the existing one.
    ///
    /// A refresh overwrites `cart_items` and sets `created_at = now`; id,
    /// phone, name and `sent_to_make` are kept.
    async fn upsert_pending(
        &self,
        cart: NewCartRecord,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, RepositoryError>;

    /// Look up a record by id.
    async fn get(&self, id: CartRecordId) -> Result<Option<CartRecord>, RepositoryError>;

    /// Set `sent_to_make`. Returns whether a row matched.
    async fn mark_sent(&self, id: CartRecordId) -> Result<bool, RepositoryError>;

    /// Move one record from pending to recovered. Returns whether it moved.
    async fn recover(&self, id: CartRecordId) -> Result<bool, RepositoryError>;

    /// Move every pending record for `email` to recovered. Returns the count.
    async fn recover_pending_by_email(&self, email: &Email) -> Result<u64, RepositoryError>;

    /// Pending, undelivered records last touched before `threshold`.
    async fn find_abandoned(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<CartRecord>, RepositoryError>;

    /// Move pending records last touched before `threshold` to expired.
    async fn expire_pending_before(&self, threshold: DateTime<Utc>)
    -> Result<u64, RepositoryError>;

    /// Records newest first.
    async fn list_recent(&self, filter: CartFilter) -> Result<Vec<CartRecord>, RepositoryError>;

    /// Remove a record. Returns whether a row was deleted.
    async fn delete(&self, id: CartRecordId) -> Result<bool, RepositoryError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Shared handle to a cart store.
pub type DynCartStore = Arc<dyn CartStore>;

/// Shared handle to a settings store.
pub type DynSettingsStore = Arc<dyn SettingsStore>;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
