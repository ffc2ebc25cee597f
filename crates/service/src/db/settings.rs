//! Settings storage.
//!
//! Tracker options are stored as JSON values under fixed keys, the way the
//! storefront platform keeps plugin options.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// Webhook endpoint (string, empty disables dispatch).
pub const WEBHOOK_URL: &str = "webhook_url";
/// Abandonment timeout in minutes (integer).
pub const TIMEOUT_MINUTES: &str = "timeout_minutes";
/// Payload logging toggle (boolean).
pub const LOGGING_ENABLED: &str = "logging_enabled";
/// Expiry window in days (integer, `<= 0` disables).
pub const EXPIRY_DAYS: &str = "expiry_days";

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Key-value store for tracker options.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Every stored setting.
    async fn all_settings(&self) -> Result<HashMap<String, JsonValue>, SettingsError>;

    /// Insert or replace a setting.
    async fn set_setting(&self, key: &str, value: &JsonValue) -> Result<(), SettingsError>;
}
