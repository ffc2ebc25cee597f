//! Tracker settings: environment defaults overlaid with stored values.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{instrument, warn};

use crate::config::{InvalidSetting, TrackerSettings};
use crate::db::settings::{EXPIRY_DAYS, LOGGING_ENABLED, TIMEOUT_MINUTES, WEBHOOK_URL};
use crate::db::{DynSettingsStore, SettingsError};
use crate::error::AppError;

/// Partial change to the tracker settings. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    /// Blank clears the URL and disables dispatch.
    pub webhook_url: Option<String>,
    pub timeout_minutes: Option<i64>,
    pub logging_enabled: Option<bool>,
    pub expiry_days: Option<i64>,
}

impl SettingsUpdate {
    /// Build an update from a single `key=value` pair given as text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSetting` for an unknown key or a value of the wrong type.
    pub fn from_pair(key: &str, raw: &str) -> Result<Self, InvalidSetting> {
        let raw = raw.trim();
        let mut update = Self::default();
        match key {
            WEBHOOK_URL => update.webhook_url = Some(raw.to_string()),
            TIMEOUT_MINUTES => {
                update.timeout_minutes = Some(parse_int(TIMEOUT_MINUTES, raw)?);
            }
            EXPIRY_DAYS => update.expiry_days = Some(parse_int(EXPIRY_DAYS, raw)?),
            LOGGING_ENABLED => {
                update.logging_enabled = Some(parse_bool(raw).ok_or_else(|| InvalidSetting {
                    key: LOGGING_ENABLED,
                    reason: format!("expected a boolean, got '{raw}'"),
                })?);
            }
            _ => {
                return Err(InvalidSetting {
                    key: "key",
                    reason: format!("unknown setting '{key}'"),
                });
            }
        }
        Ok(update)
    }
}

fn parse_int(key: &'static str, raw: &str) -> Result<i64, InvalidSetting> {
    raw.parse().map_err(|_| InvalidSetting {
        key,
        reason: format!("expected an integer, got '{raw}'"),
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Reads and writes the four tracker options.
#[derive(Clone)]
pub struct SettingsService {
    store: DynSettingsStore,
    defaults: TrackerSettings,
}

impl SettingsService {
    #[must_use]
    pub const fn new(store: DynSettingsStore, defaults: TrackerSettings) -> Self {
        Self { store, defaults }
    }

    /// Current settings: stored values over the environment defaults.
    ///
    /// A stored value of the wrong type is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the store cannot be read.
    pub async fn load(&self) -> Result<TrackerSettings, SettingsError> {
        let stored = self.store.all_settings().await?;
        Ok(overlay(self.defaults.clone(), &stored))
    }

    /// Apply an update, validate the result and persist the changed keys.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the merged settings are invalid, or
    /// `AppError::Settings` if persisting fails. Nothing is written on error.
    #[instrument(skip(self))]
    pub async fn update(&self, update: SettingsUpdate) -> Result<TrackerSettings, AppError> {
        let mut settings = self.load().await?;
        let mut writes: Vec<(&str, JsonValue)> = Vec::new();

        if let Some(raw) = update.webhook_url {
            settings.webhook_url = TrackerSettings::parse_webhook_url(&raw)?;
            let stored = settings
                .webhook_url
                .as_ref()
                .map_or_else(String::new, ToString::to_string);
            writes.push((WEBHOOK_URL, JsonValue::String(stored)));
        }
        if let Some(minutes) = update.timeout_minutes {
            settings.timeout_minutes = minutes;
            writes.push((TIMEOUT_MINUTES, JsonValue::from(minutes)));
        }
        if let Some(enabled) = update.logging_enabled {
            settings.logging_enabled = enabled;
            writes.push((LOGGING_ENABLED, JsonValue::Bool(enabled)));
        }
        if let Some(days) = update.expiry_days {
            settings.expiry_days = days;
            writes.push((EXPIRY_DAYS, JsonValue::from(days)));
        }

        settings.validate()?;

        for (key, value) in &writes {
            self.store.set_setting(key, value).await?;
        }

        Ok(settings)
    }
}

/// Overlay stored values onto `settings`.
fn overlay(mut settings: TrackerSettings, stored: &HashMap<String, JsonValue>) -> TrackerSettings {
    if let Some(value) = stored.get(WEBHOOK_URL) {
        match value
            .as_str()
            .map(TrackerSettings::parse_webhook_url)
        {
            Some(Ok(url)) => settings.webhook_url = url,
            Some(Err(e)) => warn!(error = %e, "Ignoring stored webhook URL"),
            None => warn!(key = WEBHOOK_URL, "Ignoring non-string setting"),
        }
    }
    if let Some(minutes) = stored
        .get(TIMEOUT_MINUTES)
        .and_then(|v| stored_int(TIMEOUT_MINUTES, v))
    {
        if minutes >= 1 {
            settings.timeout_minutes = minutes;
        } else {
            warn!(key = TIMEOUT_MINUTES, minutes, "Ignoring timeout below one minute");
        }
    }
    if let Some(days) = stored.get(EXPIRY_DAYS).and_then(|v| stored_int(EXPIRY_DAYS, v)) {
        settings.expiry_days = days;
    }
    if let Some(value) = stored.get(LOGGING_ENABLED) {
        let enabled = match value {
            JsonValue::Bool(b) => Some(*b),
            JsonValue::Number(n) => n.as_i64().map(|n| n != 0),
            JsonValue::String(s) => parse_bool(s.trim()),
            _ => None,
        };
        match enabled {
            Some(enabled) => settings.logging_enabled = enabled,
            None => warn!(key = LOGGING_ENABLED, "Ignoring non-boolean setting"),
        }
    }
    settings
}

/// Integers may be stored as JSON numbers or numeric strings.
fn stored_int(key: &str, value: &JsonValue) -> Option<i64> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    if parsed.is_none() {
        warn!(key, "Ignoring non-integer setting");
    }
    parsed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::db::{MemoryStore, SettingsStore};

    fn service(store: &Arc<MemoryStore>) -> SettingsService {
        SettingsService::new(store.clone(), TrackerSettings::default())
    }

    #[tokio::test]
    async fn test_defaults_when_nothing_stored() {
        let store = Arc::new(MemoryStore::new());
        assert_eq!(
            service(&store).load().await.unwrap(),
            TrackerSettings::default()
        );
    }

    #[tokio::test]
    async fn test_stored_values_override_defaults() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_setting(WEBHOOK_URL, &json!("https://hook.make.com/x"))
            .await
            .unwrap();
        store.set_setting(TIMEOUT_MINUTES, &json!("15")).await.unwrap();
        store.set_setting(LOGGING_ENABLED, &json!("1")).await.unwrap();
        store.set_setting(EXPIRY_DAYS, &json!(0)).await.unwrap();

        let settings = service(&store).load().await.unwrap();
        assert_eq!(
            settings.webhook_url.unwrap().as_str(),
            "https://hook.make.com/x"
        );
        assert_eq!(settings.timeout_minutes, 15);
        assert!(settings.logging_enabled);
        assert_eq!(settings.expiry_days, 0);
    }

    #[tokio::test]
    async fn test_invalid_stored_values_fall_back() {
        let store = Arc::new(MemoryStore::new());
        store.set_setting(WEBHOOK_URL, &json!("ftp://nope")).await.unwrap();
        store.set_setting(TIMEOUT_MINUTES, &json!(0)).await.unwrap();
        store.set_setting(EXPIRY_DAYS, &json!([1])).await.unwrap();

        assert_eq!(
            service(&store).load().await.unwrap(),
            TrackerSettings::default()
        );
    }

    #[tokio::test]
    async fn test_update_persists_and_blank_url_clears() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);

        let settings = service
            .update(SettingsUpdate {
                webhook_url: Some("https://hook.make.com/y".to_string()),
                timeout_minutes: Some(30),
                ..SettingsUpdate::default()
            })
            .await
            .unwrap();
        assert_eq!(settings.timeout_minutes, 30);
        assert_eq!(service.load().await.unwrap(), settings);

        let cleared = service
            .update(SettingsUpdate::from_pair(WEBHOOK_URL, "").unwrap())
            .await
            .unwrap();
        assert!(cleared.webhook_url.is_none());
        assert_eq!(
            store.all_settings().await.unwrap().get(WEBHOOK_URL),
            Some(&json!(""))
        );
    }

    #[tokio::test]
    async fn test_invalid_update_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let result = service(&store)
            .update(SettingsUpdate {
                expiry_days: Some(7),
                timeout_minutes: Some(0),
                ..SettingsUpdate::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(store.all_settings().await.unwrap().is_empty());
    }

    #[test]
    fn test_from_pair() {
        assert_eq!(
            SettingsUpdate::from_pair(EXPIRY_DAYS, " 14 ").unwrap().expiry_days,
            Some(14)
        );
        assert_eq!(
            SettingsUpdate::from_pair(LOGGING_ENABLED, "on")
                .unwrap()
                .logging_enabled,
            Some(true)
        );
        assert!(SettingsUpdate::from_pair(TIMEOUT_MINUTES, "soon").is_err());
        assert!(SettingsUpdate::from_pair("colour", "blue").is_err());
    }
}
