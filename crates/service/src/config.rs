//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TRACKER_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `TRACKER_HOST` - Bind address (default: 127.0.0.1)
//! - `TRACKER_PORT` - Listen port (default: 3002)
//! - `TRACKER_ADMIN_TOKEN` - Bearer token for `/api/*` (min 32 chars, high entropy)
//! - `SWEEP_INTERVAL_SECS` - Seconds between abandonment sweeps (default: 60)
//! - `SWEEP_DISPATCH_CONCURRENCY` - Webhook deliveries in flight per sweep (default: 4)
//! - `WEBHOOK_TIMEOUT_SECS` - Webhook request timeout (default: 10)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Tracker defaults (overridden by the `settings` table)
//! - `MAKE_WEBHOOK_URL` - Automation webhook endpoint (empty disables dispatch)
//! - `ABANDON_TIMEOUT_MINUTES` - Minutes of inactivity before a cart counts as abandoned (default: 60)
//! - `TRACKER_LOGGING_ENABLED` - Log every dispatched payload at info level (default: false)
//! - `EXPIRY_DAYS` - Days before a pending record expires, `<= 0` disables (default: 30)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use url::Url;

const MIN_ADMIN_TOKEN_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

pub const DEFAULT_TIMEOUT_MINUTES: i64 = 60;
pub const DEFAULT_EXPIRY_DAYS: i64 = 30;
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_DISPATCH_CONCURRENCY: usize = 4;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// A tracker option that failed validation.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {key}: {reason}")]
pub struct InvalidSetting {
    pub key: &'static str,
    pub reason: String,
}

/// The four tracker options: where to send abandoned carts and when.
///
/// Passed explicitly to the dispatcher and sweeper; there is no global lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerSettings {
    /// Automation webhook endpoint. `None` disables all dispatch.
    pub webhook_url: Option<Url>,
    /// Inactivity, in minutes, before a pending cart counts as abandoned.
    pub timeout_minutes: i64,
    /// Log each dispatched payload at info level.
    pub logging_enabled: bool,
    /// Age, in days, after which a pending record expires. `<= 0` disables.
    pub expiry_days: i64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
            logging_enabled: false,
            expiry_days: DEFAULT_EXPIRY_DAYS,
        }
    }
}

impl TrackerSettings {
    /// Parse a webhook URL option. Blank input means "not configured".
    ///
    /// # Errors
    ///
    /// Returns `InvalidSetting` if the value is not an absolute http(s) URL.
    pub fn parse_webhook_url(raw: &str) -> Result<Option<Url>, InvalidSetting> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let url = Url::parse(raw).map_err(|e| InvalidSetting {
            key: "webhook_url",
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(InvalidSetting {
                key: "webhook_url",
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        Ok(Some(url))
    }

    /// Check the numeric options.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSetting` if `timeout_minutes` is below 1.
    pub fn validate(&self) -> Result<(), InvalidSetting> {
        if self.timeout_minutes < 1 {
            return Err(InvalidSetting {
                key: "timeout_minutes",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Carts last touched before this instant count as abandoned.
    ///
    /// `None` when the timeout reaches past the representable time range.
    #[must_use]
    pub fn abandonment_threshold(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        TimeDelta::try_minutes(self.timeout_minutes).and_then(|d| now.checked_sub_signed(d))
    }

    /// Pending carts last touched before this instant expire.
    ///
    /// `None` when expiry is disabled (`expiry_days <= 0`).
    #[must_use]
    pub fn expiry_threshold(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.expiry_days <= 0 {
            return None;
        }
        TimeDelta::try_days(self.expiry_days).and_then(|d| now.checked_sub_signed(d))
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let webhook_url = lookup("MAKE_WEBHOOK_URL")
            .map(|raw| Self::parse_webhook_url(&raw))
            .transpose()
            .map_err(|e| ConfigError::InvalidEnvVar("MAKE_WEBHOOK_URL".to_string(), e.reason))?
            .flatten();

        let settings = Self {
            webhook_url,
            timeout_minutes: parse_or_default(
                lookup,
                "ABANDON_TIMEOUT_MINUTES",
                DEFAULT_TIMEOUT_MINUTES,
            )?,
            logging_enabled: lookup("TRACKER_LOGGING_ENABLED").is_some_and(|v| parse_flag(&v)),
            expiry_days: parse_or_default(lookup, "EXPIRY_DAYS", DEFAULT_EXPIRY_DAYS)?,
        };

        settings.validate().map_err(|e| {
            ConfigError::InvalidEnvVar("ABANDON_TIMEOUT_MINUTES".to_string(), e.reason)
        })?;

        Ok(settings)
    }
}

/// Tracker service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token required by the admin API (open when unset)
    pub admin_token: Option<SecretString>,
    /// Period of the abandonment sweep
    pub sweep_interval: Duration,
    /// Webhook deliveries in flight during one sweep
    pub dispatch_concurrency: usize,
    /// Webhook request timeout
    pub webhook_timeout: Duration,
    /// Tracker options used when the settings table has no value
    pub tracker_defaults: TrackerSettings,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the admin token fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`ServiceConfig::from_env`].
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("TRACKER_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("TRACKER_DATABASE_URL".to_string()))?;

        let host = lookup("TRACKER_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_string())
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("TRACKER_HOST".to_string(), e.to_string()))?;
        let port = parse_or_default(lookup, "TRACKER_PORT", 3002_u16)?;

        let admin_token = lookup("TRACKER_ADMIN_TOKEN")
            .map(|token| {
                validate_admin_token(&token, "TRACKER_ADMIN_TOKEN")?;
                Ok::<_, ConfigError>(SecretString::from(token))
            })
            .transpose()?;

        let sweep_interval = Duration::from_secs(parse_or_default(
            lookup,
            "SWEEP_INTERVAL_SECS",
            DEFAULT_SWEEP_INTERVAL.as_secs(),
        )?);
        if sweep_interval.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "SWEEP_INTERVAL_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let dispatch_concurrency = parse_or_default(
            lookup,
            "SWEEP_DISPATCH_CONCURRENCY",
            DEFAULT_DISPATCH_CONCURRENCY,
        )?
        .max(1);

        let webhook_timeout = Duration::from_secs(parse_or_default(
            lookup,
            "WEBHOOK_TIMEOUT_SECS",
            DEFAULT_WEBHOOK_TIMEOUT.as_secs(),
        )?);

        Ok(Self {
            database_url,
            host,
            port,
            admin_token,
            sweep_interval,
            dispatch_concurrency,
            webhook_timeout,
            tracker_defaults: TrackerSettings::from_lookup(lookup)?,
            json_logs: lookup("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
            sentry_dsn: lookup("SENTRY_DSN"),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: lookup("SENTRY_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            sentry_traces_sample_rate: lookup("SENTRY_TRACES_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.1),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or_default<T>(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Interpret a checkbox-style flag ("1", "true", "yes", "on").
fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that the admin token is long, not a placeholder, and random-looking.
fn validate_admin_token(token: &str, var_name: &str) -> Result<(), ConfigError> {
    if token.len() < MIN_ADMIN_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_ADMIN_TOKEN_LENGTH} characters (got {})",
                token.len()
            ),
        ));
    }

    let lower = token.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(token);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated token."
            ),
        ));
    }

    Ok(())
}

/// Whether `candidate` matches the configured admin token.
#[must_use]
pub fn admin_token_matches(expected: &SecretString, candidate: &str) -> bool {
    use sha2::{Digest, Sha256};

    // Fixed-size digests; the fold visits every byte.
    let expected = Sha256::digest(expected.expose_secret().as_bytes());
    let candidate = Sha256::digest(candidate.as_bytes());
    expected
        .iter()
        .zip(candidate.iter())
        .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
