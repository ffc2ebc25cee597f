//! Webhook dispatcher.
//!
//! Posts one cart record to the automation webhook as JSON. Delivery succeeds
//! when the endpoint answers at all: the status code is logged but never
//! turns a response into a failure. Only transport errors (connect failure,
//! timeout, TLS) fail a delivery, and the caller retries on the next sweep.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use abandoned_cart_core::{CartItem, CartRecord, CartRecordId};

use crate::config::TrackerSettings;

/// Timestamp layout the automation scenario parses.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors from delivering a cart to the webhook.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No response was received (connect failure, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The payload could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result of a dispatch that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// No webhook URL is configured.
    Skipped,
    /// The endpoint responded with this status.
    Delivered(StatusCode),
}

/// JSON body sent to the automation webhook.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub email: &'a str,
    pub name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub cart: &'a [CartItem],
    /// Always empty; totals are not tracked.
    pub cart_total: &'static str,
    pub abandonment_timestamp: String,
    pub cart_id: CartRecordId,
}

impl<'a> WebhookPayload<'a> {
    #[must_use]
    pub fn from_record(record: &'a CartRecord) -> Self {
        Self {
            email: record.email.as_str(),
            name: record.name.as_deref(),
            phone: record.phone.as_deref(),
            cart: &record.cart_items,
            cart_total: "",
            abandonment_timestamp: record.created_at.format(TIMESTAMP_FORMAT).to_string(),
            cart_id: record.id,
        }
    }
}

/// HTTP client for the automation webhook.
#[derive(Clone)]
pub struct WebhookDispatcher {
    client: Client,
}

impl WebhookDispatcher {
    /// Create a dispatcher whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Transport` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("abandoned-cart/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Deliver one record to the configured webhook.
    ///
    /// Does not touch the store; the caller flags the record on success.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` if encoding fails or no response arrives.
    #[instrument(skip(self, settings, record), fields(cart_id = %record.id))]
    pub async fn dispatch(
        &self,
        settings: &TrackerSettings,
        record: &CartRecord,
    ) -> Result<Delivery, DispatchError> {
        let Some(url) = settings.webhook_url.as_ref() else {
            return Ok(Delivery::Skipped);
        };

        let body = serde_json::to_vec(&WebhookPayload::from_record(record))?;
        if settings.logging_enabled {
            info!(payload = %String::from_utf8_lossy(&body), "Sending abandoned cart");
        } else {
            debug!(payload = %String::from_utf8_lossy(&body), "Sending abandoned cart");
        }

        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            if settings.logging_enabled {
                info!(status = status.as_u16(), "Abandoned cart delivered");
            }
        } else {
            warn!(
                status = status.as_u16(),
                "Webhook answered with a non-success status; counting as delivered"
            );
        }

        Ok(Delivery::Delivered(status))
    }
}
