//! Operator actions on individual cart records.

use tracing::{info, instrument};

use abandoned_cart_core::{CartRecord, CartRecordId};

use crate::db::{CartFilter, DynCartStore};
use crate::error::AppError;

use super::dispatcher::{Delivery, WebhookDispatcher};
use super::settings::SettingsService;

/// Admin operations: list, inspect, resend, recover and delete records.
#[derive(Clone)]
pub struct AdminService {
    carts: DynCartStore,
    settings: SettingsService,
    dispatcher: WebhookDispatcher,
}

impl AdminService {
    #[must_use]
    pub fn new(
        carts: DynCartStore,
        settings: SettingsService,
        dispatcher: WebhookDispatcher,
    ) -> Self {
        Self {
            carts,
            settings,
            dispatcher,
        }
    }

    /// Records newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self, filter: CartFilter) -> Result<Vec<CartRecord>, AppError> {
        Ok(self.carts.list_recent(filter).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id.
    pub async fn get(&self, id: CartRecordId) -> Result<CartRecord, AppError> {
        self.carts
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("cart {id}")))
    }

    /// Post the record to the webhook now, whatever its status.
    ///
    /// The record is flagged as sent only when a response arrives.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id, `AppError::BadRequest`
    /// when no webhook URL is configured, and `AppError::Webhook` when the
    /// request gets no response.
    #[instrument(skip(self, id), fields(cart_id = %id))]
    pub async fn resend(&self, id: CartRecordId) -> Result<CartRecord, AppError> {
        let record = self.get(id).await?;
        let settings = self.settings.load().await?;

        match self.dispatcher.dispatch(&settings, &record).await? {
            Delivery::Skipped => Err(AppError::BadRequest(
                "webhook URL is not configured".to_string(),
            )),
            Delivery::Delivered(status) => {
                self.carts.mark_sent(id).await?;
                info!(status = status.as_u16(), "Cart resent by operator");
                self.get(id).await
            }
        }
    }

    /// Mark a pending record recovered. Terminal records are returned as is.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id.
    #[instrument(skip(self, id), fields(cart_id = %id))]
    pub async fn recover(&self, id: CartRecordId) -> Result<CartRecord, AppError> {
        if self.carts.recover(id).await? {
            info!("Cart marked recovered by operator");
        }
        self.get(id).await
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id.
    #[instrument(skip(self, id), fields(cart_id = %id))]
    pub async fn delete(&self, id: CartRecordId) -> Result<(), AppError> {
        if self.carts.delete(id).await? {
            info!("Cart deleted by operator");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("cart {id}")))
        }
    }
}
