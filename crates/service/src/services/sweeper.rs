//! Abandonment sweeper.
//!
//! One sweep is two steps, always in this order:
//!
//! 1. **Detection**: pending, unsent carts idle for longer than
//!    `timeout_minutes` are posted to the webhook and flagged on delivery.
//!    Skipped entirely when no webhook URL is configured.
//! 2. **Expiry**: pending carts older than `expiry_days` become expired,
//!    delivered or not. Skipped when `expiry_days <= 0`.
//!
//! Both steps are predicate updates, so repeating a sweep converges: the
//! second pass finds nothing to do. A failed delivery leaves the record
//! untouched and the next sweep retries it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use abandoned_cart_core::CartRecord;

use crate::config::TrackerSettings;
use crate::db::DynCartStore;
use crate::error::AppError;

use super::dispatcher::{Delivery, WebhookDispatcher};
use super::settings::SettingsService;

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Abandoned carts found by detection.
    pub candidates: usize,
    /// Carts delivered and flagged.
    pub delivered: usize,
    /// Carts whose delivery failed; retried next sweep.
    pub failed: usize,
    /// Pending carts moved to expired.
    pub expired: u64,
}

impl SweepReport {
    /// Whether the sweep changed nothing.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.candidates == 0 && self.expired == 0
    }
}

enum Attempt {
    Delivered,
    Failed,
    Skipped,
}

/// Runs detection and expiry over the record store.
#[derive(Clone)]
pub struct Sweeper {
    carts: DynCartStore,
    settings: SettingsService,
    dispatcher: WebhookDispatcher,
    concurrency: usize,
}

impl Sweeper {
    #[must_use]
    pub fn new(
        carts: DynCartStore,
        settings: SettingsService,
        dispatcher: WebhookDispatcher,
        concurrency: usize,
    ) -> Self {
        Self {
            carts,
            settings,
            dispatcher,
            concurrency: concurrency.max(1),
        }
    }

    /// Run one sweep with the current stored settings.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if settings cannot be loaded or a store query fails.
    /// Individual delivery failures are counted, not returned.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, AppError> {
        let settings = self.settings.load().await?;
        self.sweep_with(now, &settings).await
    }

    /// Run one sweep with explicit settings.
    ///
    /// # Errors
    ///
    /// See [`Sweeper::sweep`].
    #[instrument(skip(self, settings))]
    pub async fn sweep_with(
        &self,
        now: DateTime<Utc>,
        settings: &TrackerSettings,
    ) -> Result<SweepReport, AppError> {
        let mut report = SweepReport::default();

        if settings.webhook_url.is_some() {
            if let Some(threshold) = settings.abandonment_threshold(now) {
                let candidates = self.carts.find_abandoned(threshold).await?;
                report.candidates = candidates.len();

                let attempts: Vec<Attempt> = stream::iter(candidates)
                    .map(|cart| async move { self.deliver(settings, &cart).await })
                    .buffer_unordered(self.concurrency)
                    .collect()
                    .await;

                for attempt in attempts {
                    match attempt {
                        Attempt::Delivered => report.delivered += 1,
                        Attempt::Failed => report.failed += 1,
                        Attempt::Skipped => {}
                    }
                }
            }
        } else {
            debug!("No webhook URL configured; skipping detection");
        }

        // Runs with or without a webhook URL; detection above is the only
        // step gated on it.
        if let Some(threshold) = settings.expiry_threshold(now) {
            report.expired = self.carts.expire_pending_before(threshold).await?;
        }

        Ok(report)
    }

    async fn deliver(&self, settings: &TrackerSettings, cart: &CartRecord) -> Attempt {
        match self.dispatcher.dispatch(settings, cart).await {
            Ok(Delivery::Delivered(_)) => match self.carts.mark_sent(cart.id).await {
                Ok(_) => Attempt::Delivered,
                Err(e) => {
                    error!(cart_id = %cart.id, error = %e, "Delivered cart could not be flagged");
                    Attempt::Failed
                }
            },
            Ok(Delivery::Skipped) => Attempt::Skipped,
            Err(e) => {
                warn!(cart_id = %cart.id, error = %e, "Abandoned cart delivery failed; will retry");
                Attempt::Failed
            }
        }
    }
}

/// Run `sweeper` every `period` until the returned task is aborted.
///
/// Missed ticks are skipped, so sweeps never overlap.
pub fn spawn_sweep_loop(sweeper: Sweeper, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            match sweeper.sweep(Utc::now()).await {
                Ok(report) if report.is_idle() => debug!("Sweep found nothing to do"),
                Ok(report) => info!(
                    candidates = report.candidates,
                    delivered = report.delivered,
                    failed = report.failed,
                    expired = report.expired,
                    "Sweep complete"
                ),
                Err(e) => {
                    let event_id = sentry::capture_error(&e);
                    error!(error = %e, sentry_event_id = %event_id, "Sweep failed");
                }
            }
        }
    })
}
