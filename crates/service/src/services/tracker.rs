//! Cart tracker.
//!
//! Turns cart snapshots from the storefront into at most one pending record
//! per email. Repeated changes refresh that record, so abandonment age is
//! always measured from the last cart change.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use abandoned_cart_core::{CartRecordId, CartSnapshot};

use crate::db::{DynCartStore, NewCartRecord, RepositoryError};

/// Why a snapshot produced no write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No email is known for the session.
    NoEmail,
    /// The cart holds no items.
    EmptyCart,
}

/// What tracking a snapshot did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    Skipped(SkipReason),
    Created(CartRecordId),
    Refreshed(CartRecordId),
}

impl TrackOutcome {
    /// The record written, if any.
    #[must_use]
    pub const fn record_id(&self) -> Option<CartRecordId> {
        match self {
            Self::Skipped(_) => None,
            Self::Created(id) | Self::Refreshed(id) => Some(*id),
        }
    }
}

/// Records cart activity for shoppers with a known email.
#[derive(Clone)]
pub struct CartTracker {
    carts: DynCartStore,
}

impl CartTracker {
    #[must_use]
    pub fn new(carts: DynCartStore) -> Self {
        Self { carts }
    }

    /// Track one cart change.
    ///
    /// Performs exactly one store write for a qualifying snapshot and none
    /// otherwise. Never contacts the webhook.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store write fails.
    #[instrument(skip(self, snapshot), fields(items = snapshot.items.len()))]
    pub async fn track(
        &self,
        snapshot: CartSnapshot,
        now: DateTime<Utc>,
    ) -> Result<TrackOutcome, RepositoryError> {
        if snapshot.is_empty() {
            return Ok(TrackOutcome::Skipped(SkipReason::EmptyCart));
        }
        let Some(email) = snapshot.email else {
            return Ok(TrackOutcome::Skipped(SkipReason::NoEmail));
        };

        let outcome = self
            .carts
            .upsert_pending(
                NewCartRecord {
                    email,
                    phone: snapshot.phone,
                    name: snapshot.name,
                    cart_items: snapshot.items,
                },
                now,
            )
            .await?;

        if outcome.created {
            debug!(cart_id = %outcome.id, "Pending cart created");
            Ok(TrackOutcome::Created(outcome.id))
        } else {
            debug!(cart_id = %outcome.id, "Pending cart refreshed");
            Ok(TrackOutcome::Refreshed(outcome.id))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use abandoned_cart_core::{CartItem, CartStatus, Email};
    use chrono::TimeDelta;

    use super::*;
    use crate::db::{CartStore, MemoryStore};

    fn snapshot(email: Option<&str>, items: Vec<CartItem>) -> CartSnapshot {
        CartSnapshot {
            email: email.map(|e| Email::parse(e).unwrap()),
            phone: Some("555-0100".to_string()),
            name: Some("Ada".to_string()),
            items,
        }
    }

    #[tokio::test]
    async fn test_skips_without_email_or_items() {
        let store = Arc::new(MemoryStore::new());
        let tracker = CartTracker::new(store.clone());
        let now = Utc::now();

        let no_email = tracker
            .track(snapshot(None, vec![CartItem::new(1, 1)]), now)
            .await
            .unwrap();
        let empty = tracker
            .track(snapshot(Some("a@b.com"), vec![]), now)
            .await
            .unwrap();

        assert_eq!(no_email, TrackOutcome::Skipped(SkipReason::NoEmail));
        assert_eq!(empty, TrackOutcome::Skipped(SkipReason::EmptyCart));
        assert!(store.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_keeps_id_and_contact_fields() {
        let store = Arc::new(MemoryStore::new());
        let tracker = CartTracker::new(store.clone());
        let t0 = Utc::now();
        let t1 = t0 + TimeDelta::minutes(3);

        let created = tracker
            .track(snapshot(Some("a@b.com"), vec![CartItem::new(1, 2)]), t0)
            .await
            .unwrap();

        let mut later = snapshot(Some("A@B.com"), vec![CartItem::new(7, 1)]);
        later.phone = None;
        later.name = Some("Someone Else".to_string());
        let refreshed = tracker.track(later, t1).await.unwrap();

        let id = created.record_id().unwrap();
        assert_eq!(created, TrackOutcome::Created(id));
        assert_eq!(refreshed, TrackOutcome::Refreshed(id));

        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.cart_items, vec![CartItem::new(7, 1)]);
        assert_eq!(record.created_at, t1);
        assert_eq!(record.phone.as_deref(), Some("555-0100"));
        assert_eq!(record.name.as_deref(), Some("Ada"));
        assert_eq!(record.status, CartStatus::Pending);
        assert!(!record.sent_to_make);
    }

    #[tokio::test]
    async fn test_concurrent_tracking_yields_one_pending_row() {
        let store = Arc::new(MemoryStore::new());
        let tracker = CartTracker::new(store.clone());
        let now = Utc::now();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    tracker
                        .track(snapshot(Some("race@b.com"), vec![CartItem::new(i, 1)]), now)
                        .await
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let pending: Vec<_> = store
            .all()
            .await
            .into_iter()
            .filter(|c| c.is_pending())
            .collect();
        assert_eq!(pending.len(), 1);
    }
}
