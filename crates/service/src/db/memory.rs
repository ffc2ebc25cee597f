//! In-process cart and settings store.
//!
//! Mirrors the `PostgreSQL` semantics, including the one-pending-row-per-email
//! rule: every operation runs under a single lock, so the upsert cannot race.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use abandoned_cart_core::{CartRecord, CartRecordId, CartStatus, Email};

use super::settings::{SettingsError, SettingsStore};
use super::{CartFilter, CartStore, NewCartRecord, RepositoryError, UpsertOutcome};

#[derive(Default)]
struct Inner {
    last_id: i64,
    carts: BTreeMap<CartRecordId, CartRecord>,
    settings: HashMap<String, JsonValue>,
}

/// Cart and settings store held in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed record, bypassing the tracker.
    ///
    /// Lets tests and fixtures place records at arbitrary ages and states.
    /// The record's id is replaced with the next free id.
    pub async fn insert_record(&self, mut record: CartRecord) -> CartRecordId {
        let mut inner = self.inner.lock().await;
        inner.last_id += 1;
        record.id = CartRecordId::new(inner.last_id);
        let id = record.id;
        inner.carts.insert(id, record);
        id
    }

    /// Snapshot of every stored record, ordered by id.
    pub async fn all(&self) -> Vec<CartRecord> {
        self.inner.lock().await.carts.values().cloned().collect()
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_pending_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<CartRecord>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .carts
            .values()
            .find(|c| c.is_pending() && &c.email == email)
            .cloned())
    }

    async fn upsert_pending(
        &self,
        cart: NewCartRecord,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, RepositoryError> {
        let mut inner = self.inner.lock().await;

        if let Some(existing) = inner
            .carts
            .values_mut()
            .find(|c| c.is_pending() && c.email == cart.email)
        {
            existing.cart_items = cart.cart_items;
            existing.created_at = now;
            return Ok(UpsertOutcome {
                id: existing.id,
                created: false,
            });
        }

        inner.last_id += 1;
        let id = CartRecordId::new(inner.last_id);
        inner.carts.insert(
            id,
            CartRecord {
                id,
                email: cart.email,
                phone: cart.phone,
                name: cart.name,
                cart_items: cart.cart_items,
                status: CartStatus::Pending,
                created_at: now,
                sent_to_make: false,
            },
        );

        Ok(UpsertOutcome { id, created: true })
    }

    async fn get(&self, id: CartRecordId) -> Result<Option<CartRecord>, RepositoryError> {
        Ok(self.inner.lock().await.carts.get(&id).cloned())
    }

    async fn mark_sent(&self, id: CartRecordId) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .carts
            .get_mut(&id)
            .map(|c| c.sent_to_make = true)
            .is_some())
    }

    async fn recover(&self, id: CartRecordId) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().await;
        match inner.carts.get_mut(&id) {
            Some(cart) if cart.status.can_transition_to(CartStatus::Recovered) => {
                cart.status = CartStatus::Recovered;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn recover_pending_by_email(&self, email: &Email) -> Result<u64, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let mut count = 0;
        for cart in inner
            .carts
            .values_mut()
            .filter(|c| c.status.can_transition_to(CartStatus::Recovered) && &c.email == email)
        {
            cart.status = CartStatus::Recovered;
            count += 1;
        }
        Ok(count)
    }

    async fn find_abandoned(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<CartRecord>, RepositoryError> {
        let inner = self.inner.lock().await;
        let mut carts: Vec<CartRecord> = inner
            .carts
            .values()
            .filter(|c| c.is_pending() && !c.sent_to_make && c.created_at < threshold)
            .cloned()
            .collect();
        carts.sort_by_key(|c| (c.created_at, c.id));
        Ok(carts)
    }

    async fn expire_pending_before(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let mut count = 0;
        for cart in inner
            .carts
            .values_mut()
            .filter(|c| {
                c.status.can_transition_to(CartStatus::Expired) && c.created_at < threshold
            })
        {
            cart.status = CartStatus::Expired;
            count += 1;
        }
        Ok(count)
    }

    async fn list_recent(&self, filter: CartFilter) -> Result<Vec<CartRecord>, RepositoryError> {
        let inner = self.inner.lock().await;
        let mut carts: Vec<CartRecord> = inner
            .carts
            .values()
            .filter(|c| filter.status.is_none_or(|s| c.status == s))
            .cloned()
            .collect();
        carts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        carts.truncate(usize::try_from(filter.limit.max(0)).unwrap_or(usize::MAX));
        Ok(carts)
    }

    async fn delete(&self, id: CartRecordId) -> Result<bool, RepositoryError> {
        Ok(self.inner.lock().await.carts.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn all_settings(&self) -> Result<HashMap<String, JsonValue>, SettingsError> {
        Ok(self.inner.lock().await.settings.clone())
    }

    async fn set_setting(&self, key: &str, value: &JsonValue) -> Result<(), SettingsError> {
        self.inner
            .lock()
            .await
            .settings
            .insert(key.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use abandoned_cart_core::CartItem;
    use chrono::TimeDelta;

    use super::*;

    fn new_cart(email: &str, product_id: i64) -> NewCartRecord {
        NewCartRecord {
            email: Email::parse(email).unwrap(),
            phone: None,
            name: None,
            cart_items: vec![CartItem::new(product_id, 1)],
        }
    }

    #[tokio::test]
    async fn test_upsert_refreshes_pending_row() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        let t1 = t0 + TimeDelta::minutes(5);

        let first = store.upsert_pending(new_cart("a@b.com", 1), t0).await.unwrap();
        let second = store.upsert_pending(new_cart("a@b.com", 2), t1).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);

        let record = store.get(first.id).await.unwrap().unwrap();
        assert_eq!(record.created_at, t1);
        assert_eq!(record.cart_items, vec![CartItem::new(2, 1)]);
    }

    #[tokio::test]
    async fn test_upsert_after_recovery_starts_new_row() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let first = store.upsert_pending(new_cart("a@b.com", 1), now).await.unwrap();
        assert!(store.recover(first.id).await.unwrap());
        let second = store.upsert_pending(new_cart("a@b.com", 1), now).await.unwrap();

        assert!(second.created);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_recover_only_moves_pending() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let id = store
            .upsert_pending(new_cart("a@b.com", 1), now)
            .await
            .unwrap()
            .id;

        assert_eq!(store.expire_pending_before(now + TimeDelta::seconds(1)).await.unwrap(), 1);
        assert!(!store.recover(id).await.unwrap());
        assert_eq!(
            store.get(id).await.unwrap().unwrap().status,
            CartStatus::Expired
        );
    }

    #[tokio::test]
    async fn test_list_recent_newest_first_with_limit() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (i, email) in ["a@x.com", "b@x.com", "c@x.com"].iter().enumerate() {
            let at = now + TimeDelta::minutes(i64::try_from(i).unwrap());
            store.upsert_pending(new_cart(email, 1), at).await.unwrap();
        }

        let listed = store
            .list_recent(CartFilter {
                status: Some(CartStatus::Pending),
                limit: 2,
            })
            .await
            .unwrap();

        let emails: Vec<&str> = listed.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(emails, vec!["c@x.com", "b@x.com"]);
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let store = MemoryStore::new();
        store
            .set_setting("expiry_days", &serde_json::json!(7))
            .await
            .unwrap();

        let stored = store.all_settings().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.get("expiry_days"), Some(&serde_json::json!(7)));
    }
}
