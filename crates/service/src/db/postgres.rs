//! `PostgreSQL` cart and settings store.
//!
//! The one-pending-row-per-email rule is enforced by the partial unique index
//! `abandoned_carts_one_pending_per_email`; [`PgStore::upsert_pending`] relies
//! on it so concurrent cart updates for a new email cannot both insert.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use sqlx::types::Json;

use abandoned_cart_core::{CartItem, CartRecord, CartRecordId, CartStatus, Email};

use super::settings::{SettingsError, SettingsStore};
use super::{CartFilter, CartStore, NewCartRecord, RepositoryError, UpsertOutcome};

/// Cart and settings store backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartRecordId,
    email: Email,
    phone: Option<String>,
    name: Option<String>,
    cart_items: Json<Vec<CartItem>>,
    status: String,
    created_at: DateTime<Utc>,
    sent_to_make: bool,
}

impl TryFrom<CartRow> for CartRecord {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<CartStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("cart {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            email: row.email,
            phone: row.phone,
            name: row.name,
            cart_items: row.cart_items.0,
            status,
            created_at: row.created_at,
            sent_to_make: row.sent_to_make,
        })
    }
}

fn into_records(rows: Vec<CartRow>) -> Result<Vec<CartRecord>, RepositoryError> {
    rows.into_iter().map(CartRecord::try_from).collect()
}

#[async_trait]
impl CartStore for PgStore {
    async fn find_pending_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<CartRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, email, phone, name, cart_items, status, created_at, sent_to_make
            FROM abandoned_carts
            WHERE email = $1 AND status = 'pending'
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CartRecord::try_from).transpose()
    }

    async fn upsert_pending(
        &self,
        cart: NewCartRecord,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, RepositoryError> {
        // xmax is zero only for a freshly inserted tuple.
        let (id, created) = sqlx::query_as::<_, (CartRecordId, bool)>(
            r"
            INSERT INTO abandoned_carts
                (email, phone, name, cart_items, status, created_at, sent_to_make)
            VALUES ($1, $2, $3, $4, 'pending', $5, FALSE)
            ON CONFLICT (email) WHERE status = 'pending'
            DO UPDATE SET cart_items = EXCLUDED.cart_items,
                          created_at = EXCLUDED.created_at
            RETURNING id, (xmax = 0) AS created
            ",
        )
        .bind(&cart.email)
        .bind(cart.phone.as_deref())
        .bind(cart.name.as_deref())
        .bind(Json(&cart.cart_items))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("pending cart already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(UpsertOutcome { id, created })
    }

    async fn get(&self, id: CartRecordId) -> Result<Option<CartRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, email, phone, name, cart_items, status, created_at, sent_to_make
            FROM abandoned_carts
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CartRecord::try_from).transpose()
    }

    async fn mark_sent(&self, id: CartRecordId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE abandoned_carts SET sent_to_make = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn recover(&self, id: CartRecordId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE abandoned_carts
            SET status = 'recovered'
            WHERE id = $1 AND status = 'pending'
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn recover_pending_by_email(&self, email: &Email) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE abandoned_carts
            SET status = 'recovered'
            WHERE email = $1 AND status = 'pending'
            ",
        )
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_abandoned(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<CartRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, email, phone, name, cart_items, status, created_at, sent_to_make
            FROM abandoned_carts
            WHERE status = 'pending' AND sent_to_make = FALSE AND created_at < $1
            ORDER BY created_at, id
            ",
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }

    async fn expire_pending_before(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE abandoned_carts
            SET status = 'expired'
            WHERE status = 'pending' AND created_at < $1
            ",
        )
        .bind(threshold)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn list_recent(&self, filter: CartFilter) -> Result<Vec<CartRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, email, phone, name, cart_items, status, created_at, sent_to_make
            FROM abandoned_carts
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            ",
        )
        .bind(filter.status.map(CartStatus::as_str))
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }

    async fn delete(&self, id: CartRecordId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM abandoned_carts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for PgStore {
    async fn all_settings(&self) -> Result<HashMap<String, JsonValue>, SettingsError> {
        let rows = sqlx::query_as::<_, (String, JsonValue)>("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().collect())
    }

    async fn set_setting(&self, key: &str, value: &JsonValue) -> Result<(), SettingsError> {
        sqlx::query(
            r"
            INSERT INTO settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn new_cart(email: &str, product_id: i64, quantity: u32) -> NewCartRecord {
        NewCartRecord {
            email: Email::parse(email).unwrap(),
            phone: None,
            name: Some("Ada".to_string()),
            cart_items: vec![CartItem::new(product_id, quantity)],
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_767_225_600, 0).unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_upsert_pending_refreshes_in_place(pool: PgPool) {
        let store = PgStore::new(pool);

        let first = store
            .upsert_pending(new_cart("a@b.com", 1, 1), t0())
            .await
            .unwrap();
        assert!(first.created);

        let later = t0() + TimeDelta::minutes(30);
        let second = store
            .upsert_pending(new_cart("a@b.com", 1, 4), later)
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.id, first.id);

        let record = store.get(first.id).await.unwrap().unwrap();
        assert_eq!(record.cart_items, vec![CartItem::new(1, 4)]);
        assert_eq!(record.created_at, later);
        assert_eq!(record.status, CartStatus::Pending);
        assert_eq!(record.name.as_deref(), Some("Ada"));

        assert!(store.recover(first.id).await.unwrap());
        let third = store
            .upsert_pending(new_cart("a@b.com", 2, 1), later)
            .await
            .unwrap();
        assert!(third.created);
        assert_ne!(third.id, first.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_list_recent_filters_by_status(pool: PgPool) {
        let store = PgStore::new(pool);
        let old = store
            .upsert_pending(new_cart("old@b.com", 1, 1), t0())
            .await
            .unwrap();
        store
            .upsert_pending(new_cart("mid@b.com", 1, 1), t0() + TimeDelta::minutes(1))
            .await
            .unwrap();
        store
            .upsert_pending(new_cart("new@b.com", 1, 1), t0() + TimeDelta::minutes(2))
            .await
            .unwrap();
        store.recover(old.id).await.unwrap();

        let all = store.list_recent(CartFilter::default()).await.unwrap();
        let emails: Vec<&str> = all.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(emails, vec!["new@b.com", "mid@b.com", "old@b.com"]);

        let pending = store
            .list_recent(CartFilter {
                status: Some(CartStatus::Pending),
                limit: 1,
            })
            .await
            .unwrap();
        let emails: Vec<&str> = pending.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(emails, vec!["new@b.com"]);

        let recovered = store
            .list_recent(CartFilter {
                status: Some(CartStatus::Recovered),
                ..CartFilter::default()
            })
            .await
            .unwrap();
        let ids: Vec<CartRecordId> = recovered.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![old.id]);
    }
}
