//! Cart contents and the persisted cart record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CartRecordId, CartStatus, Email, ProductId};

/// One line of a cart: a product and how many of it.
///
/// Serialized with the field names the automation webhook expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub const fn new(product_id: i64, quantity: u32) -> Self {
        Self {
            product_id: ProductId::new(product_id),
            quantity,
        }
    }
}

/// Point-in-time view of a shopper's session, as handed to the cart tracker.
///
/// A snapshot without an email stands for a session where no contact is
/// known yet (or no session at all); the tracker ignores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub items: Vec<CartItem>,
}

impl CartSnapshot {
    /// Whether the cart holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A persisted abandoned cart record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRecord {
    pub id: CartRecordId,
    pub email: Email,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub cart_items: Vec<CartItem>,
    pub status: CartStatus,
    /// Last cart activity while pending; refreshed on every tracked change.
    pub created_at: DateTime<Utc>,
    /// Set once the abandonment webhook has been delivered. Never reset.
    pub sent_to_make: bool,
}

impl CartRecord {
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, CartStatus::Pending)
    }
}
