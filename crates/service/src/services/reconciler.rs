//! Order reconciler: completed orders recover pending carts.

use tracing::{info, instrument};

use abandoned_cart_core::Email;

use crate::db::{DynCartStore, RepositoryError};

#[derive(Clone)]
pub struct OrderReconciler {
    carts: DynCartStore,
}

impl OrderReconciler {
    #[must_use]
    pub fn new(carts: DynCartStore) -> Self {
        Self { carts }
    }

    /// Mark every pending cart for the billing email as recovered.
    ///
    /// Returns how many records moved; repeating the call returns 0.
    /// No webhook is sent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the update fails.
    #[instrument(skip(self, billing_email), fields(email = %billing_email))]
    pub async fn order_completed(&self, billing_email: &Email) -> Result<u64, RepositoryError> {
        let recovered = self.carts.recover_pending_by_email(billing_email).await?;
        if recovered > 0 {
            info!(recovered, "Carts recovered by completed order");
        }
        Ok(recovered)
    }
}
