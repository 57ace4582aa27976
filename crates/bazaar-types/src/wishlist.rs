use serde::{Deserialize, Serialize};

use crate::ids::{ProductId, UserId};
use crate::record::Record;
use crate::Timestamp;

/// A product saved to a user's wishlist.
///
/// Keyed by `(user_id, product_id)`: a user saves a product at most once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: Timestamp,
}

impl WishlistEntry {
    pub fn new(user_id: UserId, product_id: ProductId) -> Self {
        Self {
            user_id,
            product_id,
            created_at: chrono::Utc::now(),
        }
    }

    /// The storage key for the `(user, product)` pair.
    pub fn key_for(user_id: &UserId, product_id: &ProductId) -> String {
        format!("{user_id}/{product_id}")
    }
}

impl Record for WishlistEntry {
    const COLLECTION: &'static str = "wishlist";

    fn key(&self) -> String {
        Self::key_for(&self.user_id, &self.product_id)
    }
}
