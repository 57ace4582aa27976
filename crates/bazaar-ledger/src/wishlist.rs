//! The wishlist ledger.
//!
//! One [`WishlistEntry`] row per saved `(user, product)` pair. Adding writes
//! with `insert_if_absent`, removing deletes by key, so retries never create
//! duplicates and never fail on an already-applied change.

use std::sync::Arc;

use bazaar_store::{Filter, RowStore, StoreError, Table};
use bazaar_types::{ProductId, Session, UserId, WishlistEntry};
use tracing::{debug, warn};

use crate::error::{WishlistError, WishlistResult};

/// Per-user saved products.
#[derive(Clone, Debug)]
pub struct WishlistLedger {
    entries: Table<WishlistEntry>,
}

fn require_user<'a>(session: &'a Session, op: &'static str) -> WishlistResult<&'a UserId> {
    session.user_id().ok_or_else(|| {
        debug!(op, "wishlist request without an authenticated user");
        WishlistError::AuthenticationRequired
    })
}

fn unavailable(op: &'static str, key: &str, error: StoreError) -> WishlistError {
    warn!(op, key, error = %error, "wishlist store request failed");
    WishlistError::Unavailable(error.to_string())
}

impl WishlistLedger {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self {
            entries: Table::new(store),
        }
    }

    /// Whether the session's user has saved `product_id`.
    pub async fn is_wishlisted(&self, session: &Session, product_id: &ProductId) -> WishlistResult<bool> {
        let user = require_user(session, "is_wishlisted")?;
        let key = WishlistEntry::key_for(user, product_id);
        let found = self
            .entries
            .get(&key)
            .await
            .map_err(|e| unavailable("is_wishlisted", &key, e))?;
        Ok(found.is_some())
    }

    /// Flip the saved state of `product_id` and return the new state.
    pub async fn toggle(&self, session: &Session, product_id: &ProductId) -> WishlistResult<bool> {
        let user = require_user(session, "toggle")?;
        let key = WishlistEntry::key_for(user, product_id);
        let present = self
            .entries
            .get(&key)
            .await
            .map_err(|e| unavailable("toggle", &key, e))?
            .is_some();

        if present {
            self.entries
                .delete(&key)
                .await
                .map_err(|e| unavailable("toggle", &key, e))?;
            debug!(user = %user, product = %product_id, "removed from wishlist");
            Ok(false)
        } else {
            self.insert(user, product_id, "toggle").await?;
            Ok(true)
        }
    }

    /// Save `product_id`. Saving an already-saved product is a no-op.
    pub async fn add(&self, session: &Session, product_id: &ProductId) -> WishlistResult<()> {
        let user = require_user(session, "add")?;
        self.insert(user, product_id, "add").await
    }

    /// Unsave `product_id`. Returns whether an entry was removed.
    pub async fn remove(&self, session: &Session, product_id: &ProductId) -> WishlistResult<bool> {
        let user = require_user(session, "remove")?;
        let key = WishlistEntry::key_for(user, product_id);
        let removed = self
            .entries
            .delete(&key)
            .await
            .map_err(|e| unavailable("remove", &key, e))?;
        debug!(user = %user, product = %product_id, removed, "wishlist remove");
        Ok(removed)
    }

    /// The session's saved entries, oldest first.
    pub async fn list(&self, session: &Session) -> WishlistResult<Vec<WishlistEntry>> {
        let user = require_user(session, "list")?;
        let rows = self
            .entries
            .select(&Filter::all().eq("user_id", user.as_str()))
            .await
            .map_err(|e| unavailable("list", user.as_str(), e))?;
        let mut entries: Vec<WishlistEntry> = rows.into_iter().map(|row| row.value).collect();
        entries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        Ok(entries)
    }

    /// Product ids on the session's wishlist, oldest first.
    pub async fn product_ids(&self, session: &Session) -> WishlistResult<Vec<ProductId>> {
        Ok(self
            .list(session)
            .await?
            .into_iter()
            .map(|entry| entry.product_id)
            .collect())
    }

    async fn insert(&self, user: &UserId, product_id: &ProductId, op: &'static str) -> WishlistResult<()> {
        let entry = WishlistEntry::new(user.clone(), product_id.clone());
        let key = WishlistEntry::key_for(user, product_id);
        let outcome = self
            .entries
            .insert_if_absent(&entry)
            .await
            .map_err(|e| unavailable(op, &key, e))?;
        debug!(
            user = %user,
            product = %product_id,
            inserted = outcome.was_inserted(),
            "added to wishlist"
        );
        Ok(())
    }
}
