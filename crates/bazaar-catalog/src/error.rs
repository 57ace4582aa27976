use bazaar_ledger::WishlistError;
use bazaar_store::StoreError;
use bazaar_types::ProductId;
use thiserror::Error;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The operation needs a signed-in user.
    #[error("authentication required")]
    AuthenticationRequired,

    /// A listing field failed validation.
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("product not found: {0}")]
    NotFound(ProductId),

    /// Only the seller may change a listing.
    #[error("product {0} belongs to another seller")]
    NotSeller(ProductId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("wishlist error: {0}")]
    Wishlist(#[from] WishlistError),
}

impl CatalogError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CatalogError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
