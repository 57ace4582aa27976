use thiserror::Error;

/// Errors surfaced by wishlist operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WishlistError {
    /// The session has no authenticated user. No request was sent.
    #[error("authentication required")]
    AuthenticationRequired,

    /// The store failed; nothing was committed.
    #[error("wishlist unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for wishlist operations.
pub type WishlistResult<T> = Result<T, WishlistError>;
