use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("type error: {0}")]
    Type(#[from] bazaar_types::TypeError),

    #[error("store error: {0}")]
    Store(#[from] bazaar_store::StoreError),

    #[error("wishlist error: {0}")]
    Wishlist(#[from] bazaar_ledger::WishlistError),

    #[error("catalog error: {0}")]
    Catalog(#[from] bazaar_catalog::CatalogError),
}

pub type SdkResult<T> = Result<T, SdkError>;
