/// Errors from row store and bucket operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A collection name, key or object path is unusable.
    #[error("invalid {what}: {value:?}")]
    InvalidKey { what: &'static str, value: String },

    /// A compare-and-swap loop gave up after repeated version conflicts.
    #[error("contention on {collection}/{key} after {attempts} attempts")]
    Contention {
        collection: String,
        key: String,
        attempts: u32,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding in-process state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
