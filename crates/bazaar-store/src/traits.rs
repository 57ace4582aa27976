//! Collaborator traits consumed by the ledgers and the catalog.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;
use crate::types::{CasOutcome, Filter, InsertOutcome, Row};

/// Hosted keyed row store.
///
/// Implementations must be thread-safe (`Send + Sync`). Each method is a single
/// request against the backend; `insert_if_absent` and `compare_and_swap`
/// must be atomic with respect to concurrent callers on the same key.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Read a row by key.
    ///
    /// Returns `Ok(None)` if no row exists under the key.
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Row>>;

    /// Write a row only if the key is free.
    ///
    /// Never overwrites. When a row already exists it is returned as
    /// [`InsertOutcome::Existing`] and the store is unchanged.
    async fn insert_if_absent(
        &self,
        collection: &str,
        key: &str,
        value: serde_json::Value,
    ) -> StoreResult<InsertOutcome<Row>>;

    /// Create or overwrite a row unconditionally.
    async fn put(&self, collection: &str, key: &str, value: serde_json::Value) -> StoreResult<Row>;

    /// Replace a row only if its current version is `expected_version`.
    async fn compare_and_swap(
        &self,
        collection: &str,
        key: &str,
        expected_version: u64,
        value: serde_json::Value,
    ) -> StoreResult<CasOutcome<Row>>;

    /// Delete a row by key. Returns `true` if the row existed.
    async fn delete(&self, collection: &str, key: &str) -> StoreResult<bool>;

    /// All rows of a collection matching `filter`, ordered by key.
    async fn select(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Row>>;
}

/// Hosted object storage bucket.
#[async_trait]
pub trait ObjectBucket: Send + Sync {
    /// Bucket name.
    fn name(&self) -> &str;

    /// Upload `data` under `path`, replacing any previous object, and return
    /// its public URL.
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> StoreResult<String>;

    /// The public URL an object at `path` is (or would be) served from.
    fn public_url(&self, path: &str) -> String;
}

pub(crate) fn validate_collection(collection: &str) -> StoreResult<()> {
    if collection.is_empty() || collection.contains('/') {
        return Err(crate::StoreError::InvalidKey {
            what: "collection",
            value: collection.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(crate::StoreError::InvalidKey {
            what: "key",
            value: key.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn validate_object_path(path: &str) -> StoreResult<()> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.ends_with('/')
        || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(crate::StoreError::InvalidKey {
            what: "object path",
            value: path.to_string(),
        });
    }
    Ok(())
}
