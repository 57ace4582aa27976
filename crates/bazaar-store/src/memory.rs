//! In-memory backends for tests and ephemeral use.
//!
//! [`InMemoryRowStore`] keeps every collection in a map behind a `RwLock`.
//! Each trait method takes the lock once, so `insert_if_absent` and
//! `compare_and_swap` are atomic with respect to each other.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_collection, validate_key, validate_object_path, ObjectBucket, RowStore};
use crate::types::{CasOutcome, Filter, InsertOutcome, Row, Versioned};

/// Collection state shared by the in-memory and file-backed stores.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct Collections {
    collections: BTreeMap<String, BTreeMap<String, Row>>,
}

impl Collections {
    pub(crate) fn get(&self, collection: &str, key: &str) -> Option<Row> {
        self.collections.get(collection)?.get(key).cloned()
    }

    pub(crate) fn insert_if_absent(
        &mut self,
        collection: &str,
        key: &str,
        value: Value,
    ) -> InsertOutcome<Row> {
        let rows = self.collections.entry(collection.to_string()).or_default();
        if let Some(existing) = rows.get(key) {
            return InsertOutcome::Existing(existing.clone());
        }
        let row = Versioned {
            key: key.to_string(),
            version: 1,
            value,
        };
        rows.insert(key.to_string(), row.clone());
        InsertOutcome::Inserted(row)
    }

    pub(crate) fn put(&mut self, collection: &str, key: &str, value: Value) -> Row {
        let rows = self.collections.entry(collection.to_string()).or_default();
        let version = rows.get(key).map_or(1, |r| r.version + 1);
        let row = Versioned {
            key: key.to_string(),
            version,
            value,
        };
        rows.insert(key.to_string(), row.clone());
        row
    }

    pub(crate) fn compare_and_swap(
        &mut self,
        collection: &str,
        key: &str,
        expected_version: u64,
        value: Value,
    ) -> CasOutcome<Row> {
        let Some(current) = self
            .collections
            .get_mut(collection)
            .and_then(|rows| rows.get_mut(key))
        else {
            return CasOutcome::Stale(None);
        };
        if current.version != expected_version {
            return CasOutcome::Stale(Some(current.clone()));
        }
        current.version += 1;
        current.value = value;
        CasOutcome::Swapped(current.clone())
    }

    pub(crate) fn delete(&mut self, collection: &str, key: &str) -> bool {
        self.collections
            .get_mut(collection)
            .is_some_and(|rows| rows.remove(key).is_some())
    }

    pub(crate) fn select(&self, collection: &str, filter: &Filter) -> Vec<Row> {
        self.collections
            .get(collection)
            .map(|rows| {
                rows.values()
                    .filter(|row| filter.matches(&row.value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn row_count(&self) -> usize {
        self.collections.values().map(BTreeMap::len).sum()
    }
}

/// An in-memory implementation of [`RowStore`].
///
/// Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRowStore {
    state: RwLock<Collections>,
}

impl InMemoryRowStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.state
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, Collections>> {
        self.state
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Row>> {
        validate_collection(collection)?;
        validate_key(key)?;
        Ok(self.read_state()?.get(collection, key))
    }

    async fn insert_if_absent(
        &self,
        collection: &str,
        key: &str,
        value: Value,
    ) -> StoreResult<InsertOutcome<Row>> {
        validate_collection(collection)?;
        validate_key(key)?;
        Ok(self.write_state()?.insert_if_absent(collection, key, value))
    }

    async fn put(&self, collection: &str, key: &str, value: Value) -> StoreResult<Row> {
        validate_collection(collection)?;
        validate_key(key)?;
        Ok(self.write_state()?.put(collection, key, value))
    }

    async fn compare_and_swap(
        &self,
        collection: &str,
        key: &str,
        expected_version: u64,
        value: Value,
    ) -> StoreResult<CasOutcome<Row>> {
        validate_collection(collection)?;
        validate_key(key)?;
        Ok(self
            .write_state()?
            .compare_and_swap(collection, key, expected_version, value))
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<bool> {
        validate_collection(collection)?;
        validate_key(key)?;
        Ok(self.write_state()?.delete(collection, key))
    }

    async fn select(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Row>> {
        validate_collection(collection)?;
        Ok(self.read_state()?.select(collection, filter))
    }
}

#[derive(Clone, Debug)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// An in-memory implementation of [`ObjectBucket`].
///
/// Public URLs are `{base_url}/{bucket}/{path}`; nothing serves them, but
/// they are stable and unique per path.
#[derive(Debug)]
pub struct InMemoryBucket {
    name: String,
    base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryBucket {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The bytes and content type stored at `path`.
    pub fn object(&self, path: &str) -> Option<(Bytes, String)> {
        let objects = self.objects.read().ok()?;
        objects
            .get(path)
            .map(|o| (o.data.clone(), o.content_type.clone()))
    }
}

#[async_trait]
impl ObjectBucket for InMemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> StoreResult<String> {
        validate_object_path(path)?;
        let mut objects = self
            .objects
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        objects.insert(
            path.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(self.public_url(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.name, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -----------------------------------------------------------------------
    // Row store
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn insert_then_get() {
        let store = InMemoryRowStore::new();
        let out = store
            .insert_if_absent("groups", "g1", json!({"name": "Book Club"}))
            .await
            .unwrap();
        assert!(out.was_inserted());

        let row = store.get("groups", "g1").await.unwrap().expect("should exist");
        assert_eq!(row.version, 1);
        assert_eq!(row.value["name"], "Book Club");
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = InMemoryRowStore::new();
        assert!(store.get("groups", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_if_absent_never_overwrites() {
        let store = InMemoryRowStore::new();
        store
            .insert_if_absent("wishlist", "u1/2", json!({"n": 1}))
            .await
            .unwrap();
        let second = store
            .insert_if_absent("wishlist", "u1/2", json!({"n": 2}))
            .await
            .unwrap();

        match second {
            InsertOutcome::Existing(row) => assert_eq!(row.value["n"], 1),
            InsertOutcome::Inserted(_) => panic!("expected existing row"),
        }
        assert_eq!(store.read_state().unwrap().row_count(), 1);
    }

    #[tokio::test]
    async fn put_bumps_version() {
        let store = InMemoryRowStore::new();
        let first = store.put("c", "k", json!(1)).await.unwrap();
        let second = store.put("c", "k", json!(2)).await.unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_eq!(store.get("c", "k").await.unwrap().unwrap().value, json!(2));
    }

    #[tokio::test]
    async fn cas_succeeds_on_current_version() {
        let store = InMemoryRowStore::new();
        store.put("c", "k", json!({"count": 1})).await.unwrap();
        let out = store
            .compare_and_swap("c", "k", 1, json!({"count": 2}))
            .await
            .unwrap();
        match out {
            CasOutcome::Swapped(row) => {
                assert_eq!(row.version, 2);
                assert_eq!(row.value["count"], 2);
            }
            CasOutcome::Stale(_) => panic!("expected swap"),
        }
    }

    #[tokio::test]
    async fn cas_rejects_stale_version() {
        let store = InMemoryRowStore::new();
        store.put("c", "k", json!(1)).await.unwrap();
        store.put("c", "k", json!(2)).await.unwrap();

        let out = store.compare_and_swap("c", "k", 1, json!(99)).await.unwrap();
        match out {
            CasOutcome::Stale(Some(current)) => {
                assert_eq!(current.version, 2);
                assert_eq!(current.value, json!(2));
            }
            other => panic!("expected stale, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cas_on_missing_row_is_stale_none() {
        let store = InMemoryRowStore::new();
        let out = store.compare_and_swap("c", "k", 1, json!(1)).await.unwrap();
        assert_eq!(out, CasOutcome::Stale(None));
        assert_eq!(store.read_state().unwrap().row_count(), 0);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = InMemoryRowStore::new();
        store.put("c", "k", json!(1)).await.unwrap();
        assert!(store.delete("c", "k").await.unwrap());
        assert!(!store.delete("c", "k").await.unwrap());
        assert!(!store.delete("other", "k").await.unwrap());
    }

    #[tokio::test]
    async fn select_filters_and_orders_by_key() {
        let store = InMemoryRowStore::new();
        store.put("m", "g1/u2", json!({"group_id": "g1", "user_id": "u2"})).await.unwrap();
        store.put("m", "g1/u1", json!({"group_id": "g1", "user_id": "u1"})).await.unwrap();
        store.put("m", "g2/u1", json!({"group_id": "g2", "user_id": "u1"})).await.unwrap();

        let g1 = store.select("m", &Filter::all().eq("group_id", "g1")).await.unwrap();
        let keys: Vec<_> = g1.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["g1/u1", "g1/u2"]);

        let all = store.select("m", &Filter::all()).await.unwrap();
        assert_eq!(all.len(), 3);

        let none = store.select("empty", &Filter::all()).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn rejects_bad_collection_and_key() {
        let store = InMemoryRowStore::new();
        assert!(matches!(
            store.get("", "k").await,
            Err(StoreError::InvalidKey { what: "collection", .. })
        ));
        assert!(matches!(
            store.put("c", "", json!(1)).await,
            Err(StoreError::InvalidKey { what: "key", .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_yield_one_winner() {
        let store = std::sync::Arc::new(InMemoryRowStore::new());
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..32 {
            let store = store.clone();
            tasks.spawn(async move {
                store
                    .insert_if_absent("m", "g/u", json!({ "attempt": i }))
                    .await
                    .unwrap()
                    .was_inserted()
            });
        }
        let mut winners = 0;
        while let Some(res) = tasks.join_next().await {
            if res.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.read_state().unwrap().row_count(), 1);
    }

    // -----------------------------------------------------------------------
    // Bucket
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn upload_returns_public_url() {
        let bucket = InMemoryBucket::new("listing-images", "https://cdn.example.com/");
        let url = bucket
            .upload("listings/1/cover.jpg", Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/listing-images/listings/1/cover.jpg");
        assert_eq!(url, bucket.public_url("listings/1/cover.jpg"));

        let (data, content_type) = bucket.object("listings/1/cover.jpg").unwrap();
        assert_eq!(&data[..], b"jpeg");
        assert_eq!(content_type, "image/jpeg");
        assert!(bucket.object("listings/1/missing.jpg").is_none());
    }

    #[tokio::test]
    async fn upload_rejects_traversal_paths() {
        let bucket = InMemoryBucket::new("b", "https://cdn.example.com");
        for path in ["", "/abs", "a/../b", "a//b", "dir/"] {
            assert!(
                bucket.upload(path, Bytes::new(), "text/plain").await.is_err(),
                "path {path:?} should be rejected"
            );
        }
        assert!(bucket.is_empty());
    }
}
