//! Typed access to a collection.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bazaar_types::Record;

use crate::error::StoreResult;
use crate::traits::RowStore;
use crate::types::{CasOutcome, Filter, InsertOutcome, Row, Versioned};

/// A typed view of the collection holding `T` records.
///
/// Encodes records to JSON on the way in and decodes rows on the way out;
/// everything else is forwarded to the underlying [`RowStore`].
pub struct Table<T> {
    store: Arc<dyn RowStore>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _record: PhantomData,
        }
    }
}

impl<T: Record> fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("collection", &T::COLLECTION)
            .finish()
    }
}

fn decode<T: Record>(row: Row) -> StoreResult<Versioned<T>> {
    row.try_map(|value| serde_json::from_value(value).map_err(Into::into))
}

impl<T: Record> Table<T> {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<Versioned<T>>> {
        self.store
            .get(T::COLLECTION, key)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn insert_if_absent(&self, record: &T) -> StoreResult<InsertOutcome<Versioned<T>>> {
        let value = serde_json::to_value(record)?;
        self.store
            .insert_if_absent(T::COLLECTION, &record.key(), value)
            .await?
            .try_map(decode)
    }

    /// Replace `record` if its row is still at `expected_version`.
    pub async fn compare_and_swap(
        &self,
        expected_version: u64,
        record: &T,
    ) -> StoreResult<CasOutcome<Versioned<T>>> {
        let value = serde_json::to_value(record)?;
        self.store
            .compare_and_swap(T::COLLECTION, &record.key(), expected_version, value)
            .await?
            .try_map(decode)
    }

    pub async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.store.delete(T::COLLECTION, key).await
    }

    pub async fn select(&self, filter: &Filter) -> StoreResult<Vec<Versioned<T>>> {
        self.store
            .select(T::COLLECTION, filter)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Every record in the collection.
    pub async fn all(&self) -> StoreResult<Vec<Versioned<T>>> {
        self.select(&Filter::all()).await
    }
}
