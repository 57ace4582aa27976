//! A [`RowStore`] wrapper that counts calls and can inject failures.
//!
//! Used by tests to assert that an operation issued no request at all, or to
//! simulate the backend going away for a chosen subset of operations.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::traits::RowStore;
use crate::types::{CasOutcome, Filter, InsertOutcome, Row};

/// Row store operations, as counted by [`InstrumentedStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    InsertIfAbsent,
    Put,
    CompareAndSwap,
    Delete,
    Select,
}

impl StoreOp {
    pub const ALL: [StoreOp; 6] = [
        StoreOp::Get,
        StoreOp::InsertIfAbsent,
        StoreOp::Put,
        StoreOp::CompareAndSwap,
        StoreOp::Delete,
        StoreOp::Select,
    ];
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreOp::Get => "get",
            StoreOp::InsertIfAbsent => "insert_if_absent",
            StoreOp::Put => "put",
            StoreOp::CompareAndSwap => "compare_and_swap",
            StoreOp::Delete => "delete",
            StoreOp::Select => "select",
        };
        f.write_str(name)
    }
}

#[derive(Default)]
struct Probe {
    calls: HashMap<StoreOp, usize>,
    failing: HashSet<StoreOp>,
}

/// Wraps another store, recording every call before forwarding it.
pub struct InstrumentedStore {
    inner: Arc<dyn RowStore>,
    probe: Mutex<Probe>,
}

impl InstrumentedStore {
    pub fn new(inner: Arc<dyn RowStore>) -> Self {
        Self {
            inner,
            probe: Mutex::new(Probe::default()),
        }
    }

    /// Number of calls made for `op`.
    pub fn calls(&self, op: StoreOp) -> usize {
        self.probe
            .lock()
            .map(|p| p.calls.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of calls made across all operations.
    pub fn total_calls(&self) -> usize {
        StoreOp::ALL.iter().map(|op| self.calls(*op)).sum()
    }

    /// Make `op` fail with [`StoreError::Unavailable`] until cleared.
    pub fn fail(&self, op: StoreOp) {
        if let Ok(mut probe) = self.probe.lock() {
            probe.failing.insert(op);
        }
    }

    /// Make every operation fail.
    pub fn fail_all(&self) {
        for op in StoreOp::ALL {
            self.fail(op);
        }
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        if let Ok(mut probe) = self.probe.lock() {
            probe.failing.clear();
        }
    }

    /// Reset call counters.
    pub fn reset_counts(&self) {
        if let Ok(mut probe) = self.probe.lock() {
            probe.calls.clear();
        }
    }

    fn record(&self, op: StoreOp) -> StoreResult<()> {
        let mut probe = self
            .probe
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        *probe.calls.entry(op).or_default() += 1;
        if probe.failing.contains(&op) {
            return Err(StoreError::Unavailable(format!("injected failure on {op}")));
        }
        Ok(())
    }
}

impl fmt::Debug for InstrumentedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedStore")
            .field("total_calls", &self.total_calls())
            .finish()
    }
}

#[async_trait]
impl RowStore for InstrumentedStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Row>> {
        self.record(StoreOp::Get)?;
        self.inner.get(collection, key).await
    }

    async fn insert_if_absent(
        &self,
        collection: &str,
        key: &str,
        value: Value,
    ) -> StoreResult<InsertOutcome<Row>> {
        self.record(StoreOp::InsertIfAbsent)?;
        self.inner.insert_if_absent(collection, key, value).await
    }

    async fn put(&self, collection: &str, key: &str, value: Value) -> StoreResult<Row> {
        self.record(StoreOp::Put)?;
        self.inner.put(collection, key, value).await
    }

    async fn compare_and_swap(
        &self,
        collection: &str,
        key: &str,
        expected_version: u64,
        value: Value,
    ) -> StoreResult<CasOutcome<Row>> {
        self.record(StoreOp::CompareAndSwap)?;
        self.inner
            .compare_and_swap(collection, key, expected_version, value)
            .await
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<bool> {
        self.record(StoreOp::Delete)?;
        self.inner.delete(collection, key).await
    }

    async fn select(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Row>> {
        self.record(StoreOp::Select)?;
        self.inner.select(collection, filter).await
    }
}
