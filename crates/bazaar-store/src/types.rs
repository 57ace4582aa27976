//! Row, filter and write-outcome types shared by all backends.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value stored under a key, with the version assigned by the store.
///
/// Versions start at 1 on insert and increase by one on every write to the
/// same key. `compare_and_swap` succeeds only against the current version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub key: String,
    pub version: u64,
    pub value: T,
}

impl<T> Versioned<T> {
    /// Transform the value, keeping key and version.
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Versioned<U>, E> {
        Ok(Versioned {
            key: self.key,
            version: self.version,
            value: f(self.value)?,
        })
    }
}

/// An untyped row as held by a [`RowStore`](crate::RowStore).
pub type Row = Versioned<Value>;

/// Result of an insert-if-absent write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsertOutcome<T> {
    /// The key was free and the new row was written.
    Inserted(T),
    /// A row already existed under the key and was left untouched.
    Existing(T),
}

impl<T> InsertOutcome<T> {
    pub fn was_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }

    /// The row now stored under the key, whichever way the write went.
    pub fn into_inner(self) -> T {
        match self {
            InsertOutcome::Inserted(v) | InsertOutcome::Existing(v) => v,
        }
    }

    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<InsertOutcome<U>, E> {
        Ok(match self {
            InsertOutcome::Inserted(v) => InsertOutcome::Inserted(f(v)?),
            InsertOutcome::Existing(v) => InsertOutcome::Existing(f(v)?),
        })
    }
}

/// Result of a compare-and-swap write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CasOutcome<T> {
    /// The expected version matched and the row was replaced.
    Swapped(T),
    /// The row changed (or vanished) since it was read. Carries the current
    /// row, if any.
    Stale(Option<T>),
}

impl<T> CasOutcome<T> {
    pub fn is_swapped(&self) -> bool {
        matches!(self, CasOutcome::Swapped(_))
    }

    pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> Result<U, E>) -> Result<CasOutcome<U>, E> {
        Ok(match self {
            CasOutcome::Swapped(v) => CasOutcome::Swapped(f(v)?),
            CasOutcome::Stale(v) => CasOutcome::Stale(v.map(f).transpose()?),
        })
    }
}

/// A conjunction of field equality clauses, evaluated against a row's
/// top-level JSON fields.
///
/// An empty filter matches every row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    /// A filter that matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add a `field == value` clause.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn matches(&self, value: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| value.get(field) == Some(expected))
    }
}
