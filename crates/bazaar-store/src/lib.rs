//! Persistence collaborators for Bazaar.
//!
//! Bazaar keeps no storage engine of its own. Rows live in a hosted keyed
//! store and listing images in a hosted object bucket; this crate defines the
//! surface Bazaar consumes from them and ships backends for tests, demos and
//! the CLI.
//!
//! # Row Stores
//!
//! All backends implement the async [`RowStore`] trait. Rows are JSON values
//! grouped into named collections and addressed by a string key. Every row
//! carries a version that increases on each write.
//!
//! - [`InMemoryRowStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`FileRowStore`] -- JSON file snapshot, rewritten atomically on change
//! - [`InstrumentedStore`] -- wrapper that counts calls and injects failures
//!
//! [`Table`] layers typed access over any row store for types implementing
//! [`bazaar_types::Record`].
//!
//! # Design Rules
//!
//! 1. A key identifies exactly one row per collection.
//! 2. `insert_if_absent` and `compare_and_swap` are atomic; callers use them
//!    instead of read-then-write sequences.
//! 3. Failed writes leave the store unchanged.
//! 4. Stores never interpret row contents beyond `eq` filters.
//!
//! # Object Buckets
//!
//! [`ObjectBucket`] uploads bytes under a path and hands back a public URL.
//! [`InMemoryBucket`] keeps objects in memory; [`FileBucket`] writes them
//! under a directory.

pub mod error;
pub mod file;
pub mod instrumented;
pub mod memory;
pub mod table;
pub mod traits;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use file::{FileBucket, FileRowStore};
pub use instrumented::{InstrumentedStore, StoreOp};
pub use memory::{InMemoryBucket, InMemoryRowStore};
pub use table::Table;
pub use traits::{ObjectBucket, RowStore};
pub use types::{CasOutcome, Filter, InsertOutcome, Row, Versioned};
