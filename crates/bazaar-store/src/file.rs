//! File-backed backends for the CLI and single-process demos.
//!
//! [`FileRowStore`] keeps the whole store as one JSON document. Every
//! successful mutation rewrites it through a temporary file in the same
//! directory followed by an atomic rename, so a crash never leaves a
//! half-written store behind. Writes are applied to a copy of the state and
//! only published once the file is on disk; a failed flush leaves both the
//! file and the in-memory view unchanged.
//!
//! [`FileBucket`] keeps each object as a file under a bucket directory.
//!
//! Disk IO runs on tokio's blocking pool, never on an async worker.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::memory::Collections;
use crate::traits::{validate_collection, validate_key, validate_object_path, ObjectBucket, RowStore};
use crate::types::{CasOutcome, Filter, InsertOutcome, Row};

/// Content type reported for objects whose type record is missing.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

async fn run_blocking<T, F>(f: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Unavailable(format!("file task failed: {e}")))?
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Replace `path` with `bytes` via a synced temporary file and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

fn read_if_exists(path: &Path) -> StoreResult<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Row store
// ---------------------------------------------------------------------------

/// A [`RowStore`] persisted to a single JSON file.
///
/// Each write clones the state and rewrites the whole file with an fsync, so
/// write cost grows with the store. That is fine for demo catalogs, not for
/// large data sets. Writers are serialized; readers only wait for the final
/// swap of the published state, never for disk IO.
///
/// Only one process should open a given file at a time; the locks are
/// in-process.
#[derive(Debug)]
pub struct FileRowStore {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    path: PathBuf,
    state: RwLock<Collections>,
    writer: Mutex<()>,
}

impl Shared {
    fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.state
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    /// Apply `f` to a copy of the state; persist and publish it if `f`
    /// reports a change. Blocks on disk IO.
    fn mutate<T>(&self, f: impl FnOnce(&mut Collections) -> (T, bool)) -> StoreResult<T> {
        let _writer = self
            .writer
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        let mut next = self.read_state()?.clone();
        let (out, changed) = f(&mut next);
        if changed {
            self.persist(&next)?;
            let mut state = self
                .state
                .write()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            *state = next;
        }
        Ok(out)
    }

    fn persist(&self, state: &Collections) -> StoreResult<()> {
        let raw = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.path, &raw)?;
        debug!(path = %self.path.display(), rows = state.row_count(), "file store flushed");
        Ok(())
    }
}

impl FileRowStore {
    /// Open the store at `path`, loading it if the file exists.
    ///
    /// Missing parent directories are created. The file itself is only
    /// created by the first write.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        std::fs::create_dir_all(parent_dir(&path))?;
        let state = match read_if_exists(&path)? {
            Some(raw) if !raw.iter().all(u8::is_ascii_whitespace) => serde_json::from_slice(&raw)?,
            _ => Collections::default(),
        };
        debug!(path = %path.display(), rows = state.row_count(), "opened file store");
        Ok(Self {
            shared: Arc::new(Shared {
                path,
                state: RwLock::new(state),
                writer: Mutex::new(()),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    async fn mutate<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Collections) -> (T, bool) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        run_blocking(move || shared.mutate(f)).await
    }
}

#[async_trait]
impl RowStore for FileRowStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Row>> {
        validate_collection(collection)?;
        validate_key(key)?;
        Ok(self.shared.read_state()?.get(collection, key))
    }

    async fn insert_if_absent(
        &self,
        collection: &str,
        key: &str,
        value: Value,
    ) -> StoreResult<InsertOutcome<Row>> {
        validate_collection(collection)?;
        validate_key(key)?;
        let (collection, key) = (collection.to_string(), key.to_string());
        self.mutate(move |state| {
            let out = state.insert_if_absent(&collection, &key, value);
            let changed = out.was_inserted();
            (out, changed)
        })
        .await
    }

    async fn put(&self, collection: &str, key: &str, value: Value) -> StoreResult<Row> {
        validate_collection(collection)?;
        validate_key(key)?;
        let (collection, key) = (collection.to_string(), key.to_string());
        self.mutate(move |state| (state.put(&collection, &key, value), true))
            .await
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
        let (collection, key) = (collection.to_string(), key.to_string());
        self.mutate(move |state| {
            let out = state.compare_and_swap(&collection, &key, expected_version, value);
            let changed = out.is_swapped();
            (out, changed)
        })
        .await
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<bool> {
        validate_collection(collection)?;
        validate_key(key)?;
        let (collection, key) = (collection.to_string(), key.to_string());
        self.mutate(move |state| {
            let existed = state.delete(&collection, &key);
            (existed, existed)
        })
        .await
    }

    async fn select(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Row>> {
        validate_collection(collection)?;
        Ok(self.shared.read_state()?.select(collection, filter))
    }
}

// ---------------------------------------------------------------------------
// Bucket
// ---------------------------------------------------------------------------

/// An [`ObjectBucket`] stored in a directory.
///
/// Object bytes live under `{root}/objects/{path}` and the content type
/// under `{root}/types/{path}`. Public URLs are `{base_url}/{bucket}/{path}`,
/// the same shape as [`InMemoryBucket`](crate::InMemoryBucket); serving them
/// is left to whatever fronts the directory.
#[derive(Debug)]
pub struct FileBucket {
    name: String,
    base_url: String,
    root: PathBuf,
}

impl FileBucket {
    /// Open the bucket rooted at `root`, creating the directory if needed.
    pub fn open(
        root: impl Into<PathBuf>,
        name: impl Into<String>,
        base_url: impl Into<String>,
    ) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "opened file bucket");
        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            root,
        })
    }

    fn object_file(&self, path: &str) -> PathBuf {
        self.root.join("objects").join(path)
    }

    fn type_file(&self, path: &str) -> PathBuf {
        self.root.join("types").join(path)
    }

    /// The bytes and content type stored at `path`.
    pub async fn object(&self, path: &str) -> StoreResult<Option<(Bytes, String)>> {
        validate_object_path(path)?;
        let (object_file, type_file) = (self.object_file(path), self.type_file(path));
        run_blocking(move || {
            let Some(data) = read_if_exists(&object_file)? else {
                return Ok(None);
            };
            let content_type = read_if_exists(&type_file)?
                .map(|raw| String::from_utf8_lossy(&raw).into_owned())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
            Ok(Some((Bytes::from(data), content_type)))
        })
        .await
    }
}

#[async_trait]
impl ObjectBucket for FileBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> StoreResult<String> {
        validate_object_path(path)?;
        let (object_file, type_file) = (self.object_file(path), self.type_file(path));
        let content_type = content_type.to_string();
        run_blocking(move || {
            write_atomic(&object_file, &data)?;
            write_atomic(&type_file, content_type.as_bytes())
        })
        .await?;
        debug!(bucket = %self.name, path = %path, "object stored");
        Ok(self.public_url(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.name, path)
    }
}
