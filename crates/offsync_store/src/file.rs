//! File-backed store with a CBOR snapshot format.

use crate::error::{StoreError, StoreResult};
use crate::state::StoreState;
use crate::store::DurableStore;
use crate::types::{Index, IndexEntry, IndexRange, Table};
use parking_lot::Mutex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A file-backed durable store.
///
/// The entire store state is kept in memory and persisted as a single
/// CBOR snapshot. Every mutation rewrites the snapshot through a
/// temp-file-then-rename sequence, so a crash mid-write leaves the
/// previous snapshot intact.
///
/// Snapshot rewrites are O(store size); the store is bounded by the
/// cache byte budget, which keeps rewrites cheap at this scale.
///
/// # Durability
///
/// With `sync_on_write` (the default) every mutation is followed by
/// `sync_all`. Turning it off defers durability to [`FileStore::flush`].
///
/// # Example
///
/// ```no_run
/// use offsync_store::{DurableStore, FileStore, Table};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("offsync.db")).unwrap();
/// store.put(Table::CacheEntries, "k", vec![1], vec![]).unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: Mutex<StoreState>,
    sync_on_write: bool,
}

impl FileStore {
    /// Opens or creates a file store at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the snapshot is
    /// corrupt. Opening never silently discards data.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::open_with(path, true)
    }

    /// Opens a file store with explicit durability behavior.
    ///
    /// # Errors
    ///
    /// Same as [`FileStore::open`].
    pub fn open_with(path: &Path, sync_on_write: bool) -> StoreResult<Self> {
        let state = if path.exists() {
            let bytes = fs::read(path)?;
            if bytes.is_empty() {
                StoreState::default()
            } else {
                ciborium::from_reader(&bytes[..])
                    .map_err(|e| StoreError::corruption(format!("snapshot decode: {e}")))?
            }
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            StoreState::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(state),
            sync_on_write,
        })
    }

    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists the current state to disk.
    ///
    /// Only needed when the store was opened with `sync_on_write = false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub fn flush(&self) -> StoreResult<()> {
        let state = self.state.lock();
        self.write_snapshot(&state)
    }

    fn write_snapshot(&self, state: &StoreState) -> StoreResult<()> {
        let mut buf = Vec::new();
        ciborium::into_writer(state, &mut buf)
            .map_err(|e| StoreError::codec(format!("snapshot encode: {e}")))?;

        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&buf)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn mutate<F: FnOnce(&mut StoreState)>(&self, f: F) -> StoreResult<()> {
        let mut state = self.state.lock();
        f(&mut state);
        if self.sync_on_write {
            self.write_snapshot(&state)?;
        }
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, table: Table, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.state.lock().get(table, key))
    }

    fn put(
        &self,
        table: Table,
        key: &str,
        value: Vec<u8>,
        indexes: Vec<IndexEntry>,
    ) -> StoreResult<()> {
        self.mutate(|s| s.put(table, key, value, indexes))
    }

    fn delete(&self, table: Table, key: &str) -> StoreResult<()> {
        self.mutate(|s| s.delete(table, key))
    }

    fn scan(&self, table: Table) -> StoreResult<Vec<(String, Vec<u8>)>> {
        Ok(self.state.lock().scan(table))
    }

    fn scan_index(
        &self,
        table: Table,
        index: Index,
        range: IndexRange,
    ) -> StoreResult<Vec<String>> {
        Ok(self.state.lock().scan_index(table, index, &range))
    }

    fn count(&self, table: Table) -> StoreResult<usize> {
        Ok(self.state.lock().count(table))
    }

    fn clear(&self, table: Table) -> StoreResult<()> {
        self.mutate(|s| s.clear(table))
    }
}
