//! In-memory store for testing and degraded operation.

use crate::error::StoreResult;
use crate::state::StoreState;
use crate::store::DurableStore;
use crate::types::{Index, IndexEntry, IndexRange, Table};
use parking_lot::RwLock;

/// An in-memory durable store.
///
/// Nothing survives process exit; this implementation exists for:
/// - Unit and integration tests
/// - Hosts that deliberately run fast-layer-only after a persistent
///   store failed to open
///
/// # Thread Safety
///
/// All state sits behind a single `RwLock`, so reads issued after a write
/// by the same task always observe that write.
///
/// # Example
///
/// ```rust
/// use offsync_store::{DurableStore, MemoryStore, Table};
///
/// let store = MemoryStore::new();
/// store.put(Table::CacheEntries, "k", vec![1, 2, 3], vec![]).unwrap();
/// assert_eq!(store.get(Table::CacheEntries, "k").unwrap(), Some(vec![1, 2, 3]));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, table: Table, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.state.read().get(table, key))
    }

    fn put(
        &self,
        table: Table,
        key: &str,
        value: Vec<u8>,
        indexes: Vec<IndexEntry>,
    ) -> StoreResult<()> {
        self.state.write().put(table, key, value, indexes);
        Ok(())
    }

    fn delete(&self, table: Table, key: &str) -> StoreResult<()> {
        self.state.write().delete(table, key);
        Ok(())
    }

    fn scan(&self, table: Table) -> StoreResult<Vec<(String, Vec<u8>)>> {
        Ok(self.state.read().scan(table))
    }

    fn scan_index(
        &self,
        table: Table,
        index: Index,
        range: IndexRange,
    ) -> StoreResult<Vec<String>> {
        Ok(self.state.read().scan_index(table, index, &range))
    }

    fn count(&self, table: Table) -> StoreResult<usize> {
        Ok(self.state.read().count(table))
    }

    fn clear(&self, table: Table) -> StoreResult<()> {
        self.state.write().clear(table);
        Ok(())
    }
}
