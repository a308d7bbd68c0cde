//! Durable store trait definition.

use crate::error::StoreResult;
use crate::types::{Index, IndexEntry, IndexRange, Table};

/// A durable key-value store with secondary indexes.
///
/// Rows are **opaque byte payloads** keyed by string within a [`Table`].
/// The owning crates (cache tier, sync queue) encode and decode rows;
/// the store only maintains keys and index postings.
///
/// # Invariants
///
/// - `put` is an upsert and replaces the row's previous index postings
/// - `delete` is idempotent; deleting an absent key is not an error
/// - `scan_index` returns keys ordered by indexed value (ties by key)
/// - Reads observe all writes previously issued by the same logical task
/// - Implementations must be `Send + Sync`
///
/// # Implementors
///
/// - [`crate::MemoryStore`] - volatile, for tests and degraded operation
/// - [`crate::FileStore`] - persistent CBOR snapshot on disk
pub trait DurableStore: Send + Sync {
    /// Reads a row by key.
    ///
    /// # Errors
    ///
    /// Returns an error only on I/O or corruption; an absent key is `Ok(None)`.
    fn get(&self, table: Table, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Inserts or replaces a row along with its secondary-index postings.
    ///
    /// Any postings from a previous version of the row are removed first.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be made durable.
    fn put(
        &self,
        table: Table,
        key: &str,
        value: Vec<u8>,
        indexes: Vec<IndexEntry>,
    ) -> StoreResult<()>;

    /// Deletes a row and its index postings. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete cannot be made durable.
    fn delete(&self, table: Table, key: &str) -> StoreResult<()>;

    /// Returns all rows in a table as `(key, payload)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    fn scan(&self, table: Table) -> StoreResult<Vec<(String, Vec<u8>)>>;

    /// Returns the keys of rows whose posting in `index` falls in `range`,
    /// ordered by indexed value.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    fn scan_index(&self, table: Table, index: Index, range: IndexRange)
        -> StoreResult<Vec<String>>;

    /// Returns the number of rows in a table.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    fn count(&self, table: Table) -> StoreResult<usize>;

    /// Removes every row in a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear cannot be made durable.
    fn clear(&self, table: Table) -> StoreResult<()>;
}
