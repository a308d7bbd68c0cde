//! Tables, indexes, and shared scalar types.

use serde::{Deserialize, Serialize};

/// Logical tables in the durable store.
///
/// The cache tier owns `CacheEntries`, `CacheMetadata`, and `DailyStats`;
/// the sync queue owns `SyncQueue`, `SyncHistory`, and `Conflicts`.
/// Neither component reads the other's tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Table {
    /// Full cache entries (key + payload + expiry bookkeeping).
    CacheEntries,
    /// Access metadata kept separate so eviction scoring scans stay cheap.
    CacheMetadata,
    /// Per-day hit/miss/set counters, increment-only.
    DailyStats,
    /// Pending and failed sync queue items.
    SyncQueue,
    /// Append-only sync history, one record per terminal outcome.
    SyncHistory,
    /// Recorded (unresolved) sync conflicts.
    Conflicts,
}

impl Table {
    /// All tables, in snapshot order.
    pub const ALL: [Table; 6] = [
        Table::CacheEntries,
        Table::CacheMetadata,
        Table::DailyStats,
        Table::SyncQueue,
        Table::SyncHistory,
        Table::Conflicts,
    ];
}

/// Secondary indexes a row may post into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Index {
    /// Absolute expiry time in milliseconds.
    Expiry,
    /// Category tag.
    Category,
    /// Enqueue / record timestamp in milliseconds.
    Timestamp,
    /// Priority rank (higher rank = more urgent).
    Priority,
    /// Item status code.
    Status,
}

/// An ordered scalar value stored in a secondary index.
///
/// Ordering is derived: all `Unsigned` values sort before all `Text`
/// values, which is fine because no single index mixes the two.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexValue {
    /// An unsigned numeric value (timestamps, ranks, codes).
    Unsigned(u64),
    /// A text value (categories).
    Text(String),
}

impl From<u64> for IndexValue {
    fn from(v: u64) -> Self {
        IndexValue::Unsigned(v)
    }
}

impl From<&str> for IndexValue {
    fn from(v: &str) -> Self {
        IndexValue::Text(v.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(v: String) -> Self {
        IndexValue::Text(v)
    }
}

/// One secondary-index posting for a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// The index this posting belongs to.
    pub index: Index,
    /// The indexed value.
    pub value: IndexValue,
}

impl IndexEntry {
    /// Creates a new index posting.
    pub fn new(index: Index, value: impl Into<IndexValue>) -> Self {
        Self {
            index,
            value: value.into(),
        }
    }
}

/// A range over one secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRange {
    /// Every posting in the index.
    All,
    /// Postings equal to the given value.
    Equals(IndexValue),
    /// Postings with value <= the given bound (inclusive).
    AtMost(IndexValue),
}

impl IndexRange {
    /// Returns true if the given value falls inside this range.
    pub fn contains(&self, value: &IndexValue) -> bool {
        match self {
            IndexRange::All => true,
            IndexRange::Equals(v) => value == v,
            IndexRange::AtMost(bound) => value <= bound,
        }
    }
}

/// Priority of a cache entry or queue item.
///
/// Ordering is `Low < Normal < High` so `Ord` can be used directly when
/// ranking work.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    /// Background / best-effort.
    Low,
    /// Default priority.
    #[default]
    Normal,
    /// Attempted before everything else.
    High,
}

impl Priority {
    /// Numeric rank used for index postings (higher = more urgent).
    pub fn rank(&self) -> u64 {
        match self {
            Priority::Low => 0,
            Priority::Normal => 1,
            Priority::High => 2,
        }
    }
}
