//! Cache entry and access metadata records.

use crate::error::{CacheError, CacheResult};
use offsync_store::{Index, IndexEntry, Priority};
use serde::{Deserialize, Serialize};

/// A single cached value with its bookkeeping.
///
/// An entry is visible to readers only while `now < expires_at_ms`;
/// an expired entry is logically absent even if the sweep has not yet
/// physically deleted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Unique cache key.
    pub key: String,
    /// The stored payload, possibly transformed.
    pub value: Vec<u8>,
    /// Category tag for grouping, statistics, and scoped clears.
    pub category: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at_ms: u64,
    /// Absolute expiry time in milliseconds since the Unix epoch.
    pub expires_at_ms: u64,
    /// Estimated payload size in bytes.
    pub size_bytes: u64,
    /// Entry priority.
    pub priority: Priority,
    /// Number of reads that hit this entry.
    pub access_count: u64,
    /// Time of the most recent read, in milliseconds.
    pub last_access_ms: u64,
    /// Whether `value` went through the configured transform.
    pub transformed: bool,
}

impl CacheEntry {
    /// Returns true if the entry is expired at the given time.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }

    /// Records a read at the given time.
    pub fn touch(&mut self, now_ms: u64) {
        self.access_count += 1;
        self.last_access_ms = now_ms;
    }

    /// Index postings for the durable store.
    pub fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::new(Index::Expiry, self.expires_at_ms),
            IndexEntry::new(Index::Category, self.category.as_str()),
            IndexEntry::new(Index::Priority, self.priority.rank()),
        ]
    }

    /// Encodes the entry to CBOR.
    ///
    /// # Errors
    ///
    /// Returns a codec error if serialization fails.
    pub fn encode(&self) -> CacheResult<Vec<u8>> {
        encode(self)
    }

    /// Decodes an entry from CBOR.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the bytes are not a valid entry.
    pub fn decode(bytes: &[u8]) -> CacheResult<Self> {
        decode(bytes)
    }
}

/// Per-key access metadata, stored separately from the full entry.
///
/// Eviction and warm-up rank candidates from this record alone, so
/// scoring scans never deserialize value payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessMetadata {
    /// The cache key this record describes.
    pub key: String,
    /// Category tag, mirrored from the entry.
    pub category: String,
    /// Priority, mirrored from the entry.
    pub priority: Priority,
    /// Number of reads that hit the entry.
    pub access_count: u64,
    /// Time of the most recent read, in milliseconds.
    pub last_access_ms: u64,
}

impl AccessMetadata {
    /// Builds the metadata record for an entry.
    pub fn for_entry(entry: &CacheEntry) -> Self {
        Self {
            key: entry.key.clone(),
            category: entry.category.clone(),
            priority: entry.priority,
            access_count: entry.access_count,
            last_access_ms: entry.last_access_ms,
        }
    }

    /// Eviction score: higher scores survive longer.
    ///
    /// `0.7 * access_count - 0.3 * minutes_since_last_access`, so rarely
    /// and least-recently used entries are evicted first.
    pub fn eviction_score(&self, now_ms: u64) -> f64 {
        let age_minutes = now_ms.saturating_sub(self.last_access_ms) as f64 / 60_000.0;
        0.7 * self.access_count as f64 - 0.3 * age_minutes
    }

    /// Index postings for the durable store.
    pub fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::new(Index::Category, self.category.as_str()),
            IndexEntry::new(Index::Timestamp, self.last_access_ms),
            IndexEntry::new(Index::Priority, self.priority.rank()),
        ]
    }

    /// Encodes the record to CBOR.
    ///
    /// # Errors
    ///
    /// Returns a codec error if serialization fails.
    pub fn encode(&self) -> CacheResult<Vec<u8>> {
        encode(self)
    }

    /// Decodes a record from CBOR.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the bytes are not a valid record.
    pub fn decode(bytes: &[u8]) -> CacheResult<Self> {
        decode(bytes)
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> CacheResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CacheError::codec(e.to_string()))?;
    Ok(buf)
}

pub(crate) fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> CacheResult<T> {
    ciborium::from_reader(bytes).map_err(|e| CacheError::codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry(key: &str, expires_at_ms: u64) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            value: vec![1, 2, 3],
            category: "products".to_string(),
            created_at_ms: 1_000,
            expires_at_ms,
            size_bytes: 3,
            priority: Priority::Normal,
            access_count: 0,
            last_access_ms: 1_000,
            transformed: false,
        }
    }

    #[test]
    fn expiry_is_inclusive_at_bound() {
        let entry = make_entry("k", 5_000);
        assert!(!entry.is_expired(4_999));
        assert!(entry.is_expired(5_000));
        assert!(entry.is_expired(5_001));
    }

    #[test]
    fn touch_updates_access() {
        let mut entry = make_entry("k", 5_000);
        entry.touch(2_000);
        entry.touch(3_000);

        assert_eq!(entry.access_count, 2);
        assert_eq!(entry.last_access_ms, 3_000);
    }

    #[test]
    fn entry_roundtrip() {
        let entry = make_entry("k", 5_000);
        let bytes = entry.encode().unwrap();
        let decoded = CacheEntry::decode(&bytes).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn metadata_mirrors_entry() {
        let mut entry = make_entry("k", 5_000);
        entry.touch(2_000);

        let meta = AccessMetadata::for_entry(&entry);
        assert_eq!(meta.key, "k");
        assert_eq!(meta.access_count, 1);
        assert_eq!(meta.last_access_ms, 2_000);

        let bytes = meta.encode().unwrap();
        assert_eq!(AccessMetadata::decode(&bytes).unwrap(), meta);
    }

    #[test]
    fn eviction_score_prefers_hot_entries() {
        let now = 10 * 60_000; // 10 minutes in
        let hot = AccessMetadata {
            key: "hot".into(),
            category: "c".into(),
            priority: Priority::Normal,
            access_count: 20,
            last_access_ms: now - 60_000,
        };
        let cold = AccessMetadata {
            key: "cold".into(),
            category: "c".into(),
            priority: Priority::Normal,
            access_count: 1,
            last_access_ms: 0,
        };

        assert!(hot.eviction_score(now) > cold.eviction_score(now));
    }
}
