//! Daily counters and aggregate cache statistics.

use crate::entry::{decode, encode};
use crate::error::CacheResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Milliseconds per UTC day.
const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// One day's worth of cache counters.
///
/// Rows are keyed by UTC day index and only ever incremented; a day's
/// record is never rewritten retroactively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    /// Days since the Unix epoch (UTC).
    pub day: u64,
    /// Hits served from the fast layer.
    pub fast_hits: u64,
    /// Hits served from the durable layer.
    pub durable_hits: u64,
    /// Misses per category.
    pub misses: BTreeMap<String, u64>,
    /// Sets per category.
    pub sets: BTreeMap<String, u64>,
    /// Total recorded operations (hits + misses + sets).
    pub total: u64,
}

impl DailyStats {
    /// Creates an empty record for the given day.
    #[must_use]
    pub fn new(day: u64) -> Self {
        Self {
            day,
            ..Self::default()
        }
    }

    /// The UTC day index for a timestamp.
    pub fn day_for(now_ms: u64) -> u64 {
        now_ms / DAY_MS
    }

    /// Total hits across both layers.
    pub fn hits(&self) -> u64 {
        self.fast_hits + self.durable_hits
    }

    /// Total misses across all categories.
    pub fn total_misses(&self) -> u64 {
        self.misses.values().sum()
    }

    /// Records a fast-layer hit.
    pub fn record_fast_hit(&mut self) {
        self.fast_hits += 1;
        self.total += 1;
    }

    /// Records a durable-layer hit.
    pub fn record_durable_hit(&mut self) {
        self.durable_hits += 1;
        self.total += 1;
    }

    /// Records a miss in a category.
    pub fn record_miss(&mut self, category: &str) {
        *self.misses.entry(category.to_string()).or_default() += 1;
        self.total += 1;
    }

    /// Records a set in a category.
    pub fn record_set(&mut self, category: &str) {
        *self.sets.entry(category.to_string()).or_default() += 1;
        self.total += 1;
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

/// Per-category breakdown inside [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStats {
    /// Number of durable entries in the category.
    pub count: usize,
    /// Total estimated bytes in the category.
    pub size_bytes: u64,
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Total estimated bytes across durable entries.
    pub total_size_bytes: u64,
    /// Number of durable entries.
    pub item_count: usize,
    /// Number of fast-layer entries.
    pub fast_count: usize,
    /// `hits / (hits + misses)` across all recorded days; 0.0 with no traffic.
    pub hit_rate: f64,
    /// Per-category counts and sizes.
    pub categories: BTreeMap<String, CategoryStats>,
}
