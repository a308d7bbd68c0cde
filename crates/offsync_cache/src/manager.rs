//! The cache manager: two-level reads, writes, eviction, and maintenance.

use crate::config::CacheConfig;
use crate::entry::{AccessMetadata, CacheEntry};
use crate::error::{CacheError, CacheResult};
use crate::stats::{CacheStats, CategoryStats, DailyStats};
use crate::transform::ValueTransform;
use offsync_store::{Clock, DurableStore, Index, IndexEntry, IndexRange, IndexValue, Priority, Table};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Freshness strategy for a read.
///
/// Strategies that involve the network (`NetworkFirst`,
/// `StaleWhileRevalidate`, `NetworkOnly`) are resolved by the
/// connectivity-aware dispatcher that owns the transport; inside the
/// cache tier they reduce to a cache lookup or the fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadStrategy {
    /// Serve from cache, fall back to the caller's fallback on a miss.
    #[default]
    CacheFirst,
    /// Network consultation is the dispatcher's job; behaves as `CacheFirst` here.
    NetworkFirst,
    /// Returns the cached value; the dispatcher triggers the background refresh.
    StaleWhileRevalidate,
    /// Always returns the fallback; this component holds no network access.
    NetworkOnly,
    /// Identical to `CacheFirst`.
    CacheOnly,
}

/// Options for a read.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Freshness strategy.
    pub strategy: ReadStrategy,
    /// Category charged for a miss.
    pub category: String,
    /// Value returned on a miss. A miss is never an error.
    pub fallback: Option<Vec<u8>>,
}

impl GetOptions {
    /// Creates options with the default strategy and category.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: ReadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the fallback value.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Vec<u8>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

/// Options for a write.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// TTL for the entry; the configured default applies when `None`.
    pub ttl: Option<Duration>,
    /// Category tag.
    pub category: String,
    /// Pass the payload through the configured transform.
    pub transform: bool,
    /// Entry priority.
    pub priority: Priority,
}

impl SetOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Requests the value transform.
    #[must_use]
    pub fn with_transform(mut self) -> Self {
        self.transform = true;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// The two-level cache tier.
///
/// Reads hit a bounded in-process fast layer first, then the durable
/// store. Writes go to both. The host instantiates one manager and
/// passes it around explicitly; there is no global instance.
///
/// Durable-layer *read* failures degrade to fast-layer-only operation
/// with a warning; *write* failures are surfaced to the caller.
pub struct CacheManager {
    config: CacheConfig,
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    transform: Option<Arc<dyn ValueTransform>>,
    fast: RwLock<HashMap<String, CacheEntry>>,
}

impl CacheManager {
    /// Creates a new cache manager over the given store and clock.
    pub fn new(config: CacheConfig, store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store,
            clock,
            transform: None,
            fast: RwLock::new(HashMap::new()),
        }
    }

    /// Installs the pluggable value transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Arc<dyn ValueTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Reads a value under the requested strategy.
    ///
    /// A miss (absent or expired) returns the options' fallback and is
    /// never an error.
    ///
    /// # Errors
    ///
    /// Returns an error only when a stored value cannot be decoded or
    /// un-transformed; never for a miss.
    pub fn get(&self, key: &str, options: GetOptions) -> CacheResult<Option<Vec<u8>>> {
        match options.strategy {
            // The dispatcher owns actual network access; everything that
            // can consult the cache reduces to cache-first here.
            ReadStrategy::CacheFirst
            | ReadStrategy::NetworkFirst
            | ReadStrategy::StaleWhileRevalidate
            | ReadStrategy::CacheOnly => self.get_cache_first(key, options),
            ReadStrategy::NetworkOnly => Ok(options.fallback),
        }
    }

    fn get_cache_first(&self, key: &str, options: GetOptions) -> CacheResult<Option<Vec<u8>>> {
        let now = self.clock.now_ms();

        // Fast layer
        {
            let mut fast = self.fast.write();
            if let Some(entry) = fast.get_mut(key) {
                if entry.is_expired(now) {
                    fast.remove(key);
                } else {
                    entry.touch(now);
                    let value = entry.value.clone();
                    let transformed = entry.transformed;
                    let meta = AccessMetadata::for_entry(entry);
                    drop(fast);

                    self.persist_metadata(&meta);
                    self.record_stats(|s| s.record_fast_hit());
                    return self.untransform(key, value, transformed).map(Some);
                }
            }
        }

        // Durable layer
        let row = match self.store.get(Table::CacheEntries, key) {
            Ok(row) => row,
            Err(e) => {
                // Degraded mode: serve fast-layer only, treat as a miss.
                warn!(key, error = %e, "durable read failed; degrading to fast layer");
                self.record_stats(|s| s.record_miss(&options.category));
                return Ok(options.fallback);
            }
        };

        if let Some(bytes) = row {
            let mut entry = CacheEntry::decode(&bytes)?;
            if !entry.is_expired(now) {
                // Fast-layer hits accumulate in the metadata row while the
                // entry row keeps its write-time counts; carry the live
                // counts into the promoted copy so eviction scoring and
                // warm-up keep seeing this key as hot.
                if let Ok(Some(meta_bytes)) = self.store.get(Table::CacheMetadata, key) {
                    if let Ok(meta) = AccessMetadata::decode(&meta_bytes) {
                        entry.access_count = entry.access_count.max(meta.access_count);
                        entry.last_access_ms = entry.last_access_ms.max(meta.last_access_ms);
                    }
                }
                entry.touch(now);
                let value = entry.value.clone();
                let transformed = entry.transformed;
                let meta = AccessMetadata::for_entry(&entry);

                self.insert_fast(entry);
                self.persist_metadata(&meta);
                self.record_stats(|s| s.record_durable_hit());
                return self.untransform(key, value, transformed).map(Some);
            }
        }

        self.record_stats(|s| s.record_miss(&options.category));
        Ok(options.fallback)
    }

    /// Writes a value to both layers.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable write or the transform fails;
    /// write failures are surfaced, not swallowed.
    pub fn set(&self, key: &str, value: Vec<u8>, options: &SetOptions) -> CacheResult<()> {
        let now = self.clock.now_ms();
        let ttl = options.ttl.unwrap_or(self.config.default_ttl);

        let (payload, transformed) = if options.transform {
            let transform = self
                .transform
                .as_ref()
                .ok_or_else(|| CacheError::MissingTransform { key: key.to_string() })?;
            (transform.encode(&value), true)
        } else {
            (value, false)
        };

        let entry = CacheEntry {
            key: key.to_string(),
            size_bytes: payload.len() as u64,
            value: payload,
            category: options.category.clone(),
            created_at_ms: now,
            expires_at_ms: now + ttl.as_millis() as u64,
            priority: options.priority,
            access_count: 0,
            last_access_ms: now,
            transformed,
        };

        self.store.put(
            Table::CacheEntries,
            key,
            entry.encode()?,
            entry.index_entries(),
        )?;

        let meta = AccessMetadata::for_entry(&entry);
        self.store
            .put(Table::CacheMetadata, key, meta.encode()?, meta.index_entries())?;

        self.record_stats(|s| s.record_set(&options.category));
        self.insert_fast(entry);
        Ok(())
    }

    /// Removes a key from both layers and the metadata. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable delete fails.
    pub fn delete(&self, key: &str) -> CacheResult<()> {
        self.fast.write().remove(key);
        self.store.delete(Table::CacheEntries, key)?;
        self.store.delete(Table::CacheMetadata, key)?;
        Ok(())
    }

    /// Deletes expired durable entries from every layer.
    ///
    /// Lazy expiry on read holds regardless of when this sweep runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the sweep cannot read or delete rows.
    pub fn cleanup_expired(&self) -> CacheResult<usize> {
        let now = self.clock.now_ms();
        let expired = self.store.scan_index(
            Table::CacheEntries,
            Index::Expiry,
            IndexRange::AtMost(IndexValue::Unsigned(now)),
        )?;

        for key in &expired {
            self.fast.write().remove(key);
            self.store.delete(Table::CacheEntries, key)?;
            self.store.delete(Table::CacheMetadata, key)?;
        }

        if !expired.is_empty() {
            debug!(count = expired.len(), "expired cache entries swept");
        }
        Ok(expired.len())
    }

    /// Evicts low-scoring durable entries until the store is back under
    /// its byte budget (minus the configured headroom).
    ///
    /// Entries are ranked by `0.7 * access_count - 0.3 * age`, lowest
    /// score evicted first, from durable layer, fast layer, and metadata
    /// together.
    ///
    /// # Errors
    ///
    /// Returns an error on store failure.
    pub fn enforce_budget(&self) -> CacheResult<usize> {
        let now = self.clock.now_ms();

        let mut sizes: HashMap<String, u64> = HashMap::new();
        let mut total: u64 = 0;
        for (key, bytes) in self.store.scan(Table::CacheEntries)? {
            let entry = CacheEntry::decode(&bytes)?;
            sizes.insert(key, entry.size_bytes);
            total += entry.size_bytes;
        }

        if total <= self.config.durable_budget_bytes {
            return Ok(0);
        }

        let target = self
            .config
            .durable_budget_bytes
            .saturating_sub(self.config.eviction_headroom_bytes);

        let mut candidates: Vec<AccessMetadata> = Vec::new();
        for (_, bytes) in self.store.scan(Table::CacheMetadata)? {
            candidates.push(AccessMetadata::decode(&bytes)?);
        }
        candidates.sort_by(|a, b| {
            a.eviction_score(now)
                .partial_cmp(&b.eviction_score(now))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut evicted = 0;
        for meta in candidates {
            if total <= target {
                break;
            }
            let size = sizes.get(&meta.key).copied().unwrap_or(0);
            self.fast.write().remove(&meta.key);
            self.store.delete(Table::CacheEntries, &meta.key)?;
            self.store.delete(Table::CacheMetadata, &meta.key)?;
            total = total.saturating_sub(size);
            evicted += 1;
        }

        info!(evicted, total_bytes = total, "durable cache evicted to budget");
        Ok(evicted)
    }

    /// Runs the periodic maintenance pass: expiry sweep, then budget
    /// enforcement. Returns `(expired, evicted)` counts.
    ///
    /// # Errors
    ///
    /// Returns the first store error encountered.
    pub fn run_maintenance(&self) -> CacheResult<(usize, usize)> {
        let expired = self.cleanup_expired()?;
        let evicted = self.enforce_budget()?;
        Ok((expired, evicted))
    }

    /// Pre-populates the fast layer with the most-accessed unexpired
    /// entries, up to half its capacity.
    ///
    /// Purely a startup optimization; correctness never depends on it.
    ///
    /// # Errors
    ///
    /// Returns an error on store failure.
    pub fn warm_up(&self) -> CacheResult<usize> {
        let now = self.clock.now_ms();
        let budget = self.config.fast_capacity / 2;

        let mut candidates: Vec<AccessMetadata> = Vec::new();
        for (_, bytes) in self.store.scan(Table::CacheMetadata)? {
            candidates.push(AccessMetadata::decode(&bytes)?);
        }
        candidates.sort_by(|a, b| b.access_count.cmp(&a.access_count));

        let mut warmed = 0;
        for meta in candidates {
            if warmed >= budget {
                break;
            }
            let Some(bytes) = self.store.get(Table::CacheEntries, &meta.key)? else {
                continue;
            };
            let mut entry = CacheEntry::decode(&bytes)?;
            if entry.is_expired(now) {
                continue;
            }
            // Carry scoring data into the fast copy.
            entry.access_count = meta.access_count;
            entry.last_access_ms = meta.last_access_ms;
            self.insert_fast(entry);
            warmed += 1;
        }

        debug!(warmed, "fast layer warmed up");
        Ok(warmed)
    }

    /// Returns aggregate statistics across all recorded days.
    ///
    /// # Errors
    ///
    /// Returns an error on store failure.
    pub fn stats(&self) -> CacheResult<CacheStats> {
        let mut stats = CacheStats {
            fast_count: self.fast.read().len(),
            ..CacheStats::default()
        };

        for (_, bytes) in self.store.scan(Table::CacheEntries)? {
            let entry = CacheEntry::decode(&bytes)?;
            stats.item_count += 1;
            stats.total_size_bytes += entry.size_bytes;
            let cat = stats.categories.entry(entry.category).or_insert_with(CategoryStats::default);
            cat.count += 1;
            cat.size_bytes += entry.size_bytes;
        }

        let mut hits = 0u64;
        let mut misses = 0u64;
        for (_, bytes) in self.store.scan(Table::DailyStats)? {
            let day = DailyStats::decode(&bytes)?;
            hits += day.hits();
            misses += day.total_misses();
        }
        if hits + misses > 0 {
            stats.hit_rate = hits as f64 / (hits + misses) as f64;
        }

        Ok(stats)
    }

    /// Clears the cache, optionally scoped to one category.
    ///
    /// Daily statistics are append-only and are not reset.
    ///
    /// # Errors
    ///
    /// Returns an error on store failure.
    pub fn clear(&self, category: Option<&str>) -> CacheResult<()> {
        match category {
            None => {
                self.fast.write().clear();
                self.store.clear(Table::CacheEntries)?;
                self.store.clear(Table::CacheMetadata)?;
            }
            Some(cat) => {
                let keys = self.store.scan_index(
                    Table::CacheEntries,
                    Index::Category,
                    IndexRange::Equals(IndexValue::Text(cat.to_string())),
                )?;
                for key in keys {
                    self.store.delete(Table::CacheEntries, &key)?;
                    self.store.delete(Table::CacheMetadata, &key)?;
                }
                self.fast.write().retain(|_, e| e.category != cat);
            }
        }
        Ok(())
    }

    /// Inserts into the fast layer, evicting the least-recently-accessed
    /// entry if the layer is full. The durable layer is never touched.
    fn insert_fast(&self, entry: CacheEntry) {
        let mut fast = self.fast.write();
        if !fast.contains_key(&entry.key) && fast.len() >= self.config.fast_capacity {
            if let Some(lru_key) = fast
                .values()
                .min_by_key(|e| e.last_access_ms)
                .map(|e| e.key.clone())
            {
                fast.remove(&lru_key);
            }
        }
        fast.insert(entry.key.clone(), entry);
    }

    fn untransform(
        &self,
        key: &str,
        value: Vec<u8>,
        transformed: bool,
    ) -> CacheResult<Vec<u8>> {
        if !transformed {
            return Ok(value);
        }
        let transform = self
            .transform
            .as_ref()
            .ok_or_else(|| CacheError::MissingTransform { key: key.to_string() })?;
        transform.decode(&value)
    }

    /// Applies an increment to today's stats row.
    ///
    /// Stats are best-effort; a store failure here is logged and never
    /// fails the read that triggered it.
    fn record_stats<F: FnOnce(&mut DailyStats)>(&self, f: F) {
        let day = DailyStats::day_for(self.clock.now_ms());
        let key = day.to_string();

        let result = (|| -> CacheResult<()> {
            let mut stats = match self.store.get(Table::DailyStats, &key)? {
                Some(bytes) => DailyStats::decode(&bytes)?,
                None => DailyStats::new(day),
            };
            f(&mut stats);
            self.store.put(
                Table::DailyStats,
                &key,
                stats.encode()?,
                vec![IndexEntry::new(Index::Timestamp, day)],
            )?;
            Ok(())
        })();

        if let Err(e) = result {
            debug!(error = %e, "daily stats update skipped");
        }
    }

    fn persist_metadata(&self, meta: &AccessMetadata) {
        let result = (|| -> CacheResult<()> {
            self.store.put(
                Table::CacheMetadata,
                &meta.key,
                meta.encode()?,
                meta.index_entries(),
            )?;
            Ok(())
        })();

        if let Err(e) = result {
            debug!(key = %meta.key, error = %e, "access metadata update skipped");
        }
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("fast_count", &self.fast.read().len())
            .field("fast_capacity", &self.config.fast_capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offsync_store::{ManualClock, MemoryStore};

    fn make_cache(config: CacheConfig) -> (CacheManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = CacheManager::new(config, Arc::new(MemoryStore::new()), clock.clone());
        (cache, clock)
    }

    fn opts() -> GetOptions {
        GetOptions::new().with_category("test")
    }

    #[test]
    fn set_then_get_roundtrip() {
        let (cache, _) = make_cache(CacheConfig::default());
        cache
            .set("k", b"value".to_vec(), &SetOptions::new().with_category("test"))
            .unwrap();

        let got = cache.get("k", opts()).unwrap();
        assert_eq!(got, Some(b"value".to_vec()));
    }

    #[test]
    fn miss_returns_fallback_without_error() {
        let (cache, _) = make_cache(CacheConfig::default());

        let got = cache
            .get("absent", opts().with_fallback(b"default".to_vec()))
            .unwrap();
        assert_eq!(got, Some(b"default".to_vec()));

        let got = cache.get("absent", opts()).unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn expired_entry_is_logically_absent() {
        let (cache, clock) = make_cache(CacheConfig::default());
        cache
            .set(
                "k",
                b"v".to_vec(),
                &SetOptions::new().with_ttl(Duration::from_secs(10)),
            )
            .unwrap();

        clock.advance(9_999);
        assert_eq!(cache.get("k", opts()).unwrap(), Some(b"v".to_vec()));

        clock.advance(1);
        // Expired but not yet swept: still a miss.
        assert_eq!(
            cache.get("k", opts().with_fallback(b"fb".to_vec())).unwrap(),
            Some(b"fb".to_vec())
        );
    }

    #[test]
    fn network_only_always_returns_fallback() {
        let (cache, _) = make_cache(CacheConfig::default());
        cache.set("k", b"v".to_vec(), &SetOptions::new()).unwrap();

        let got = cache
            .get(
                "k",
                opts()
                    .with_strategy(ReadStrategy::NetworkOnly)
                    .with_fallback(b"fb".to_vec()),
            )
            .unwrap();
        assert_eq!(got, Some(b"fb".to_vec()));
    }

    #[test]
    fn strategies_that_consult_cache_hit() {
        let (cache, _) = make_cache(CacheConfig::default());
        cache.set("k", b"v".to_vec(), &SetOptions::new()).unwrap();

        for strategy in [
            ReadStrategy::CacheFirst,
            ReadStrategy::NetworkFirst,
            ReadStrategy::StaleWhileRevalidate,
            ReadStrategy::CacheOnly,
        ] {
            let got = cache.get("k", opts().with_strategy(strategy)).unwrap();
            assert_eq!(got, Some(b"v".to_vec()), "{strategy:?}");
        }
    }

    #[test]
    fn delete_is_idempotent() {
        let (cache, _) = make_cache(CacheConfig::default());
        cache.set("k", b"v".to_vec(), &SetOptions::new()).unwrap();

        cache.delete("k").unwrap();
        assert_eq!(cache.get("k", opts()).unwrap(), None);
        cache.delete("k").unwrap();
    }

    #[test]
    fn fast_layer_lru_eviction() {
        let (cache, clock) = make_cache(CacheConfig::default().with_fast_capacity(2));

        cache.set("a", b"1".to_vec(), &SetOptions::new()).unwrap();
        clock.advance(10);
        cache.set("b", b"2".to_vec(), &SetOptions::new()).unwrap();
        clock.advance(10);

        // Touch "a" so "b" becomes the LRU entry.
        cache.get("a", opts()).unwrap();
        clock.advance(10);

        cache.set("c", b"3".to_vec(), &SetOptions::new()).unwrap();

        let fast = cache.fast.read();
        assert!(fast.contains_key("a"));
        assert!(!fast.contains_key("b"), "LRU entry should be evicted");
        assert!(fast.contains_key("c"));
        drop(fast);

        // Durable layer untouched: "b" still readable (via promotion).
        assert_eq!(cache.get("b", opts()).unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn durable_promotion_keeps_accumulated_access_count() {
        let (cache, clock) = make_cache(CacheConfig::default().with_fast_capacity(1));
        cache.set("hot", b"v".to_vec(), &SetOptions::new()).unwrap();

        for _ in 0..5 {
            clock.advance(1);
            cache.get("hot", opts()).unwrap();
        }

        // Push "hot" out of the fast layer, then read it back through
        // the durable layer.
        clock.advance(1);
        cache.set("other", b"v".to_vec(), &SetOptions::new()).unwrap();
        assert!(!cache.fast.read().contains_key("hot"));
        clock.advance(1);
        assert_eq!(cache.get("hot", opts()).unwrap(), Some(b"v".to_vec()));

        // The promotion continues the count the fast-layer hits built up
        // instead of restarting from the entry row's write-time value.
        let bytes = cache
            .store
            .get(Table::CacheMetadata, "hot")
            .unwrap()
            .unwrap();
        let meta = AccessMetadata::decode(&bytes).unwrap();
        assert_eq!(meta.access_count, 6);
        assert_eq!(cache.fast.read()["hot"].access_count, 6);
    }

    #[test]
    fn durable_hit_promotes_to_fast_layer() {
        let (cache, _) = make_cache(CacheConfig::default());
        cache.set("k", b"v".to_vec(), &SetOptions::new()).unwrap();

        cache.fast.write().clear();
        assert_eq!(cache.get("k", opts()).unwrap(), Some(b"v".to_vec()));
        assert!(cache.fast.read().contains_key("k"));
    }

    #[test]
    fn cleanup_sweeps_expired_entries() {
        let (cache, clock) = make_cache(CacheConfig::default());
        cache
            .set("short", b"1".to_vec(), &SetOptions::new().with_ttl(Duration::from_secs(1)))
            .unwrap();
        cache
            .set("long", b"2".to_vec(), &SetOptions::new().with_ttl(Duration::from_secs(100)))
            .unwrap();

        clock.advance(2_000);
        let swept = cache.cleanup_expired().unwrap();
        assert_eq!(swept, 1);

        assert_eq!(cache.stats().unwrap().item_count, 1);
        assert_eq!(cache.get("long", opts()).unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn budget_eviction_removes_lowest_scoring_entries() {
        let (cache, clock) = make_cache(
            CacheConfig::default()
                .with_durable_budget(25)
                .with_eviction_headroom(5),
        );

        // 3 entries of 10 bytes each = 30 bytes, over the 25-byte budget.
        for key in ["cold", "warm", "hot"] {
            cache
                .set(key, vec![0u8; 10], &SetOptions::new())
                .unwrap();
        }

        // Build up access counts: hot read 5 times, warm twice, cold never.
        for _ in 0..5 {
            cache.get("hot", opts()).unwrap();
        }
        for _ in 0..2 {
            cache.get("warm", opts()).unwrap();
        }
        clock.advance(60_000);

        let evicted = cache.enforce_budget().unwrap();
        // Target is 25 - 5 = 20 bytes, so exactly one entry goes.
        assert_eq!(evicted, 1);
        assert_eq!(cache.get("cold", opts()).unwrap(), None);
        assert_eq!(cache.get("hot", opts()).unwrap(), Some(vec![0u8; 10]));
    }

    #[test]
    fn warm_up_loads_hottest_entries() {
        let (cache, _) = make_cache(CacheConfig::default().with_fast_capacity(4));

        for key in ["a", "b", "c"] {
            cache.set(key, b"v".to_vec(), &SetOptions::new()).unwrap();
        }
        for _ in 0..3 {
            cache.get("b", opts()).unwrap();
        }

        cache.fast.write().clear();
        let warmed = cache.warm_up().unwrap();
        // Half of capacity 4 = up to 2 entries.
        assert_eq!(warmed, 2);
        assert!(cache.fast.read().contains_key("b"));
    }

    #[test]
    fn stats_aggregate_hits_and_misses() {
        let (cache, _) = make_cache(CacheConfig::default());
        cache
            .set("k", vec![0u8; 8], &SetOptions::new().with_category("products"))
            .unwrap();

        cache.get("k", opts()).unwrap(); // hit
        cache.get("missing", opts()).unwrap(); // miss

        let stats = cache.stats().unwrap();
        assert_eq!(stats.item_count, 1);
        assert_eq!(stats.total_size_bytes, 8);
        assert_eq!(stats.fast_count, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(stats.categories["products"].count, 1);
        assert_eq!(stats.categories["products"].size_bytes, 8);
    }

    #[test]
    fn clear_scoped_to_category() {
        let (cache, _) = make_cache(CacheConfig::default());
        cache
            .set("p", b"1".to_vec(), &SetOptions::new().with_category("products"))
            .unwrap();
        cache
            .set("c", b"2".to_vec(), &SetOptions::new().with_category("cart"))
            .unwrap();

        cache.clear(Some("products")).unwrap();
        assert_eq!(cache.get("p", opts()).unwrap(), None);
        assert_eq!(cache.get("c", opts()).unwrap(), Some(b"2".to_vec()));

        cache.clear(None).unwrap();
        assert_eq!(cache.get("c", opts()).unwrap(), None);
        assert_eq!(cache.stats().unwrap().item_count, 0);
    }

    #[test]
    fn transform_applied_and_inverted() {
        use crate::transform::testing::MarkerTransform;

        let clock = Arc::new(ManualClock::new(1_000));
        let cache = CacheManager::new(
            CacheConfig::default(),
            Arc::new(MemoryStore::new()),
            clock,
        )
        .with_transform(Arc::new(MarkerTransform));

        cache
            .set("k", b"raw".to_vec(), &SetOptions::new().with_transform())
            .unwrap();

        // Stored payload differs from the logical value.
        let stored = cache.fast.read().get("k").unwrap().value.clone();
        assert_ne!(stored, b"raw".to_vec());

        assert_eq!(cache.get("k", opts()).unwrap(), Some(b"raw".to_vec()));
    }

    #[test]
    fn durable_read_failure_degrades_to_fast_layer() {
        use offsync_store::StoreError;
        use std::sync::atomic::{AtomicBool, Ordering};

        /// Delegates to a `MemoryStore` but fails every read on demand.
        struct FlakyStore {
            inner: MemoryStore,
            fail_reads: AtomicBool,
        }

        impl DurableStore for FlakyStore {
            fn get(&self, table: Table, key: &str) -> offsync_store::StoreResult<Option<Vec<u8>>> {
                if self.fail_reads.load(Ordering::SeqCst) {
                    return Err(StoreError::codec("simulated read failure"));
                }
                self.inner.get(table, key)
            }

            fn put(
                &self,
                table: Table,
                key: &str,
                value: Vec<u8>,
                indexes: Vec<IndexEntry>,
            ) -> offsync_store::StoreResult<()> {
                self.inner.put(table, key, value, indexes)
            }

            fn delete(&self, table: Table, key: &str) -> offsync_store::StoreResult<()> {
                self.inner.delete(table, key)
            }

            fn scan(&self, table: Table) -> offsync_store::StoreResult<Vec<(String, Vec<u8>)>> {
                self.inner.scan(table)
            }

            fn scan_index(
                &self,
                table: Table,
                index: Index,
                range: IndexRange,
            ) -> offsync_store::StoreResult<Vec<String>> {
                self.inner.scan_index(table, index, range)
            }

            fn count(&self, table: Table) -> offsync_store::StoreResult<usize> {
                self.inner.count(table)
            }

            fn clear(&self, table: Table) -> offsync_store::StoreResult<()> {
                self.inner.clear(table)
            }
        }

        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_reads: AtomicBool::new(false),
        });
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = CacheManager::new(CacheConfig::default(), store.clone(), clock);
        cache.set("k", b"v".to_vec(), &SetOptions::new()).unwrap();

        store.fail_reads.store(true, Ordering::SeqCst);

        // A failing durable read is a miss, never an error.
        let got = cache
            .get("missing", opts().with_fallback(b"fb".to_vec()))
            .unwrap();
        assert_eq!(got, Some(b"fb".to_vec()));

        // The fast layer keeps serving its copy.
        assert_eq!(cache.get("k", opts()).unwrap(), Some(b"v".to_vec()));

        // Without the fast copy the key degrades to a miss too.
        cache.fast.write().clear();
        assert_eq!(cache.get("k", opts()).unwrap(), None);

        // Durable reads recover once the store does.
        store.fail_reads.store(false, Ordering::SeqCst);
        assert_eq!(cache.get("k", opts()).unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn transform_requested_without_transform_errors() {
        let (cache, _) = make_cache(CacheConfig::default());
        let result = cache.set("k", b"v".to_vec(), &SetOptions::new().with_transform());
        assert!(matches!(result, Err(CacheError::MissingTransform { .. })));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn fast_layer_never_exceeds_capacity(
            ops in prop::collection::vec((0u8..8, any::<bool>()), 1..64),
            capacity in 1usize..6,
        ) {
            let (cache, clock) = make_cache(CacheConfig::default().with_fast_capacity(capacity));

            for (key, is_get) in ops {
                let key = format!("k{key}");
                clock.advance(1);
                if is_get {
                    cache.get(&key, opts()).unwrap();
                } else {
                    cache.set(&key, b"v".to_vec(), &SetOptions::new()).unwrap();
                }
                prop_assert!(cache.fast.read().len() <= capacity);
            }
        }

        #[test]
        fn most_recently_touched_key_survives_eviction(
            ops in prop::collection::vec(0u8..8, 2..64),
            capacity in 1usize..6,
        ) {
            let (cache, clock) = make_cache(CacheConfig::default().with_fast_capacity(capacity));

            for key in ops.iter() {
                let key = format!("k{key}");
                clock.advance(1);
                cache.set(&key, b"v".to_vec(), &SetOptions::new()).unwrap();
                // Timestamps are strictly increasing, so the key written
                // last is always the most recently used and must never be
                // the one evicted.
                prop_assert!(cache.fast.read().contains_key(&key));
            }
        }
    }
}
