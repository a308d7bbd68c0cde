//! Cache tier configuration.

use std::time::Duration;

/// Configuration for the cache tier.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied when a `set` does not specify one.
    pub default_ttl: Duration,

    /// Maximum number of entries held in the fast layer.
    pub fast_capacity: usize,

    /// Byte budget for the durable layer.
    pub durable_budget_bytes: u64,

    /// Extra bytes reclaimed below the budget when eviction runs, so
    /// back-to-back inserts don't re-trigger it immediately.
    pub eviction_headroom_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(60 * 60), // 1 hour
            fast_capacity: 100,
            durable_budget_bytes: 50 * 1024 * 1024, // 50 MB
            eviction_headroom_bytes: 5 * 1024 * 1024,
        }
    }
}

impl CacheConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default TTL.
    #[must_use]
    pub const fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the fast-layer capacity.
    #[must_use]
    pub const fn with_fast_capacity(mut self, capacity: usize) -> Self {
        self.fast_capacity = capacity;
        self
    }

    /// Sets the durable-layer byte budget.
    #[must_use]
    pub const fn with_durable_budget(mut self, bytes: u64) -> Self {
        self.durable_budget_bytes = bytes;
        self
    }

    /// Sets the eviction headroom.
    #[must_use]
    pub const fn with_eviction_headroom(mut self, bytes: u64) -> Self {
        self.eviction_headroom_bytes = bytes;
        self
    }
}
