//! Integration tests for the cache tier over real stores.

use offsync_cache::{
    CacheConfig, CacheManager, GetOptions, Priority, ReadStrategy, SetOptions,
};
use offsync_store::{Clock, FileStore, ManualClock, MemoryStore};
use std::sync::Arc;
use std::time::Duration;

fn make_cache() -> (CacheManager, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000));
    let cache = CacheManager::new(
        CacheConfig::default(),
        Arc::new(MemoryStore::new()),
        Arc::clone(&clock) as Arc<dyn Clock>,
    );
    (cache, clock)
}

fn opts() -> GetOptions {
    GetOptions::new().with_category("test")
}

#[test]
fn cache_first_lifecycle() {
    let (cache, clock) = make_cache();

    cache
        .set(
            "user:1",
            b"alice".to_vec(),
            &SetOptions::new()
                .with_category("users")
                .with_ttl(Duration::from_secs(60))
                .with_priority(Priority::High),
        )
        .unwrap();

    assert_eq!(cache.get("user:1", opts()).unwrap(), Some(b"alice".to_vec()));

    // Still fresh just before the TTL boundary.
    clock.advance(59_999);
    assert_eq!(cache.get("user:1", opts()).unwrap(), Some(b"alice".to_vec()));

    // Exactly at the boundary the entry is logically absent.
    clock.advance(1);
    assert_eq!(
        cache
            .get("user:1", opts().with_fallback(b"anon".to_vec()))
            .unwrap(),
        Some(b"anon".to_vec())
    );
}

#[test]
fn cache_survives_store_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let clock = Arc::new(ManualClock::new(1_000));

    {
        let store = Arc::new(FileStore::open(&path).unwrap());
        let cache = CacheManager::new(
            CacheConfig::default(),
            store,
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        cache
            .set("k", b"persisted".to_vec(), &SetOptions::new())
            .unwrap();
    }

    // A fresh manager over a reopened store sees the durable entry.
    let store = Arc::new(FileStore::open(&path).unwrap());
    let cache = CacheManager::new(
        CacheConfig::default(),
        store,
        Arc::clone(&clock) as Arc<dyn Clock>,
    );
    assert_eq!(cache.get("k", opts()).unwrap(), Some(b"persisted".to_vec()));
}

#[test]
fn warm_up_after_reopen_restores_hot_set() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let clock = Arc::new(ManualClock::new(1_000));
    let config = CacheConfig::default().with_fast_capacity(4);

    {
        let store = Arc::new(FileStore::open(&path).unwrap());
        let cache = CacheManager::new(
            config.clone(),
            store,
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        for key in ["a", "b", "c", "d"] {
            cache.set(key, b"v".to_vec(), &SetOptions::new()).unwrap();
        }
        for _ in 0..5 {
            cache.get("c", opts()).unwrap();
        }
    }

    let store = Arc::new(FileStore::open(&path).unwrap());
    let cache = CacheManager::new(config, store, Arc::clone(&clock) as Arc<dyn Clock>);
    let warmed = cache.warm_up().unwrap();
    assert_eq!(warmed, 2);
    // The hottest key is served without a durable round trip being required.
    assert_eq!(cache.get("c", opts()).unwrap(), Some(b"v".to_vec()));
}

#[test]
fn maintenance_sweeps_and_evicts() {
    let clock = Arc::new(ManualClock::new(1_000));
    let cache = CacheManager::new(
        CacheConfig::default()
            .with_durable_budget(64)
            .with_eviction_headroom(16),
        Arc::new(MemoryStore::new()),
        Arc::clone(&clock) as Arc<dyn Clock>,
    );

    cache
        .set(
            "ephemeral",
            vec![0u8; 16],
            &SetOptions::new().with_ttl(Duration::from_secs(1)),
        )
        .unwrap();
    for key in ["a", "b", "c", "d"] {
        cache
            .set(key, vec![0u8; 16], &SetOptions::new().with_ttl(Duration::from_secs(3_600)))
            .unwrap();
    }
    for _ in 0..3 {
        cache.get("a", opts()).unwrap();
        cache.get("b", opts()).unwrap();
    }

    clock.advance(2_000);
    let (expired, evicted) = cache.run_maintenance().unwrap();
    assert_eq!(expired, 1);
    // 64 bytes remain against a 64-byte budget after the sweep, so no
    // eviction is owed yet.
    assert_eq!(evicted, 0);

    cache
        .set("e", vec![0u8; 16], &SetOptions::new().with_ttl(Duration::from_secs(3_600)))
        .unwrap();
    let (_, evicted) = cache.run_maintenance().unwrap();
    // 80 bytes over a 64-byte budget: evict cold entries down to 48.
    assert_eq!(evicted, 2);
    assert_eq!(cache.get("a", opts()).unwrap(), Some(vec![0u8; 16]));
    assert_eq!(cache.get("b", opts()).unwrap(), Some(vec![0u8; 16]));

    let stats = cache.stats().unwrap();
    assert_eq!(stats.item_count, 3);
    assert!(stats.total_size_bytes <= 48);
}

#[test]
fn network_only_bypasses_populated_cache() {
    let (cache, _) = make_cache();
    cache.set("k", b"cached".to_vec(), &SetOptions::new()).unwrap();

    let got = cache
        .get(
            "k",
            opts()
                .with_strategy(ReadStrategy::NetworkOnly)
                .with_fallback(b"fresh".to_vec()),
        )
        .unwrap();
    assert_eq!(got, Some(b"fresh".to_vec()));
}

#[test]
fn category_clear_leaves_other_categories() {
    let (cache, _) = make_cache();
    cache
        .set("p:1", b"1".to_vec(), &SetOptions::new().with_category("products"))
        .unwrap();
    cache
        .set("p:2", b"2".to_vec(), &SetOptions::new().with_category("products"))
        .unwrap();
    cache
        .set("o:1", b"3".to_vec(), &SetOptions::new().with_category("orders"))
        .unwrap();

    cache.clear(Some("products")).unwrap();

    let stats = cache.stats().unwrap();
    assert_eq!(stats.item_count, 1);
    assert!(stats.categories.contains_key("orders"));
    assert!(!stats.categories.contains_key("products"));
}

#[test]
fn stats_track_hit_rate_per_day() {
    let (cache, _) = make_cache();
    cache.set("k", b"v".to_vec(), &SetOptions::new()).unwrap();

    for _ in 0..3 {
        cache.get("k", opts()).unwrap();
    }
    cache.get("missing", opts()).unwrap();

    let stats = cache.stats().unwrap();
    assert!((stats.hit_rate - 0.75).abs() < f64::EPSILON);
}
