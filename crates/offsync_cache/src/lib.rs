//! # Offsync Cache
//!
//! Two-level read cache for the offsync engine.
//!
//! This crate provides:
//! - A bounded in-process fast layer mirrored over the durable store
//! - TTL expiry (lazy on read, swept periodically)
//! - LRU eviction in the fast layer, score-based eviction in the durable
//!   layer under a byte budget
//! - Five read strategies (`cache-first`, `network-first`,
//!   `stale-while-revalidate`, `network-only`, `cache-only`)
//! - Per-category daily statistics
//!
//! ## Key Invariants
//!
//! - An expired entry is logically absent even before the sweep runs
//! - A read miss is never an error; the caller's fallback is returned
//! - Fast-layer eviction never touches the durable layer
//! - Daily statistics are increment-only, never rewritten

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod entry;
mod error;
mod manager;
mod stats;
mod transform;

pub use config::CacheConfig;
pub use entry::{AccessMetadata, CacheEntry};
pub use error::{CacheError, CacheResult};
pub use manager::{CacheManager, GetOptions, ReadStrategy, SetOptions};
pub use stats::{CacheStats, CategoryStats, DailyStats};
pub use transform::ValueTransform;

pub use offsync_store::Priority;
