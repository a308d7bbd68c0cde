//! # Offsync Store
//!
//! Durable key-value store with secondary indexes for the offsync engine.
//!
//! This crate provides:
//! - The [`DurableStore`] trait: typed tables, opaque row payloads,
//!   secondary indexes on expiry/category/timestamp/priority/status
//! - [`MemoryStore`] for tests and fast-layer-only operation
//! - [`FileStore`] for persistence across process restarts
//! - The [`Clock`] abstraction shared by the cache and queue crates
//!
//! The store is an **opaque row store**: rows are CBOR blobs produced by
//! the cache and queue crates. The store only understands keys and index
//! postings, never row contents.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod error;
mod file;
mod memory;
mod state;
mod store;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::DurableStore;
pub use types::{Index, IndexEntry, IndexRange, IndexValue, Priority, Table};
