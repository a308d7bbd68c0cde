//! # OffSync Queue
//!
//! Durable sync queue for offline-first hosts.
//!
//! This crate provides:
//! - A persistent, prioritized queue of pending remote mutations
//! - Bounded retry with per-item scheduling
//! - Connectivity-aware draining (manual, opportunistic, and periodic)
//! - An event feed for observers
//! - History and minimal conflict bookkeeping
//!
//! ## Key Invariants
//!
//! - Enqueued items survive restarts (the queue is durable)
//! - Higher priority drains first; ties drain in enqueue order
//! - An always-failing item is attempted exactly `max_retries` times,
//!   then parks as `Failed` with exactly one history record
//! - At most one drain pass runs at a time
//! - Item failures never abort a drain pass

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod config;
mod error;
mod events;
mod history;
mod item;
mod queue;
mod transport;

pub use action::SyncAction;
pub use config::QueueConfig;
pub use error::{QueueError, QueueResult};
pub use events::{EventFeed, QueueEvent, SubscriberId};
pub use history::{ConflictRecord, HistoryRecord};
pub use item::{ItemStatus, QueueItem};
pub use queue::{AddOptions, DrainReport, QueueStatus, SyncQueue};
pub use transport::{
    Connectivity, MockOutcome, MockTransport, SharedConnectivity, SyncTransport,
};

pub use offsync_store::Priority;
