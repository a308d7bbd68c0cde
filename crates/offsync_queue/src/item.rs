//! Persistent queue items.

use crate::action::SyncAction;
use crate::error::{QueueError, QueueResult};
use offsync_store::{Index, IndexEntry, Priority};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Lifecycle state of a queue item.
///
/// `Completed` never appears in the queue table: completed items are
/// deleted on delivery and live on only as history records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Waiting for delivery (or for its retry delay to elapse).
    Pending,
    /// A drain pass is currently delivering this item.
    Processing,
    /// Delivered.
    Completed,
    /// Retries exhausted; parked until the host intervenes.
    Failed,
}

impl ItemStatus {
    /// Stable code used for the status index.
    pub fn code(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Processing => "processing",
            ItemStatus::Completed => "completed",
            ItemStatus::Failed => "failed",
        }
    }
}

/// A durable queue entry for one pending mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Unique item id.
    pub id: Uuid,
    /// The mutation to deliver.
    pub action: SyncAction,
    /// Drain priority.
    pub priority: Priority,
    /// Enqueue time in milliseconds; the tiebreaker within a priority.
    pub enqueued_at_ms: u64,
    /// Attempts made so far.
    pub retries: u32,
    /// Lifecycle state.
    pub status: ItemStatus,
    /// Message from the most recent failed attempt.
    pub last_error: Option<String>,
    /// Earliest time the next attempt may run.
    pub next_retry_at_ms: u64,
    /// Host-supplied labels, carried opaquely.
    pub metadata: BTreeMap<String, String>,
    /// Items that must leave the queue before this one is eligible.
    pub dependencies: Vec<Uuid>,
}

impl QueueItem {
    /// Creates a fresh pending item enqueued at `now_ms`.
    pub fn new(action: SyncAction, priority: Priority, now_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            priority,
            enqueued_at_ms: now_ms,
            retries: 0,
            status: ItemStatus::Pending,
            last_error: None,
            next_retry_at_ms: now_ms,
            metadata: BTreeMap::new(),
            dependencies: Vec::new(),
        }
    }

    /// Returns true if this item is due for an attempt at `now_ms`,
    /// ignoring dependencies (the queue checks those against the table).
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.status == ItemStatus::Pending && self.next_retry_at_ms <= now_ms
    }

    /// Index postings for this item.
    pub fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::new(Index::Status, self.status.code()),
            IndexEntry::new(Index::Priority, self.priority.rank()),
            IndexEntry::new(Index::Timestamp, self.enqueued_at_ms),
        ]
    }

    /// Serializes the item for storage.
    pub fn encode(&self) -> QueueResult<Vec<u8>> {
        encode(self)
    }

    /// Deserializes an item from storage.
    pub fn decode(bytes: &[u8]) -> QueueResult<Self> {
        decode(bytes)
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> QueueResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| QueueError::codec(e.to_string()))?;
    Ok(buf)
}

pub(crate) fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> QueueResult<T> {
    ciborium::from_reader(bytes).map_err(|e| QueueError::codec(e.to_string()))
}
