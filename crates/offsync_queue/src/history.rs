//! History and conflict records.

use crate::error::QueueResult;
use crate::item::{decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One record per terminal item outcome.
///
/// Items that are retried do not generate history; only delivery and
/// retry exhaustion do, so there is exactly one record per item that
/// left the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// The id of the item this record is for.
    pub id: Uuid,
    /// Mutation kind label.
    pub kind: String,
    /// When the terminal attempt finished.
    pub timestamp_ms: u64,
    /// Duration of the terminal attempt.
    pub duration_ms: u64,
    /// Whether the item was delivered.
    pub success: bool,
    /// Transport response on success.
    pub result: Option<Vec<u8>>,
    /// Final error message on failure.
    pub error: Option<String>,
}

impl HistoryRecord {
    /// Creates a success record.
    pub fn delivered(
        id: Uuid,
        kind: &str,
        timestamp_ms: u64,
        duration_ms: u64,
        result: Vec<u8>,
    ) -> Self {
        Self {
            id,
            kind: kind.to_string(),
            timestamp_ms,
            duration_ms,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Creates a failure record for an item whose retries are exhausted.
    pub fn exhausted(
        id: Uuid,
        kind: &str,
        timestamp_ms: u64,
        duration_ms: u64,
        error: String,
    ) -> Self {
        Self {
            id,
            kind: kind.to_string(),
            timestamp_ms,
            duration_ms,
            success: false,
            result: None,
            error: Some(error),
        }
    }

    /// Serializes the record for storage.
    pub fn encode(&self) -> QueueResult<Vec<u8>> {
        encode(self)
    }

    /// Deserializes a record from storage.
    pub fn decode(bytes: &[u8]) -> QueueResult<Self> {
        decode(bytes)
    }
}

/// Bookkeeping for a detected conflict.
///
/// Resolution is the host's concern; the queue only records that a
/// conflict happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// The id of the affected item.
    pub id: Uuid,
    /// When the conflict was recorded.
    pub timestamp_ms: u64,
    /// Whether the host has marked it resolved.
    pub resolved: bool,
}

impl ConflictRecord {
    /// Serializes the record for storage.
    pub fn encode(&self) -> QueueResult<Vec<u8>> {
        encode(self)
    }

    /// Deserializes a record from storage.
    pub fn decode(bytes: &[u8]) -> QueueResult<Self> {
        decode(bytes)
    }
}
