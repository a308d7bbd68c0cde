//! The closed set of remote mutations the queue can carry.

use serde::{Deserialize, Serialize};

/// A remote mutation awaiting delivery.
///
/// The set of mutation kinds is closed: adding a kind is a code change,
/// and dispatch is an exhaustive match rather than a string lookup. The
/// payload bytes are opaque to the queue; the transport gives them
/// meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncAction {
    /// Create a record in a remote collection.
    CreateRecord {
        /// Target collection.
        collection: String,
        /// Serialized record.
        payload: Vec<u8>,
    },
    /// Update an existing remote record.
    UpdateRecord {
        /// Target collection.
        collection: String,
        /// Record key.
        key: String,
        /// Serialized record.
        payload: Vec<u8>,
    },
    /// Delete a remote record.
    DeleteRecord {
        /// Target collection.
        collection: String,
        /// Record key.
        key: String,
    },
}

impl SyncAction {
    /// Stable label for history records and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncAction::CreateRecord { .. } => "create_record",
            SyncAction::UpdateRecord { .. } => "update_record",
            SyncAction::DeleteRecord { .. } => "delete_record",
        }
    }

    /// The collection this mutation targets.
    pub fn collection(&self) -> &str {
        match self {
            SyncAction::CreateRecord { collection, .. }
            | SyncAction::UpdateRecord { collection, .. }
            | SyncAction::DeleteRecord { collection, .. } => collection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        let create = SyncAction::CreateRecord {
            collection: "orders".into(),
            payload: vec![1],
        };
        let update = SyncAction::UpdateRecord {
            collection: "orders".into(),
            key: "o1".into(),
            payload: vec![2],
        };
        let delete = SyncAction::DeleteRecord {
            collection: "orders".into(),
            key: "o1".into(),
        };

        assert_eq!(create.kind(), "create_record");
        assert_eq!(update.kind(), "update_record");
        assert_eq!(delete.kind(), "delete_record");
        assert_eq!(create.collection(), "orders");
    }
}
