//! Shared in-memory table state used by both store implementations.

use crate::types::{Index, IndexEntry, IndexRange, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rows and index postings for one table.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct TableData {
    /// Row payloads by key.
    pub rows: BTreeMap<String, Vec<u8>>,
    /// Index postings by key, replaced wholesale on upsert.
    pub postings: BTreeMap<String, Vec<IndexEntry>>,
}

/// The full store state: one [`TableData`] per table.
///
/// Secondary indexes are not materialized; `scan_index` sorts matching
/// postings on the fly. Row counts here are small and bounded by the
/// cache budget, so the O(n log n) scan is acceptable.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct StoreState {
    tables: BTreeMap<Table, TableData>,
}

impl StoreState {
    pub fn get(&self, table: Table, key: &str) -> Option<Vec<u8>> {
        self.tables.get(&table).and_then(|t| t.rows.get(key)).cloned()
    }

    pub fn put(&mut self, table: Table, key: &str, value: Vec<u8>, indexes: Vec<IndexEntry>) {
        let data = self.tables.entry(table).or_default();
        data.rows.insert(key.to_string(), value);
        data.postings.insert(key.to_string(), indexes);
    }

    pub fn delete(&mut self, table: Table, key: &str) {
        if let Some(data) = self.tables.get_mut(&table) {
            data.rows.remove(key);
            data.postings.remove(key);
        }
    }

    pub fn scan(&self, table: Table) -> Vec<(String, Vec<u8>)> {
        self.tables
            .get(&table)
            .map(|t| t.rows.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    pub fn scan_index(&self, table: Table, index: Index, range: &IndexRange) -> Vec<String> {
        let Some(data) = self.tables.get(&table) else {
            return Vec::new();
        };

        let mut matches: Vec<(&crate::types::IndexValue, &String)> = data
            .postings
            .iter()
            .flat_map(|(key, entries)| {
                entries
                    .iter()
                    .filter(|e| e.index == index && range.contains(&e.value))
                    .map(move |e| (&e.value, key))
            })
            .collect();

        matches.sort();
        matches.into_iter().map(|(_, key)| key.clone()).collect()
    }

    pub fn count(&self, table: Table) -> usize {
        self.tables.get(&table).map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn clear(&mut self, table: Table) {
        self.tables.remove(&table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndexValue;

    #[test]
    fn put_replaces_postings() {
        let mut state = StoreState::default();
        state.put(
            Table::CacheEntries,
            "k",
            vec![1],
            vec![IndexEntry::new(Index::Expiry, 10u64)],
        );
        state.put(
            Table::CacheEntries,
            "k",
            vec![2],
            vec![IndexEntry::new(Index::Expiry, 20u64)],
        );

        let keys = state.scan_index(
            Table::CacheEntries,
            Index::Expiry,
            &IndexRange::AtMost(IndexValue::Unsigned(15)),
        );
        assert!(keys.is_empty());

        let keys = state.scan_index(
            Table::CacheEntries,
            Index::Expiry,
            &IndexRange::AtMost(IndexValue::Unsigned(20)),
        );
        assert_eq!(keys, vec!["k".to_string()]);
    }

    #[test]
    fn scan_index_ordered_by_value() {
        let mut state = StoreState::default();
        for (key, ts) in [("b", 30u64), ("a", 10), ("c", 20)] {
            state.put(
                Table::SyncQueue,
                key,
                vec![],
                vec![IndexEntry::new(Index::Timestamp, ts)],
            );
        }

        let keys = state.scan_index(Table::SyncQueue, Index::Timestamp, &IndexRange::All);
        assert_eq!(keys, vec!["a".to_string(), "c".to_string(), "b".to_string()]);
    }
}
