//! In-memory entity store.
//!
//! Tables live behind a single `RwLock` so a write batch is applied
//! atomically; id counters are kept per table in a `DashMap`. All data is
//! lost on process exit.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use dashmap::DashMap;

use crate::error::StoreError;

use super::{EntityStore, StoreResult, Table, Write, WriteBatch};

type Tables = HashMap<Table, BTreeMap<u64, Vec<u8>>>;

/// Process-local store for tests and memory-only engines.
#[derive(Debug, Default)]
pub struct MemStore {
    tables: RwLock<Tables>,
    counters: DashMap<Table, u64>,
}

fn poisoned() -> StoreError {
    StoreError::Unavailable {
        message: "in-memory table lock poisoned".into(),
    }
}

impl MemStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all tables.
    pub fn len(&self) -> usize {
        self.tables
            .read()
            .map(|t| t.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityStore for MemStore {
    fn get(&self, table: Table, id: u64) -> StoreResult<Option<Vec<u8>>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.get(&table).and_then(|t| t.get(&id)).cloned())
    }

    fn scan(&self, table: Table) -> StoreResult<Vec<(u64, Vec<u8>)>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables
            .get(&table)
            .map(|t| t.iter().map(|(id, v)| (*id, v.clone())).collect())
            .unwrap_or_default())
    }

    fn allocate_id(&self, table: Table) -> StoreResult<u64> {
        let mut next = self.counters.entry(table).or_insert(0);
        *next += 1;
        Ok(*next)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        for write in batch.into_writes() {
            match write {
                Write::Put { table, id, bytes } => {
                    tables.entry(table).or_default().insert(id, bytes);
                }
                Write::Delete { table, id } => {
                    if let Some(t) = tables.get_mut(&table) {
                        t.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn put(table: Table, id: u64, bytes: &[u8]) -> WriteBatch {
        let mut batch = WriteBatch::new();
        batch.writes.push(Write::Put {
            table,
            id,
            bytes: bytes.to_vec(),
        });
        batch
    }

    #[test]
    fn commit_and_get() {
        let store = MemStore::new();
        store.commit(put(Table::Debts, 1, b"debt")).unwrap();
        assert_eq!(store.get(Table::Debts, 1).unwrap(), Some(b"debt".to_vec()));
        assert_eq!(store.get(Table::Stocks, 1).unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn scan_is_id_ordered() {
        let store = MemStore::new();
        store.commit(put(Table::Flows, 3, b"c")).unwrap();
        store.commit(put(Table::Flows, 1, b"a")).unwrap();
        let ids: Vec<u64> = store.scan(Table::Flows).unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn ids_are_per_table() {
        let store = MemStore::new();
        assert_eq!(store.allocate_id(Table::Debts).unwrap(), 1);
        assert_eq!(store.allocate_id(Table::Debts).unwrap(), 2);
        assert_eq!(store.allocate_id(Table::Stocks).unwrap(), 1);
    }

    #[test]
    fn concurrent_allocation_never_repeats() {
        let store = Arc::new(MemStore::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| store.allocate_id(Table::Events).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 800);
    }

    #[test]
    fn delete_in_batch() {
        let store = MemStore::new();
        store.commit(put(Table::Agents, 1, b"x")).unwrap();
        let mut batch = WriteBatch::new();
        batch.writes.push(Write::Delete {
            table: Table::Agents,
            id: 1,
        });
        store.commit(batch).unwrap();
        assert!(store.is_empty());
    }
}
