//! ACID-durable entity store backed by redb.
//!
//! Each record kind lives in its own `u64 -> bytes` table. Id counters live
//! in a separate table keyed by table name. A [`WriteBatch`] is applied in a
//! single write transaction, so a debt payment and the updated debt balance
//! land together or not at all.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition, TableError};

use crate::error::StoreError;

use super::{EntityStore, StoreResult, Table, Write, WriteBatch};

/// Next-id counters (table name → last allocated id).
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

fn records(table: Table) -> TableDefinition<'static, u64, &'static [u8]> {
    TableDefinition::new(table.name())
}

fn redb_err<E: std::fmt::Display>(op: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::Redb {
        message: format!("{op} failed: {e}"),
    }
}

/// ACID-durable store using redb.
///
/// All writes go through transactions. Reads use MVCC snapshots.
pub struct DurableStore {
    db: Arc<Database>,
}

impl DurableStore {
    /// Open or create a durable store in the given directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let db_path = data_dir.join("orgweave.redb");
        let db = Database::create(&db_path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;
        tracing::debug!(path = %db_path.display(), "opened durable entity store");
        Ok(Self { db: Arc::new(db) })
    }
}

impl EntityStore for DurableStore {
    fn get(&self, table: Table, id: u64) -> StoreResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let t = match txn.open_table(records(table)) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(redb_err("open_table")(e)),
        };
        let value = t.get(id).map_err(redb_err("get"))?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn scan(&self, table: Table) -> StoreResult<Vec<(u64, Vec<u8>)>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let t = match txn.open_table(records(table)) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(vec![]),
            Err(e) => return Err(redb_err("open_table")(e)),
        };
        let mut out = Vec::new();
        for entry in t.iter().map_err(redb_err("iter"))? {
            let (k, v) = entry.map_err(redb_err("iter"))?;
            out.push((k.value(), v.value().to_vec()));
        }
        Ok(out)
    }

    fn allocate_id(&self, table: Table) -> StoreResult<u64> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        let next = {
            let mut counters = txn
                .open_table(COUNTERS_TABLE)
                .map_err(redb_err("open_table"))?;
            let last = counters
                .get(table.name())
                .map_err(redb_err("get"))?
                .map(|guard| guard.value())
                .unwrap_or(0);
            let next = last + 1;
            counters
                .insert(table.name(), next)
                .map_err(redb_err("insert"))?;
            next
        };
        txn.commit().map_err(redb_err("commit"))?;
        Ok(next)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        for write in batch.into_writes() {
            match write {
                Write::Put { table, id, bytes } => {
                    let mut t = txn.open_table(records(table)).map_err(redb_err("open_table"))?;
                    t.insert(id, bytes.as_slice()).map_err(redb_err("insert"))?;
                }
                Write::Delete { table, id } => {
                    let mut t = txn.open_table(records(table)).map_err(redb_err("open_table"))?;
                    t.remove(id).map_err(redb_err("remove"))?;
                }
            }
        }
        txn.commit().map_err(redb_err("commit"))?;
        Ok(())
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn batch(writes: Vec<Write>) -> WriteBatch {
        let mut batch = WriteBatch::new();
        batch.writes = writes;
        batch
    }

    #[test]
    fn put_get_remove() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();

        store
            .commit(batch(vec![Write::Put {
                table: Table::Debts,
                id: 1,
                bytes: b"owed".to_vec(),
            }]))
            .unwrap();
        assert_eq!(store.get(Table::Debts, 1).unwrap(), Some(b"owed".to_vec()));

        store
            .commit(batch(vec![Write::Delete {
                table: Table::Debts,
                id: 1,
            }]))
            .unwrap();
        assert_eq!(store.get(Table::Debts, 1).unwrap(), None);
    }

    #[test]
    fn untouched_table_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();
        assert!(store.scan(Table::Stocks).unwrap().is_empty());
        assert_eq!(store.get(Table::Stocks, 9).unwrap(), None);
    }

    #[test]
    fn batch_spans_tables() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();
        store
            .commit(batch(vec![
                Write::Put {
                    table: Table::DebtPayments,
                    id: 1,
                    bytes: vec![1],
                },
                Write::Put {
                    table: Table::Debts,
                    id: 1,
                    bytes: vec![2],
                },
            ]))
            .unwrap();
        assert_eq!(store.scan(Table::DebtPayments).unwrap().len(), 1);
        assert_eq!(store.scan(Table::Debts).unwrap().len(), 1);
    }

    #[test]
    fn counters_persist_across_reopens() {
        let dir = TempDir::new().unwrap();
        {
            let store = DurableStore::open(dir.path()).unwrap();
            assert_eq!(store.allocate_id(Table::Organizations).unwrap(), 1);
            assert_eq!(store.allocate_id(Table::Organizations).unwrap(), 2);
        }
        let store = DurableStore::open(dir.path()).unwrap();
        assert_eq!(store.allocate_id(Table::Organizations).unwrap(), 3);
        assert_eq!(store.allocate_id(Table::Debts).unwrap(), 1);
    }
}
