use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

/// Guard held for the duration of one table's reconciliation.
pub type TableGuard = ArcMutexGuard<RawMutex, ()>;

/// One mutex per table name, shared by callers that each open their own
/// store handle over the same database. Reconciling the same table twice at
/// once is a read-modify-write race; different tables never contend.
#[derive(Debug, Default)]
pub struct TableLocks {
    tables: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TableLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, table: &str) -> Arc<Mutex<()>> {
        let mut tables = self.tables.lock();
        tables
            .entry(table.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Block until `table` is free.
    pub fn lock(&self, table: &str) -> TableGuard {
        self.entry(table).lock_arc()
    }

    pub fn try_lock(&self, table: &str) -> Option<TableGuard> {
        self.entry(table).try_lock_arc()
    }
}
