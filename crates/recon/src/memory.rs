//! In-process store and snapshot source. Used by tests and by callers that
//! want to dry-run a reconciliation against data already in memory.

use std::collections::{BTreeMap, HashMap, HashSet};

use stocktally_core::{Dataset, Value};

use crate::store::{SalesFact, SalesFactSource, SnapshotSource, SourceError, StoreError, TableStore};

/// Mutating call observed by [`MemoryStore`], in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    ReplaceAll { table: String, rows: usize },
    Append { table: String, rows: usize },
    DeleteByKey { table: String, key: Value, removed: usize },
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Dataset>,
    sales: Vec<SalesFact>,
    ops: Vec<StoreOp>,
    failing_deletes: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, data: Dataset) -> Self {
        self.insert_table(name, data);
        self
    }

    pub fn with_sales(mut self, facts: Vec<SalesFact>) -> Self {
        self.sales = facts;
        self
    }

    pub fn insert_table(&mut self, name: &str, data: Dataset) {
        self.tables.insert(name.to_string(), data);
    }

    pub fn table(&self, name: &str) -> Option<&Dataset> {
        self.tables.get(name)
    }

    pub fn ops(&self) -> &[StoreOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Make every `delete_by_key` on `table` fail, simulating a crash
    /// between the insert and delete steps.
    pub fn fail_deletes_on(&mut self, table: &str) {
        self.failing_deletes.insert(table.to_string());
    }

    pub fn heal(&mut self) {
        self.failing_deletes.clear();
    }

    fn table_mut(&mut self, table: &str) -> Result<&mut Dataset, StoreError> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }
}

impl TableStore for MemoryStore {
    fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        Ok(self.tables.contains_key(table))
    }

    fn read_table(&self, table: &str) -> Result<Dataset, StoreError> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn replace_all(&mut self, table: &str, data: &Dataset) -> Result<(), StoreError> {
        let target = self.table_mut(table)?;
        *target = data.clone();
        self.ops.push(StoreOp::ReplaceAll {
            table: table.to_string(),
            rows: data.len(),
        });
        Ok(())
    }

    fn append_records(&mut self, table: &str, data: &Dataset) -> Result<(), StoreError> {
        let target = self.table_mut(table)?;
        if target.columns().is_empty() {
            *target = data.empty_like();
        }

        if let Some(unknown) = data.columns().iter().find(|c| target.column_index(c).is_none()) {
            return Err(StoreError::UnknownColumn {
                table: table.to_string(),
                column: unknown.clone(),
            });
        }

        let mapping: Vec<Option<usize>> = target.columns().iter().map(|c| data.column_index(c)).collect();
        for row in data.rows() {
            let aligned = mapping
                .iter()
                .map(|m| m.map_or(Value::Null, |i| row[i].clone()))
                .collect();
            target.push_row(aligned)?;
        }

        self.ops.push(StoreOp::Append {
            table: table.to_string(),
            rows: data.len(),
        });
        Ok(())
    }

    fn delete_by_key(&mut self, table: &str, key_column: &str, key: &Value) -> Result<usize, StoreError> {
        if self.failing_deletes.contains(table) {
            return Err(StoreError::Backend(format!("delete on '{table}' failed")));
        }
        let target = self.table_mut(table)?;
        let idx = target.column_index(key_column).ok_or_else(|| StoreError::UnknownColumn {
            table: table.to_string(),
            column: key_column.to_string(),
        })?;

        let wanted = key.key();
        let before = target.len();
        *target = target.filter_rows(|r| r.values()[idx].key() != wanted);
        let removed = before - target.len();

        self.ops.push(StoreOp::DeleteByKey {
            table: table.to_string(),
            key: key.clone(),
            removed,
        });
        Ok(removed)
    }
}

impl SalesFactSource for MemoryStore {
    fn read_sales_facts(&self) -> Result<Vec<SalesFact>, StoreError> {
        Ok(self.sales.clone())
    }
}

#[derive(Debug, Default)]
pub struct MemorySource {
    snapshots: HashMap<String, Dataset>,
    unreadable: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, table: &str, data: Dataset) -> Self {
        self.snapshots.insert(table.to_string(), data);
        self
    }

    pub fn with_unreadable(mut self, table: &str, reason: &str) -> Self {
        self.unreadable.insert(table.to_string(), reason.to_string());
        self
    }
}

impl SnapshotSource for MemorySource {
    fn read_snapshot(&self, table: &str) -> Result<Dataset, SourceError> {
        if let Some(reason) = self.unreadable.get(table) {
            return Err(SourceError::Unreadable {
                table: table.to_string(),
                reason: reason.clone(),
            });
        }
        self.snapshots.get(table).cloned().ok_or_else(|| SourceError::NotFound {
            table: table.to_string(),
            location: "memory".to_string(),
        })
    }
}
