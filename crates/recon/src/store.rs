//! Ports the engine talks to. The engine never opens files or connections
//! itself; callers hand it a store and a snapshot source.

use chrono::NaiveDate;
use serde::Serialize;
use stocktally_core::{Dataset, DatasetError, Value};
use thiserror::Error;

/// Failure inside the persisted store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("storage backend: {0}")]
    Backend(String),
}

/// Failure locating or reading an external snapshot.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no snapshot source configured for table '{0}'")]
    Unmapped(String),
    #[error("snapshot for '{table}' not found at {location}")]
    NotFound { table: String, location: String },
    #[error("snapshot for '{table}' cannot be read: {reason}")]
    Unreadable { table: String, reason: String },
}

/// Latest external export of each managed table.
pub trait SnapshotSource {
    fn read_snapshot(&self, table: &str) -> Result<Dataset, SourceError>;
}

/// Persisted tables. Only the reconciler mutates them.
pub trait TableStore {
    fn table_exists(&self, table: &str) -> Result<bool, StoreError>;

    /// Full table in storage order.
    fn read_table(&self, table: &str) -> Result<Dataset, StoreError>;

    /// Replace every row of `table` with `data`.
    fn replace_all(&mut self, table: &str, data: &Dataset) -> Result<(), StoreError>;

    /// Append `data` (columns matched by name) to `table`.
    fn append_records(&mut self, table: &str, data: &Dataset) -> Result<(), StoreError>;

    /// Delete every row whose `key_column` equals `key`; returns rows removed.
    fn delete_by_key(&mut self, table: &str, key_column: &str, key: &Value) -> Result<usize, StoreError>;
}

/// One order line joined to its order date and product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesFact {
    pub order_date: NaiveDate,
    pub product_code: Value,
    pub product_name: String,
    pub quantity: i64,
}

/// `readSalesFacts()`.
pub trait SalesFactSource {
    fn read_sales_facts(&self) -> Result<Vec<SalesFact>, StoreError>;
}
