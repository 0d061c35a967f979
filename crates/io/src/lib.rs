// File I/O: the SQLite store, spreadsheet snapshots and report export

pub mod csv;
pub mod export;
pub mod spreadsheet;
pub mod sqlite;
pub mod xlsx;

pub use export::{ExportError, ExportFormat};
pub use spreadsheet::{CatalogEntry, SpreadsheetSource};
pub use sqlite::{SalesQuery, SqliteStore};
