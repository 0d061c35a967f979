//! Snapshot source backed by export files in a data directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use stocktally_config::{Settings, TableSource};
use stocktally_core::Dataset;
use stocktally_recon::{SnapshotSource, SourceError};

/// Supported snapshot file kinds, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Workbook,
    Delimited,
}

fn file_kind(path: &Path) -> Option<FileKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(FileKind::Workbook),
        "csv" | "tsv" | "txt" => Some(FileKind::Delimited),
        _ => None,
    }
}

/// Read one export file into a dataset.
pub fn read_dataset(path: &Path) -> Result<Dataset, String> {
    match file_kind(path) {
        Some(FileKind::Workbook) => crate::xlsx::import(path),
        Some(FileKind::Delimited) => crate::csv::import(path),
        None => Err(format!("unsupported file type: {}", path.display())),
    }
}

/// One mapped export file as seen on disk.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub table: String,
    pub path: PathBuf,
    pub exists: bool,
    pub size_bytes: Option<u64>,
    pub modified: Option<DateTime<Local>>,
}

impl CatalogEntry {
    pub fn size_mb(&self) -> Option<f64> {
        self.size_bytes.map(|b| b as f64 / (1024.0 * 1024.0))
    }
}

#[derive(Debug, Clone)]
pub struct SpreadsheetSource {
    data_dir: PathBuf,
    tables: Vec<TableSource>,
}

impl SpreadsheetSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            tables: Vec::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            data_dir: settings.data_dir.clone(),
            tables: settings.tables.clone(),
        }
    }

    pub fn with_table(mut self, table: &str, file: &str) -> Self {
        self.tables.push(TableSource::new(table, file));
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full path of the export feeding `table`, if mapped.
    pub fn path_for(&self, table: &str) -> Option<PathBuf> {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .map(|t| self.data_dir.join(&t.file))
    }

    /// Every mapped file with its size and last modification time.
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.tables
            .iter()
            .map(|t| {
                let path = self.data_dir.join(&t.file);
                let meta = std::fs::metadata(&path).ok().filter(|m| m.is_file());
                CatalogEntry {
                    table: t.table.clone(),
                    exists: meta.is_some(),
                    size_bytes: meta.as_ref().map(|m| m.len()),
                    modified: meta.and_then(|m| m.modified().ok()).map(DateTime::<Local>::from),
                    path,
                }
            })
            .collect()
    }
}

impl SnapshotSource for SpreadsheetSource {
    fn read_snapshot(&self, table: &str) -> Result<Dataset, SourceError> {
        let path = self
            .path_for(table)
            .ok_or_else(|| SourceError::Unmapped(table.to_string()))?;
        if !path.is_file() {
            return Err(SourceError::NotFound {
                table: table.to_string(),
                location: path.display().to_string(),
            });
        }
        let dataset = read_dataset(&path).map_err(|reason| SourceError::Unreadable {
            table: table.to_string(),
            reason,
        })?;
        log::debug!("snapshot '{}': {} row(s) from {}", table, dataset.len(), path.display());
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use stocktally_core::Value;
    use tempfile::tempdir;

    #[test]
    fn reads_mapped_csv() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("products.csv"), "code,name\n1,Bolt\n").unwrap();
        let source = SpreadsheetSource::new(dir.path()).with_table("Products", "products.csv");

        let ds = source.read_snapshot("Products").unwrap();
        assert_eq!(ds.rows()[0], vec![Value::Int(1), Value::from("Bolt")]);
    }

    #[test]
    fn unmapped_missing_and_unreadable() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("orders.xlsx"), "not a zip archive").unwrap();
        let source = SpreadsheetSource::new(dir.path())
            .with_table("Customers", "customers.xlsx")
            .with_table("Orders", "orders.xlsx");

        assert!(matches!(source.read_snapshot("Nope"), Err(SourceError::Unmapped(_))));
        assert!(matches!(source.read_snapshot("Customers"), Err(SourceError::NotFound { .. })));
        assert!(matches!(source.read_snapshot("Orders"), Err(SourceError::Unreadable { .. })));
    }

    #[test]
    fn catalog_reports_size_and_presence() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("products.csv"), "code\n1\n").unwrap();
        let source = SpreadsheetSource::new(dir.path())
            .with_table("Products", "products.csv")
            .with_table("Orders", "orders.xlsx");

        let catalog = source.catalog();
        assert_eq!(catalog.len(), 2);
        assert!(catalog[0].exists);
        assert_eq!(catalog[0].size_bytes, Some(7));
        assert!(catalog[0].modified.is_some());
        assert!(!catalog[1].exists);
        assert!(catalog[1].size_mb().is_none());
    }

    #[test]
    fn unsupported_extension() {
        assert!(read_dataset(Path::new("report.pdf")).is_err());
    }
}
