use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    /// Rows cannot be added to a dataset that has no key column.
    #[error("dataset has no columns")]
    NoColumns,
    #[error("row {row}: expected {expected} value(s), found {found}")]
    WidthMismatch { row: usize, expected: usize, found: usize },
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
}
