use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::store::{SourceError, StoreError};

/// Per-table reconciliation failure. A batch import records these and moves
/// on to the next table.
#[derive(Debug, Error)]
pub enum ReconError {
    /// Target table does not exist. Checked before any mutation.
    #[error("table '{0}' does not exist")]
    MissingTable(String),
    /// External snapshot could not be located or read.
    #[error("source unavailable for table '{table}': {reason}")]
    SourceUnavailable {
        table: String,
        #[source]
        reason: SourceError,
    },
    /// Snapshot has no records; applying it would delete the whole table.
    #[error("snapshot for table '{0}' has no records")]
    EmptySnapshot(String),
    /// Snapshot carries a column the persisted table does not have.
    #[error("snapshot for table '{table}' has column '{column}' not present in the table")]
    SchemaMismatch { table: String, column: String },
    #[error("store error on table '{table}': {reason}")]
    Store {
        table: String,
        #[source]
        reason: StoreError,
    },
}

impl ReconError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingTable(_) => FailureKind::MissingTable,
            Self::SourceUnavailable { .. } => FailureKind::SourceUnavailable,
            Self::EmptySnapshot(_) => FailureKind::EmptySnapshot,
            Self::SchemaMismatch { .. } => FailureKind::SchemaMismatch,
            Self::Store { .. } => FailureKind::Store,
        }
    }

    pub(crate) fn store(table: &str, reason: StoreError) -> Self {
        Self::Store {
            table: table.to_string(),
            reason,
        }
    }
}

/// Serializable discriminant of [`ReconError`] for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingTable,
    SourceUnavailable,
    EmptySnapshot,
    SchemaMismatch,
    Store,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTable => write!(f, "missing_table"),
            Self::SourceUnavailable => write!(f, "source_unavailable"),
            Self::EmptySnapshot => write!(f, "empty_snapshot"),
            Self::SchemaMismatch => write!(f, "schema_mismatch"),
            Self::Store => write!(f, "store"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Start must be strictly before end. Rejected before any data is read.
    #[error("invalid date range: start {start} must be before end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("invalid tier thresholds: need 0 < a_max ({a_max}) < b_max ({b_max}) <= 100")]
    InvalidThresholds { a_max: f64, b_max: f64 },
    #[error("cannot read sales facts: {0}")]
    Source(#[from] StoreError),
}
