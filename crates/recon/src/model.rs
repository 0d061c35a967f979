use chrono::NaiveDate;
use serde::Serialize;
use stocktally_core::{Dataset, Value};

use crate::error::{ClassifyError, FailureKind, ReconError};

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Changes needed to converge a key-unique persisted table to a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Diff {
    /// Snapshot records whose key is absent from the table, snapshot columns.
    pub inserts: Dataset,
    /// Later repeats of a new key inside the snapshot, not inserted.
    pub snapshot_duplicates: usize,
    /// Persisted key values (verbatim, storage order) absent from the snapshot.
    pub stale_keys: Vec<Value>,
}

/// Unapplied reconciliation: dedup result plus diff.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconPlan {
    pub table: String,
    pub key_column: String,
    pub deduped: Dataset,
    pub duplicates_removed: usize,
    pub diff: Diff,
}

impl ReconPlan {
    /// The report this plan would produce if applied.
    pub fn report(&self) -> ReconciliationReport {
        ReconciliationReport {
            table: self.table.clone(),
            key_column: self.key_column.clone(),
            duplicates_removed: self.duplicates_removed,
            records_added: self.diff.inserts.len(),
            records_deleted: self.diff.stale_keys.len(),
            snapshot_duplicates: self.diff.snapshot_duplicates,
        }
    }
}

/// `{tableName, duplicatesRemoved, recordsAdded, recordsDeleted}` for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub table: String,
    pub key_column: String,
    pub duplicates_removed: usize,
    pub records_added: usize,
    pub records_deleted: usize,
    pub snapshot_duplicates: usize,
}

impl ReconciliationReport {
    pub fn is_noop(&self) -> bool {
        self.duplicates_removed == 0 && self.records_added == 0 && self.records_deleted == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableFailure {
    pub table: String,
    pub kind: FailureKind,
    pub message: String,
    /// Dedup runs before the snapshot is read, so a failed table may still
    /// have been deduplicated.
    pub duplicates_removed: usize,
}

impl TableFailure {
    pub fn new(table: &str, error: &ReconError, duplicates_removed: usize) -> Self {
        Self {
            table: table.to_string(),
            kind: error.kind(),
            message: error.to_string(),
            duplicates_removed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Reconciled(ReconciliationReport),
    Failed(TableFailure),
}

impl TableOutcome {
    pub fn table(&self) -> &str {
        match self {
            Self::Reconciled(r) => &r.table,
            Self::Failed(f) => &f.table,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Reconciled(_))
    }
}

/// Outcomes of a batch import, in the order the tables were given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<TableOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ReconciliationReport> {
        self.outcomes.iter().filter_map(|o| match o {
            TableOutcome::Reconciled(r) => Some(r),
            TableOutcome::Failed(_) => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = &TableFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            TableOutcome::Failed(f) => Some(f),
            TableOutcome::Reconciled(_) => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(TableOutcome::is_success)
    }

    pub fn totals(&self) -> BatchTotals {
        crate::summary::batch_totals(&self.outcomes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchTotals {
    pub tables: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duplicates_removed: usize,
    pub records_added: usize,
    pub records_deleted: usize,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Tier {
    A,
    B,
    C,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::A, Tier::B, Tier::C];
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::C => write!(f, "C"),
        }
    }
}

/// Upper bounds (inclusive) of the cumulative share for tiers A and B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierThresholds {
    pub a_max: f64,
    pub b_max: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            a_max: 20.0,
            b_max: 50.0,
        }
    }
}

impl TierThresholds {
    pub fn new(a_max: f64, b_max: f64) -> Result<Self, ClassifyError> {
        let thresholds = Self { a_max, b_max };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ClassifyError> {
        let ok = self.a_max > 0.0 && self.a_max < self.b_max && self.b_max <= 100.0;
        if ok {
            Ok(())
        } else {
            Err(ClassifyError::InvalidThresholds {
                a_max: self.a_max,
                b_max: self.b_max,
            })
        }
    }

    /// Bins are closed on the upper edge: exactly `a_max` is still A.
    pub fn tier_for(&self, cumulative: f64) -> Tier {
        if cumulative <= self.a_max {
            Tier::A
        } else if cumulative <= self.b_max {
            Tier::B
        } else {
            Tier::C
        }
    }
}

/// Inclusive calendar-day range with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ClassifyError> {
        if start >= end {
            return Err(ClassifyError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationRecord {
    pub product_code: Value,
    pub product_name: String,
    pub total_quantity: i64,
    /// Percent of the grand total, unrounded.
    pub share: f64,
    /// Running share in ranked order, unrounded.
    pub cumulative: f64,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierCount {
    pub tier: Tier,
    pub products: usize,
    /// Percent of classified products falling in this tier.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopProduct {
    pub product_code: Value,
    pub product_name: String,
    pub total_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationSummary {
    /// Always A, B, C in that order, zero counts included.
    pub tiers: Vec<TierCount>,
    pub products: usize,
    pub total_quantity: i64,
    pub top_product: Option<TopProduct>,
}

impl ClassificationSummary {
    pub fn count(&self, tier: Tier) -> usize {
        self.tiers
            .iter()
            .find(|t| t.tier == tier)
            .map(|t| t.products)
            .unwrap_or(0)
    }
}
