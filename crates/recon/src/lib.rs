//! `stocktally-recon`: dataset reconciliation and ABC classification engine.
//!
//! Pure engine crate: talks to storage and snapshot sources only through the
//! traits in [`store`]. No file or database code lives here.

pub mod aggregate;
pub mod classify;
pub mod diff;
pub mod engine;
pub mod error;
pub mod locks;
pub mod memory;
pub mod model;
pub mod store;
pub mod summary;

pub use classify::{classify, classify_from_source, classify_range};
pub use engine::{import_batch, import_table, plan_table, reconcile};
pub use error::{ClassifyError, FailureKind, ReconError};
pub use locks::TableLocks;
pub use model::{
    BatchReport, ClassificationRecord, ClassificationSummary, DateRange, ReconPlan, ReconciliationReport,
    TableOutcome, Tier, TierThresholds,
};
pub use store::{SalesFact, SalesFactSource, SnapshotSource, SourceError, StoreError, TableStore};
pub use summary::compute_summary;
