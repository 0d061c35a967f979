use stocktally_core::Dataset;

use crate::diff::{diff, plan};
use crate::error::ReconError;
use crate::locks::TableLocks;
use crate::model::{BatchReport, ReconPlan, ReconciliationReport, TableFailure, TableOutcome};
use crate::store::{SnapshotSource, TableStore};

/// Converge `table` to `snapshot`: dedup, insert new keys, delete stale keys.
///
/// The three steps commit separately. If a later step fails the table is
/// left with earlier steps applied; running again with the same snapshot
/// finishes the job. Callers reconciling the same table from several
/// threads must serialize through [`TableLocks`].
pub fn reconcile<S: TableStore + ?Sized>(
    store: &mut S,
    table: &str,
    snapshot: &Dataset,
) -> Result<ReconciliationReport, ReconError> {
    let (persisted, duplicates_removed) = dedup_table(store, table)?;
    apply_diff(store, table, &persisted, duplicates_removed, snapshot)
}

/// Read the snapshot for `table` from `source` and reconcile.
///
/// Dedup runs before the snapshot is read, so a missing or unreadable
/// snapshot still leaves the table key-unique; the failure records how many
/// duplicates were dropped.
pub fn import_table<S, R>(store: &mut S, source: &R, table: &str) -> TableOutcome
where
    S: TableStore + ?Sized,
    R: SnapshotSource + ?Sized,
{
    let (persisted, duplicates_removed) = match dedup_table(store, table) {
        Ok(v) => v,
        Err(e) => return failed(table, e, 0),
    };

    let snapshot = match source.read_snapshot(table) {
        Ok(s) => s,
        Err(reason) => {
            let e = ReconError::SourceUnavailable {
                table: table.to_string(),
                reason,
            };
            return failed(table, e, duplicates_removed);
        }
    };

    match apply_diff(store, table, &persisted, duplicates_removed, &snapshot) {
        Ok(report) => TableOutcome::Reconciled(report),
        Err(e) => failed(table, e, duplicates_removed),
    }
}

/// Import every table in order. A failing table is recorded and the batch
/// continues.
///
/// `&mut S` only makes this store handle exclusive. Several handles over the
/// same database (one connection per thread) each hold their own
/// `&mut`, so they serialize per table through a shared `locks`.
pub fn import_batch<S, R, I, T>(store: &mut S, source: &R, tables: I, locks: &TableLocks) -> BatchReport
where
    S: TableStore + ?Sized,
    R: SnapshotSource + ?Sized,
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut report = BatchReport::default();
    for table in tables {
        let table = table.as_ref();
        let _guard = locks.lock(table);
        report.outcomes.push(import_table(store, source, table));
    }

    let totals = report.totals();
    log::info!(
        "import finished: {} table(s), {} ok, {} failed; +{} -{} dedup {}",
        totals.tables,
        totals.succeeded,
        totals.failed,
        totals.records_added,
        totals.records_deleted,
        totals.duplicates_removed,
    );
    report
}

/// Dry run: what [`import_table`] would do, without writing anything.
pub fn plan_table<S, R>(store: &S, source: &R, table: &str) -> Result<ReconPlan, ReconError>
where
    S: TableStore + ?Sized,
    R: SnapshotSource + ?Sized,
{
    ensure_exists(store, table)?;
    let persisted = store.read_table(table).map_err(|e| ReconError::store(table, e))?;
    let snapshot = source
        .read_snapshot(table)
        .map_err(|reason| ReconError::SourceUnavailable {
            table: table.to_string(),
            reason,
        })?;
    check_snapshot(table, &persisted, &snapshot)?;
    Ok(plan(table, &persisted, &snapshot))
}

fn failed(table: &str, error: ReconError, duplicates_removed: usize) -> TableOutcome {
    log::warn!("{error}");
    TableOutcome::Failed(TableFailure::new(table, &error, duplicates_removed))
}

fn ensure_exists<S: TableStore + ?Sized>(store: &S, table: &str) -> Result<(), ReconError> {
    let exists = store.table_exists(table).map_err(|e| ReconError::store(table, e))?;
    if exists {
        Ok(())
    } else {
        Err(ReconError::MissingTable(table.to_string()))
    }
}

/// Step 1. Returns the key-unique table and the number of rows dropped.
fn dedup_table<S: TableStore + ?Sized>(store: &mut S, table: &str) -> Result<(Dataset, usize), ReconError> {
    ensure_exists(store, table)?;
    let current = store.read_table(table).map_err(|e| ReconError::store(table, e))?;
    let (deduped, removed) = current.dedup_by_key();

    if removed > 0 {
        store
            .replace_all(table, &deduped)
            .map_err(|e| ReconError::store(table, e))?;
        log::info!("{table}: removed {removed} duplicate record(s)");
    } else {
        log::debug!("{table}: no duplicates");
    }

    Ok((deduped, removed))
}

fn check_snapshot(table: &str, persisted: &Dataset, snapshot: &Dataset) -> Result<(), ReconError> {
    if snapshot.is_empty() {
        return Err(ReconError::EmptySnapshot(table.to_string()));
    }
    if persisted.columns().is_empty() {
        return Ok(());
    }
    match snapshot
        .columns()
        .iter()
        .find(|c| persisted.column_index(c).is_none())
    {
        Some(column) => Err(ReconError::SchemaMismatch {
            table: table.to_string(),
            column: column.clone(),
        }),
        None => Ok(()),
    }
}

/// Steps 2 and 3 against the already deduplicated table.
fn apply_diff<S: TableStore + ?Sized>(
    store: &mut S,
    table: &str,
    persisted: &Dataset,
    duplicates_removed: usize,
    snapshot: &Dataset,
) -> Result<ReconciliationReport, ReconError> {
    check_snapshot(table, persisted, snapshot)?;

    let key_column = persisted
        .key_column()
        .or_else(|| snapshot.key_column())
        .unwrap_or_default()
        .to_string();
    let changes = diff(persisted, snapshot);

    if !changes.inserts.is_empty() {
        store
            .append_records(table, &changes.inserts)
            .map_err(|e| ReconError::store(table, e))?;
    }
    log::info!("{table}: added {} record(s)", changes.inserts.len());
    if changes.snapshot_duplicates > 0 {
        log::warn!(
            "{table}: snapshot repeats {} new key(s); kept first occurrence",
            changes.snapshot_duplicates
        );
    }

    let mut records_deleted = 0;
    for key in &changes.stale_keys {
        records_deleted += store
            .delete_by_key(table, &key_column, key)
            .map_err(|e| ReconError::store(table, e))?;
    }
    if records_deleted > 0 {
        log::info!("{table}: deleted {records_deleted} record(s)");
    }

    Ok(ReconciliationReport {
        table: table.to_string(),
        key_column,
        duplicates_removed,
        records_added: changes.inserts.len(),
        records_deleted,
        snapshot_duplicates: changes.snapshot_duplicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::memory::{MemorySource, MemoryStore, StoreOp};
    use stocktally_core::Value;

    fn products(rows: &[(i64, &str)]) -> Dataset {
        Dataset::from_rows(
            ["id", "name"],
            rows.iter()
                .map(|(id, name)| vec![Value::Int(*id), Value::from(*name)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn bolt_nut_screw_scenario() {
        let mut store = MemoryStore::new().with_table("Products", products(&[(1, "Bolt"), (2, "Nut")]));
        let report = reconcile(&mut store, "Products", &products(&[(2, "Nut"), (3, "Screw")])).unwrap();

        assert_eq!(report.duplicates_removed, 0);
        assert_eq!(report.records_added, 1);
        assert_eq!(report.records_deleted, 1);
        assert_eq!(store.table("Products").unwrap(), &products(&[(2, "Nut"), (3, "Screw")]));
    }

    #[test]
    fn second_pass_is_a_noop() {
        let snapshot = products(&[(2, "Nut"), (3, "Screw")]);
        let mut store = MemoryStore::new().with_table("Products", products(&[(1, "Bolt"), (2, "Nut")]));
        reconcile(&mut store, "Products", &snapshot).unwrap();
        store.clear_ops();

        let again = reconcile(&mut store, "Products", &snapshot).unwrap();
        assert!(again.is_noop());
        assert!(store.ops().is_empty());
    }

    #[test]
    fn duplicated_stale_key_counts_once_per_step() {
        let table = products(&[(9, "stale"), (1, "Bolt"), (9, "stale copy")]);
        let mut store = MemoryStore::new().with_table("Products", table);
        let report = reconcile(&mut store, "Products", &products(&[(1, "Bolt")])).unwrap();

        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.records_deleted, 1);
        assert_eq!(store.table("Products").unwrap(), &products(&[(1, "Bolt")]));
        assert_eq!(
            store.ops(),
            &[
                StoreOp::ReplaceAll { table: "Products".into(), rows: 2 },
                StoreOp::DeleteByKey { table: "Products".into(), key: Value::Int(9), removed: 1 },
            ]
        );
    }

    #[test]
    fn deletes_one_call_per_stale_key() {
        let mut store =
            MemoryStore::new().with_table("Products", products(&[(1, "a"), (2, "b"), (3, "c"), (4, "d")]));
        reconcile(&mut store, "Products", &products(&[(4, "d")])).unwrap();
        let deletes = store
            .ops()
            .iter()
            .filter(|op| matches!(op, StoreOp::DeleteByKey { .. }))
            .count();
        assert_eq!(deletes, 3);
    }

    #[test]
    fn missing_table_performs_no_mutation() {
        let mut store = MemoryStore::new();
        let err = reconcile(&mut store, "Ghosts", &products(&[(1, "x")])).unwrap_err();
        assert!(matches!(err, ReconError::MissingTable(ref t) if t == "Ghosts"));
        assert!(store.ops().is_empty());
    }

    #[test]
    fn empty_snapshot_rejected_after_dedup() {
        let mut store = MemoryStore::new().with_table("Products", products(&[(1, "a"), (1, "a")]));
        let err = reconcile(&mut store, "Products", &Dataset::new(["id", "name"])).unwrap_err();
        assert_eq!(err.kind(), FailureKind::EmptySnapshot);
        assert_eq!(store.table("Products").unwrap(), &products(&[(1, "a")]));
    }

    #[test]
    fn unknown_snapshot_column_rejected() {
        let mut store = MemoryStore::new().with_table("Products", products(&[(1, "a")]));
        let snapshot = Dataset::from_rows(["id", "colour"], vec![vec![Value::Int(2), "red".into()]]).unwrap();
        let err = reconcile(&mut store, "Products", &snapshot).unwrap_err();
        assert!(matches!(err, ReconError::SchemaMismatch { ref column, .. } if column == "colour"));
    }

    #[test]
    fn unavailable_source_still_dedups() {
        let mut store = MemoryStore::new().with_table("Orders", products(&[(5, "x"), (5, "y")]));
        let outcome = import_table(&mut store, &MemorySource::new(), "Orders");
        match outcome {
            TableOutcome::Failed(f) => {
                assert_eq!(f.kind, FailureKind::SourceUnavailable);
                assert_eq!(f.duplicates_removed, 1);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(store.table("Orders").unwrap().len(), 1);
    }

    #[test]
    fn batch_continues_past_failures() {
        let mut store = MemoryStore::new()
            .with_table("Products", products(&[(1, "Bolt")]))
            .with_table("Orders", products(&[(100, "first order")]))
            .with_table("Suppliers", products(&[(10, "Acme")]));
        let source = MemorySource::new()
            .with_snapshot("Products", products(&[(1, "Bolt"), (2, "Nut")]))
            .with_snapshot("Suppliers", products(&[(11, "Globex")]))
            .with_snapshot("Warehouses", products(&[(1, "North")]));
        let locks = TableLocks::new();

        let report = import_batch(&mut store, &source, ["Products", "Orders", "Warehouses", "Suppliers"], &locks);

        let kinds: Vec<(&str, bool)> = report.outcomes.iter().map(|o| (o.table(), o.is_success())).collect();
        assert_eq!(
            kinds,
            [("Products", true), ("Orders", false), ("Warehouses", false), ("Suppliers", true)]
        );
        let failed: Vec<FailureKind> = report.failed().map(|f| f.kind).collect();
        assert_eq!(failed, [FailureKind::SourceUnavailable, FailureKind::MissingTable]);
        assert!(!report.is_clean());
        assert_eq!(report.totals().records_added, 2);
        assert_eq!(report.totals().records_deleted, 1);
    }

    #[test]
    fn interrupted_delete_heals_on_next_pass() {
        let snapshot = products(&[(2, "Nut"), (3, "Screw")]);
        let mut store = MemoryStore::new().with_table("Products", products(&[(1, "Bolt"), (2, "Nut")]));
        store.fail_deletes_on("Products");

        let err = reconcile(&mut store, "Products", &snapshot).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Store);
        // insert committed, stale row still present
        assert_eq!(
            store.table("Products").unwrap(),
            &products(&[(1, "Bolt"), (2, "Nut"), (3, "Screw")])
        );

        store.heal();
        let report = reconcile(&mut store, "Products", &snapshot).unwrap();
        assert_eq!(report.records_added, 0);
        assert_eq!(report.records_deleted, 1);
        assert_eq!(store.table("Products").unwrap(), &products(&[(2, "Nut"), (3, "Screw")]));
    }

    #[test]
    fn plan_does_not_touch_store() {
        let store = MemoryStore::new().with_table("Products", products(&[(1, "Bolt"), (1, "Bolt"), (2, "Nut")]));
        let source = MemorySource::new().with_snapshot("Products", products(&[(2, "Nut"), (3, "Screw")]));
        let plan = plan_table(&store, &source, "Products").unwrap();
        let report = plan.report();
        assert_eq!((report.duplicates_removed, report.records_added, report.records_deleted), (1, 1, 1));
        assert!(store.ops().is_empty());
        assert_eq!(store.table("Products").unwrap().len(), 3);
    }
}
