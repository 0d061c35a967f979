//! `stocktally import` and `stocktally plan`.

use serde::Serialize;

use stocktally_config::Labels;
use stocktally_core::Value;
use stocktally_io::{SpreadsheetSource, SqliteStore};
use stocktally_recon::model::{BatchTotals, TableFailure};
use stocktally_recon::{
    import_batch, plan_table, BatchReport, ReconciliationReport, SnapshotSource, TableLocks,
    TableOutcome, TableStore,
};

use crate::exit_codes::{EXIT_PARTIAL_IMPORT, EXIT_STORE};
use crate::{print_json, CliError, Context};

#[derive(Serialize)]
struct ImportOutput<'a> {
    #[serde(flatten)]
    report: &'a BatchReport,
    totals: BatchTotals,
}

pub fn cmd_import(ctx: &Context, tables: Vec<String>, json: bool, create_missing: bool) -> Result<(), CliError> {
    let tables = ctx.select_tables(tables)?;
    let mut store = ctx.open_store(true)?;
    let source = SpreadsheetSource::from_settings(&ctx.settings);

    if create_missing {
        create_missing_tables(&mut store, &source, &tables)?;
    }

    let report = import_batch(&mut store, &source, &tables, &TableLocks::new());
    let totals = report.totals();

    if json {
        print_json(&ImportOutput { report: &report, totals: report.totals() })?;
    } else {
        print_outcomes(&report, ctx.labels());
        println!("{}", ctx.labels().update_completed);
    }

    if totals.failed > 0 {
        return Err(CliError::new(
            EXIT_PARTIAL_IMPORT,
            format!("{} of {} table(s) failed", totals.failed, totals.tables),
        ));
    }
    Ok(())
}

/// Create each absent table from the columns of its export. Tables whose
/// export cannot be read are left for the batch to report.
fn create_missing_tables(store: &mut SqliteStore, source: &SpreadsheetSource, tables: &[String]) -> Result<(), CliError> {
    for table in tables {
        let exists = store
            .table_exists(table)
            .map_err(|e| CliError::new(EXIT_STORE, e.to_string()))?;
        if exists {
            continue;
        }
        match source.read_snapshot(table) {
            Ok(snapshot) => store
                .create_table(table, &snapshot)
                .map_err(|e| CliError::new(EXIT_STORE, format!("cannot create '{table}': {e}")))?,
            Err(e) => log::warn!("not creating '{table}': {e}"),
        }
    }
    Ok(())
}

fn print_outcomes(report: &BatchReport, labels: &Labels) {
    for outcome in &report.outcomes {
        match outcome {
            TableOutcome::Reconciled(r) => print_reconciled(r, labels),
            TableOutcome::Failed(f) => print_failed(f, labels),
        }
    }
}

fn print_reconciled(r: &ReconciliationReport, labels: &Labels) {
    if r.duplicates_removed > 0 {
        println!("{}", Labels::table_message(labels.duplicates_removed, &r.table, r.duplicates_removed));
    }
    println!("{}", Labels::table_message(labels.records_added, &r.table, r.records_added));
    if r.records_deleted > 0 {
        println!("{}", Labels::table_message(labels.records_deleted, &r.table, r.records_deleted));
    }
    if r.snapshot_duplicates > 0 {
        log::warn!(
            "{}: export repeats {} key(s); only the first record of each was inserted",
            r.table,
            r.snapshot_duplicates
        );
    }
}

fn print_failed(f: &TableFailure, labels: &Labels) {
    if f.duplicates_removed > 0 {
        println!("{}", Labels::table_message(labels.duplicates_removed, &f.table, f.duplicates_removed));
    }
    println!("{}", labels.skipped_message(&f.table, &f.message));
}

// ============================================================================
// plan
// ============================================================================

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum PlanEntry {
    Planned {
        #[serde(flatten)]
        report: ReconciliationReport,
        insert_keys: Vec<Value>,
        stale_keys: Vec<Value>,
    },
    Failed(TableFailure),
}

pub fn cmd_plan(ctx: &Context, tables: Vec<String>, json: bool) -> Result<(), CliError> {
    let tables = ctx.select_tables(tables)?;
    let store = ctx.open_store(false)?;
    let source = SpreadsheetSource::from_settings(&ctx.settings);

    let entries: Vec<PlanEntry> = tables
        .iter()
        .map(|table| match plan_table(&store, &source, table) {
            Ok(plan) => PlanEntry::Planned {
                report: plan.report(),
                insert_keys: plan.diff.inserts.records().map(|r| r.key().clone()).collect(),
                stale_keys: plan.diff.stale_keys.clone(),
            },
            Err(e) => PlanEntry::Failed(TableFailure::new(table, &e, 0)),
        })
        .collect();

    if json {
        print_json(&entries)?;
    } else {
        for entry in &entries {
            match entry {
                PlanEntry::Planned { report, stale_keys, .. } => {
                    println!(
                        "{}: {} duplicate(s) to remove, {} to add, {} to delete",
                        report.table, report.duplicates_removed, report.records_added, report.records_deleted
                    );
                    if !stale_keys.is_empty() {
                        println!("  stale keys: {}", join_keys(stale_keys, 10));
                    }
                }
                PlanEntry::Failed(f) => println!("{}: {}", f.table, f.message),
            }
        }
    }

    let failed = entries.iter().filter(|e| matches!(e, PlanEntry::Failed(_))).count();
    if failed > 0 {
        return Err(CliError::new(
            EXIT_PARTIAL_IMPORT,
            format!("{} of {} table(s) cannot be imported", failed, entries.len()),
        ));
    }
    Ok(())
}

fn join_keys(keys: &[Value], max: usize) -> String {
    let shown: Vec<String> = keys.iter().take(max).map(Value::to_string).collect();
    if keys.len() > max {
        format!("{} (+{} more)", shown.join(", "), keys.len() - max)
    } else {
        shown.join(", ")
    }
}
