//! `stocktally tables` and `stocktally show`.

use serde::Serialize;

use stocktally_io::{CatalogEntry, SpreadsheetSource};
use stocktally_recon::TableStore;

use crate::exit_codes::EXIT_STORE;
use crate::util::render_table;
use crate::{print_json, CliError, Context};

#[derive(Serialize)]
struct TableInfo {
    name: String,
    rows: usize,
}

#[derive(Serialize)]
struct TablesOutput {
    database: String,
    tables: Vec<TableInfo>,
    files: Vec<CatalogEntry>,
}

fn store_err(e: impl std::fmt::Display) -> CliError {
    CliError::new(EXIT_STORE, e.to_string())
}

pub fn cmd_tables(ctx: &Context, json: bool) -> Result<(), CliError> {
    let store = ctx.open_store(false)?;
    let tables = store
        .table_names()
        .map_err(store_err)?
        .into_iter()
        .map(|name| -> Result<TableInfo, CliError> {
            let rows = store.row_count(&name).map_err(store_err)?;
            Ok(TableInfo { name, rows })
        })
        .collect::<Result<Vec<_>, CliError>>()?;
    let files = SpreadsheetSource::from_settings(&ctx.settings).catalog();

    if json {
        return print_json(&TablesOutput {
            database: ctx.settings.database.path.display().to_string(),
            tables,
            files,
        });
    }

    let rows: Vec<Vec<String>> = tables.iter().map(|t| vec![t.name.clone(), t.rows.to_string()]).collect();
    print!("{}", render_table(&["table", "rows"], &rows, &[1], 40));
    println!();

    let present: Vec<&CatalogEntry> = files.iter().filter(|f| f.exists).collect();
    if present.is_empty() {
        println!("{}", ctx.labels().no_files);
        return Ok(());
    }
    let rows: Vec<Vec<String>> = present
        .iter()
        .map(|f| {
            vec![
                f.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
                f.table.clone(),
                f.size_mb().map(|mb| format!("{mb:.2} MB")).unwrap_or_default(),
                f.modified.map(|m| m.format("%d-%m-%Y %H:%M:%S").to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    print!("{}", render_table(&["file", "table", "size", "modified"], &rows, &[2], 40));

    for missing in files.iter().filter(|f| !f.exists) {
        log::warn!("{}: {} does not exist", missing.table, missing.path.display());
    }
    Ok(())
}

pub fn cmd_show(ctx: &Context, table: &str, limit: Option<usize>, json: bool) -> Result<(), CliError> {
    let store = ctx.open_store(false)?;
    if !store.table_exists(table).map_err(store_err)? {
        let known = store.table_names().map_err(store_err)?;
        return Err(CliError::usage(format!("no table named '{table}'"))
            .with_hint(format!("tables: {}", known.join(", "))));
    }
    let data = store.read_table(table).map_err(store_err)?;
    let shown = limit.unwrap_or(data.len()).min(data.len());

    if json {
        #[derive(Serialize)]
        struct ShowOutput<'a> {
            table: &'a str,
            total_rows: usize,
            columns: &'a [String],
            rows: &'a [Vec<stocktally_core::Value>],
        }
        return print_json(&ShowOutput {
            table,
            total_rows: data.len(),
            columns: data.columns(),
            rows: &data.rows()[..shown],
        });
    }

    let headers: Vec<&str> = data.columns().iter().map(String::as_str).collect();
    let rows: Vec<Vec<String>> = data.rows()[..shown]
        .iter()
        .map(|r| r.iter().map(|v| v.to_string()).collect())
        .collect();
    print!("{}", render_table(&headers, &rows, &[], 32));
    if shown < data.len() {
        println!("({} of {} rows)", shown, data.len());
    }
    Ok(())
}
