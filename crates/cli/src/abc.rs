//! `stocktally abc`: ABC classification of products by quantity sold.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

use stocktally_config::{ClassificationSettings, Labels};
use stocktally_io::export::{export_classification, format_percent};
use stocktally_recon::{
    classify_range, compute_summary, ClassificationRecord, ClassificationSummary, DateRange, SalesFact,
    SalesFactSource, Tier, TierThresholds,
};

use crate::exit_codes::{EXIT_CONFIG, EXIT_EXPORT, EXIT_INVALID_RANGE, EXIT_STORE};
use crate::util::render_table;
use crate::{print_json, CliError, Context};

#[derive(Serialize)]
struct AbcOutput<'a> {
    start: NaiveDate,
    end: NaiveDate,
    records: &'a [ClassificationRecord],
    summary: &'a ClassificationSummary,
}

pub fn cmd_abc(
    ctx: &Context,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    export: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let cfg = &ctx.settings.classification;
    let thresholds = tier_thresholds(cfg)?;

    let store = ctx.open_store(false)?;
    let facts = store
        .read_sales_facts()
        .map_err(|e| CliError::new(EXIT_STORE, format!("cannot read sales: {e}")))?;

    let (start, end) = resolve_range(&facts, from, to)?;
    let range = DateRange::new(start, end).map_err(|e| {
        CliError::new(EXIT_INVALID_RANGE, e.to_string()).with_hint("--from must be earlier than --to")
    })?;

    let records = classify_range(&facts, &range, &thresholds);
    let summary = compute_summary(&records);
    let labels = ctx.labels();

    if let Some(path) = &export {
        export_classification(&records, labels, cfg.decimals, path)
            .map_err(|e| CliError::new(EXIT_EXPORT, format!("cannot export to {}: {e}", path.display())))?;
    }

    if json {
        print_json(&AbcOutput {
            start,
            end,
            records: &records,
            summary: &summary,
        })?;
    } else if records.is_empty() {
        println!("{}", labels.no_sales);
    } else {
        print!("{}", render_records(&records, labels, cfg.decimals));
        println!();
        print!("{}", render_summary(&summary, labels, cfg.decimals));
    }

    if let Some(path) = &export {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn tier_thresholds(cfg: &ClassificationSettings) -> Result<TierThresholds, CliError> {
    TierThresholds::new(cfg.a_max, cfg.b_max).map_err(|e| {
        CliError::new(EXIT_CONFIG, e.to_string()).with_hint("check [classification] in the configuration file")
    })
}

/// Missing bounds default to the earliest and latest order date.
fn resolve_range(
    facts: &[SalesFact],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<(NaiveDate, NaiveDate), CliError> {
    let earliest = facts.iter().map(|f| f.order_date).min();
    let latest = facts.iter().map(|f| f.order_date).max();
    match (from.or(earliest), to.or(latest)) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(CliError::new(EXIT_INVALID_RANGE, "no orders in the database to derive a date range from")
            .with_hint("pass --from and --to explicitly")),
    }
}

fn render_records(records: &[ClassificationRecord], labels: &Labels, decimals: u32) -> String {
    let headers = labels.classification_headers();
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.product_code.to_string(),
                r.product_name.clone(),
                r.total_quantity.to_string(),
                format_percent(r.share, decimals),
                format_percent(r.cumulative, decimals),
                r.tier.to_string(),
            ]
        })
        .collect();
    render_table(&headers, &rows, &[2, 3, 4], 40)
}

fn render_summary(summary: &ClassificationSummary, labels: &Labels, decimals: u32) -> String {
    let mut out = String::new();
    for (i, tier) in Tier::ALL.iter().enumerate() {
        out.push_str(&format!("{}: {}\n", labels.tier_count[i], summary.count(*tier)));
    }
    out.push_str(&format!("{}: {}\n", labels.unique_products, summary.products));
    out.push_str(&format!("{}: {}\n", labels.total_sold, summary.total_quantity));

    out.push_str(&format!("\n{}:\n", labels.tier_percent));
    for t in &summary.tiers {
        out.push_str(&format!("  {}: {}\n", t.tier, format_percent(t.percent, decimals)));
    }

    if let Some(top) = &summary.top_product {
        out.push_str(&format!(
            "\n{}: {}  ({}: {})\n",
            labels.top_product, top.product_name, labels.sales, top.total_quantity
        ));
    }
    out
}
