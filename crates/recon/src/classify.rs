use chrono::NaiveDate;

use crate::aggregate::aggregate_sales;
use crate::error::ClassifyError;
use crate::model::{ClassificationRecord, DateRange, TierThresholds};
use crate::store::{SalesFact, SalesFactSource};

/// ABC-classify products sold between `start` and `end` (inclusive) with
/// the default 20/50 thresholds.
pub fn classify(
    facts: &[SalesFact],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<ClassificationRecord>, ClassifyError> {
    let range = DateRange::new(start, end)?;
    Ok(classify_range(facts, &range, &TierThresholds::default()))
}

/// Validate the range and thresholds, then read facts from `source` and classify.
pub fn classify_from_source<S: SalesFactSource + ?Sized>(
    source: &S,
    start: NaiveDate,
    end: NaiveDate,
    thresholds: &TierThresholds,
) -> Result<Vec<ClassificationRecord>, ClassifyError> {
    let range = DateRange::new(start, end)?;
    thresholds.validate()?;
    let facts = source.read_sales_facts()?;
    log::debug!("classifying {} sales fact(s) in {}..={}", facts.len(), start, end);
    Ok(classify_range(&facts, &range, thresholds))
}

/// Rank products by share of quantity sold and assign tiers.
///
/// Ranking is by total descending, ties broken by product identity
/// ascending. The running share is computed from the running quantity
/// total rather than by summing rounded shares, so it lands exactly on
/// integral thresholds and ends at exactly 100.
pub fn classify_range(
    facts: &[SalesFact],
    range: &DateRange,
    thresholds: &TierThresholds,
) -> Vec<ClassificationRecord> {
    let mut totals = aggregate_sales(facts, range);

    let grand_total: i64 = totals.iter().map(|t| t.total_quantity).sum();
    if grand_total <= 0 {
        return Vec::new();
    }

    // aggregate_sales yields key-ascending order; a stable sort keeps it for ties
    totals.sort_by(|a, b| b.total_quantity.cmp(&a.total_quantity));

    let grand = grand_total as f64;
    let mut running: i64 = 0;
    totals
        .into_iter()
        .map(|t| {
            running += t.total_quantity;
            let share = t.total_quantity as f64 * 100.0 / grand;
            let cumulative = running as f64 * 100.0 / grand;
            ClassificationRecord {
                product_code: t.product_code,
                product_name: t.product_name,
                total_quantity: t.total_quantity,
                share,
                cumulative,
                tier: thresholds.tier_for(cumulative),
            }
        })
        .collect()
}

/// Round for display only; tiers are never derived from this.
pub fn round_percent(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
