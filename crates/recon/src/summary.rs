use crate::model::{
    BatchTotals, ClassificationRecord, ClassificationSummary, TableOutcome, Tier, TierCount, TopProduct,
};

/// Per-tier counts, totals and the top seller of a classification.
pub fn compute_summary(records: &[ClassificationRecord]) -> ClassificationSummary {
    let products = records.len();
    let total_quantity = records.iter().map(|r| r.total_quantity).sum();

    let tiers = Tier::ALL
        .iter()
        .map(|&tier| {
            let count = records.iter().filter(|r| r.tier == tier).count();
            let percent = if products == 0 {
                0.0
            } else {
                count as f64 * 100.0 / products as f64
            };
            TierCount {
                tier,
                products: count,
                percent,
            }
        })
        .collect();

    // records are ranked, so the first maximum is the top-ranked product
    let top_product = records
        .iter()
        .fold(None::<&ClassificationRecord>, |best, r| match best {
            Some(b) if b.total_quantity >= r.total_quantity => Some(b),
            _ => Some(r),
        })
        .map(|r| TopProduct {
            product_code: r.product_code.clone(),
            product_name: r.product_name.clone(),
            total_quantity: r.total_quantity,
        });

    ClassificationSummary {
        tiers,
        products,
        total_quantity,
        top_product,
    }
}

/// Aggregate counts over a batch import.
pub fn batch_totals(outcomes: &[TableOutcome]) -> BatchTotals {
    let mut totals = BatchTotals {
        tables: outcomes.len(),
        ..BatchTotals::default()
    };

    for outcome in outcomes {
        match outcome {
            TableOutcome::Reconciled(r) => {
                totals.succeeded += 1;
                totals.duplicates_removed += r.duplicates_removed;
                totals.records_added += r.records_added;
                totals.records_deleted += r.records_deleted;
            }
            TableOutcome::Failed(f) => {
                totals.failed += 1;
                totals.duplicates_removed += f.duplicates_removed;
            }
        }
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::model::{ReconciliationReport, TableFailure};
    use stocktally_core::Value;

    fn record(name: &str, qty: i64, tier: Tier) -> ClassificationRecord {
        ClassificationRecord {
            product_code: Value::from(name),
            product_name: name.to_string(),
            total_quantity: qty,
            share: 0.0,
            cumulative: 0.0,
            tier,
        }
    }

    #[test]
    fn summary_counts() {
        let records = vec![
            record("a", 50, Tier::A),
            record("b", 20, Tier::B),
            record("c", 20, Tier::B),
            record("d", 10, Tier::C),
        ];
        let s = compute_summary(&records);
        assert_eq!(s.products, 4);
        assert_eq!(s.total_quantity, 100);
        assert_eq!(s.count(Tier::A), 1);
        assert_eq!(s.count(Tier::B), 2);
        assert_eq!(s.count(Tier::C), 1);
        assert_eq!(s.tiers[1].percent, 50.0);
        assert_eq!(s.top_product.unwrap().product_name, "a");
    }

    #[test]
    fn empty_tiers_are_reported_as_zero() {
        let s = compute_summary(&[record("a", 5, Tier::C)]);
        assert_eq!(s.tiers.len(), 3);
        assert_eq!(s.count(Tier::A), 0);
        assert_eq!(s.tiers[0].percent, 0.0);
        assert_eq!(s.tiers[2].percent, 100.0);
    }

    #[test]
    fn empty_classification() {
        let s = compute_summary(&[]);
        assert_eq!(s.products, 0);
        assert!(s.top_product.is_none());
    }

    #[test]
    fn batch_totals_include_failed_dedup() {
        let outcomes = vec![
            TableOutcome::Reconciled(ReconciliationReport {
                table: "Products".into(),
                key_column: "id".into(),
                duplicates_removed: 1,
                records_added: 2,
                records_deleted: 3,
                snapshot_duplicates: 0,
            }),
            TableOutcome::Failed(TableFailure {
                table: "Orders".into(),
                kind: FailureKind::SourceUnavailable,
                message: "missing".into(),
                duplicates_removed: 4,
            }),
        ];
        let t = batch_totals(&outcomes);
        assert_eq!(t.tables, 2);
        assert_eq!(t.succeeded, 1);
        assert_eq!(t.failed, 1);
        assert_eq!(t.duplicates_removed, 5);
        assert_eq!(t.records_added, 2);
        assert_eq!(t.records_deleted, 3);
    }
}
