use std::collections::BTreeMap;

use stocktally_core::{Key, Value};

use crate::model::DateRange;
use crate::store::SalesFact;

/// Sales of one product inside the requested range.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductTotal {
    pub key: Key,
    pub product_code: Value,
    pub product_name: String,
    pub total_quantity: i64,
}

/// Filter facts to `range` and sum quantity per product identity.
///
/// Output is ordered by product key ascending. The name and code kept for a
/// product are those of its first fact in input order.
pub fn aggregate_sales(facts: &[SalesFact], range: &DateRange) -> Vec<ProductTotal> {
    let mut groups: BTreeMap<Key, ProductTotal> = BTreeMap::new();

    for fact in facts.iter().filter(|f| range.contains(f.order_date)) {
        let key = fact.product_code.key();
        groups
            .entry(key.clone())
            .or_insert_with(|| ProductTotal {
                key,
                product_code: fact.product_code.clone(),
                product_name: fact.product_name.clone(),
                total_quantity: 0,
            })
            .total_quantity += fact.quantity;
    }

    groups.into_values().collect()
}
