use std::collections::HashSet;

use stocktally_core::Dataset;

use crate::model::{Diff, ReconPlan};

/// Key-set difference between a key-unique persisted table and a snapshot.
///
/// Keys are compared positionally (first column of each side) after
/// normalization, so `3`, `3.0` and `"3"` are the same key.
pub fn diff(persisted: &Dataset, snapshot: &Dataset) -> Diff {
    let persisted_keys = persisted.key_set();

    let mut new_keys = HashSet::new();
    let mut snapshot_duplicates = 0;
    let inserts = snapshot.filter_rows(|r| {
        let key = r.key().key();
        if persisted_keys.contains(&key) {
            return false;
        }
        if new_keys.insert(key) {
            true
        } else {
            snapshot_duplicates += 1;
            false
        }
    });

    let snapshot_keys = snapshot.key_set();
    let mut stale_seen = HashSet::new();
    let stale_keys = persisted
        .records()
        .filter(|r| {
            let key = r.key().key();
            !snapshot_keys.contains(&key) && stale_seen.insert(key)
        })
        .map(|r| r.key().clone())
        .collect();

    Diff {
        inserts,
        snapshot_duplicates,
        stale_keys,
    }
}

/// Dedup then diff, without touching storage.
pub fn plan(table: &str, persisted: &Dataset, snapshot: &Dataset) -> ReconPlan {
    let (deduped, duplicates_removed) = persisted.dedup_by_key();
    let diff = diff(&deduped, snapshot);
    let key_column = persisted
        .key_column()
        .or_else(|| snapshot.key_column())
        .unwrap_or_default()
        .to_string();

    ReconPlan {
        table: table.to_string(),
        key_column,
        deduped,
        duplicates_removed,
        diff,
    }
}
