use std::collections::{HashMap, HashSet};

use crate::amount::{is_ambiguous_cost, is_invalid_cost, parse_cost};
use crate::config::DedupPolicy;
use crate::error::LedgerError;
use crate::identity::{normalize, IdentityKey};
use crate::mapping::ColumnMapping;
use crate::model::{RawTable, SourceStats, StandardizedRow, StandardizedTable};

/// A standardized table plus what standardization did to it.
#[derive(Debug, Clone)]
pub struct Standardized {
    pub table: StandardizedTable,
    pub stats: SourceStats,
}

/// Reduce one source to `Name`, `IdentityKey` and its standardized cost column.
///
/// Fails with [`LedgerError::SchemaMismatch`] naming every mapped column the
/// raw table lacks. `dedup` decides what happens to repeated identity keys;
/// the roster is standardized with [`DedupPolicy::KeepAll`].
pub fn standardize(
    source_key: &str,
    raw: &RawTable,
    mapping: &ColumnMapping,
    dedup: DedupPolicy,
) -> Result<Standardized, LedgerError> {
    let missing: Vec<String> = mapping
        .required_columns()
        .iter()
        .filter(|c| !raw.has_column(c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LedgerError::SchemaMismatch {
            source: source_key.into(),
            missing,
            available: raw.columns.clone(),
        });
    }

    let mut rows = Vec::with_capacity(raw.len());
    let mut non_numeric = 0;
    let mut ambiguous = 0;

    for index in 0..raw.len() {
        let Some(view) = raw.row(index) else { continue };
        let name = view.get(&mapping.name_column).unwrap_or("");
        let identity = view.get(&mapping.identity_column).unwrap_or("");
        let cost_cell = view.get(&mapping.cost_column).unwrap_or("");

        if is_invalid_cost(cost_cell) {
            non_numeric += 1;
        } else if is_ambiguous_cost(cost_cell) {
            ambiguous += 1;
        }

        rows.push(StandardizedRow {
            name: name.trim().to_string(),
            identity_key: normalize(identity),
            cost: parse_cost(cost_cell),
        });
    }

    let rows_read = rows.len();
    let rows = dedupe(rows, dedup);
    let duplicates_dropped = rows_read - rows.len();

    if non_numeric > 0 {
        log::debug!("source '{source_key}': {non_numeric} non-numeric cost value(s) coerced to 0");
    }
    if ambiguous > 0 {
        log::debug!(
            "source '{source_key}': {ambiguous} cost value(s) like '1.234' read with '.' as the decimal point"
        );
    }
    if duplicates_dropped > 0 {
        log::debug!("source '{source_key}': dropped {duplicates_dropped} duplicate identity row(s) ({dedup:?})");
    }

    Ok(Standardized {
        stats: SourceStats {
            rows_read,
            rows_kept: rows.len(),
            duplicates_dropped,
            non_numeric_costs: non_numeric,
            ambiguous_costs: ambiguous,
            ..SourceStats::default()
        },
        table: StandardizedTable {
            source: source_key.into(),
            cost_column: mapping.standardized_cost_column.clone(),
            rows,
        },
    })
}

/// Apply a dedup policy, keeping surviving rows in their original order.
fn dedupe(rows: Vec<StandardizedRow>, policy: DedupPolicy) -> Vec<StandardizedRow> {
    match policy {
        DedupPolicy::KeepAll => rows,
        DedupPolicy::KeepFirst => {
            let mut seen: HashSet<IdentityKey> = HashSet::new();
            rows.into_iter()
                .filter(|r| seen.insert(r.identity_key.clone()))
                .collect()
        }
        DedupPolicy::KeepLast => {
            let mut last: HashMap<&IdentityKey, usize> = HashMap::new();
            for (i, r) in rows.iter().enumerate() {
                last.insert(&r.identity_key, i);
            }
            let keep: HashSet<usize> = last.into_values().collect();
            rows.into_iter()
                .enumerate()
                .filter(|(i, _)| keep.contains(i))
                .map(|(_, r)| r)
                .collect()
        }
    }
}
