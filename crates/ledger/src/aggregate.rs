use std::collections::{BTreeMap, HashSet};

use crate::error::LedgerError;
use crate::model::{ConsolidatedRecord, CostCenter};

/// Compute cost-center subtotals and the grand total for every record.
///
/// The grand total sums every column in `cost_columns`, grouped or not.
/// A center member no source supplied contributes 0. Returns new records;
/// the input is left as is.
pub fn aggregate(
    records: &[ConsolidatedRecord],
    cost_columns: &[String],
    centers: &[CostCenter],
) -> Result<Vec<ConsolidatedRecord>, LedgerError> {
    if cost_columns.is_empty() {
        return Err(LedgerError::Aggregation(
            "no standardized cost column to sum".into(),
        ));
    }

    let present: HashSet<&str> = cost_columns.iter().map(String::as_str).collect();

    records
        .iter()
        .map(|record| -> Result<ConsolidatedRecord, LedgerError> {
            let total = checked_sum(record, cost_columns.iter().map(String::as_str))?;

            let mut subtotals = BTreeMap::new();
            for center in centers {
                let members = center
                    .members
                    .iter()
                    .map(String::as_str)
                    .filter(|m| present.contains(m));
                subtotals.insert(center.name.clone(), checked_sum(record, members)?);
            }

            Ok(ConsolidatedRecord {
                subtotals,
                total,
                ..record.clone()
            })
        })
        .collect()
}

fn checked_sum<'a>(
    record: &ConsolidatedRecord,
    mut columns: impl Iterator<Item = &'a str>,
) -> Result<i64, LedgerError> {
    columns.try_fold(0i64, |acc, column| {
        acc.checked_add(record.cost(column)).ok_or_else(|| {
            LedgerError::Aggregation(format!(
                "sum overflows for identity '{}' at column '{column}'",
                record.identity_key
            ))
        })
    })
}
