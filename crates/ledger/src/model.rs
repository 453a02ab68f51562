use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::IdentityKey;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One source's rows over a named set of columns. Every cell is text;
/// loaders render numeric spreadsheet cells as plain decimal strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<RowView<'_>> {
        self.rows.get(index).map(|values| RowView {
            columns: &self.columns,
            values,
        })
    }
}

/// Borrowed view of one raw row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    columns: &'a [String],
    values: &'a [String],
}

impl<'a> RowView<'a> {
    /// `None` if the table has no such column; `Some("")` for a short row.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        Some(self.values.get(idx).map(String::as_str).unwrap_or(""))
    }
}

/// Pre-loaded tables keyed by source key.
#[derive(Debug, Clone, Default)]
pub struct LedgerInput {
    pub tables: BTreeMap<String, RawTable>,
}

impl LedgerInput {
    pub fn insert(&mut self, source_key: impl Into<String>, table: RawTable) {
        self.tables.insert(source_key.into(), table);
    }
}

// ---------------------------------------------------------------------------
// Standardized
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardizedRow {
    pub name: String,
    pub identity_key: IdentityKey,
    /// Cents. `None` when the cell was blank or not a usable amount.
    pub cost: Option<i64>,
}

/// A source reduced to name, identity key and one cost column.
#[derive(Debug, Clone)]
pub struct StandardizedTable {
    pub source: String,
    pub cost_column: String,
    pub rows: Vec<StandardizedRow>,
}

// ---------------------------------------------------------------------------
// Consolidated
// ---------------------------------------------------------------------------

/// A standardized cost column and the source it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostColumn {
    pub source: String,
    pub name: String,
    pub primary: bool,
}

/// Named subtotal over a configured set of cost columns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CostCenter {
    pub name: String,
    pub members: Vec<String>,
}

/// One roster entry with every cost column, subtotals and the grand total.
/// All amounts are cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidatedRecord {
    pub identity_key: IdentityKey,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub costs: BTreeMap<String, i64>,
    pub subtotals: BTreeMap<String, i64>,
    pub total: i64,
}

impl ConsolidatedRecord {
    pub fn cost(&self, column: &str) -> i64 {
        self.costs.get(column).copied().unwrap_or(0)
    }

    pub fn subtotal(&self, center: &str) -> i64 {
        self.subtotals.get(center).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub duplicates_dropped: usize,
    pub non_numeric_costs: usize,
    /// Costs like `1.234` whose lone dot was read as the decimal point.
    pub ambiguous_costs: usize,
    /// Roster records that found a row in this source.
    pub matched: usize,
    /// Roster records with no row in this source (filled with 0).
    pub unmatched: usize,
    /// Rows of this source whose key is not on the roster.
    pub orphaned: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerSummary {
    pub records: usize,
    pub grand_total: i64,
    pub column_totals: BTreeMap<String, i64>,
    pub center_totals: BTreeMap<String, i64>,
    pub sources: BTreeMap<String, SourceStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerMeta {
    pub config_name: String,
    pub primary_source: String,
    pub engine_version: String,
    pub run_at: String,
    /// SHA-256 over the consolidated records, hex encoded.
    pub fingerprint: String,
}

/// The consolidated ledger handed to report renderers. Renderers borrow it;
/// nothing downstream mutates it.
#[derive(Debug, Clone, Serialize)]
pub struct Ledger {
    pub meta: LedgerMeta,
    pub cost_columns: Vec<CostColumn>,
    pub cost_centers: Vec<CostCenter>,
    pub total_column: String,
    pub records: Vec<ConsolidatedRecord>,
    pub summary: LedgerSummary,
}

impl Ledger {
    pub fn primary_cost_column(&self) -> Option<&CostColumn> {
        self.cost_columns.iter().find(|c| c.primary)
    }

    pub fn has_departments(&self) -> bool {
        self.records.iter().any(|r| r.department.is_some())
    }
}
