// Ledger report rendering: XLSX, CSV, JSON

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use payledger_ledger::amount::format_cents;
use payledger_ledger::config::{ReportConfig, RESERVED_COLUMNS};
use payledger_ledger::{ConsolidatedRecord, Ledger};
use rust_xlsxwriter::{Format, Workbook};

use crate::error::IoError;

const MAX_COLUMN_WIDTH: usize = 60;

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Identity,
    Name,
    Department,
    Cost,
    Subtotal,
    Total,
}

/// One output column. For cost and subtotal columns the header is also the
/// lookup key on the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportColumn {
    pub header: String,
    pub kind: ColumnKind,
}

/// A rendered cell before it is written to a specific format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell<'a> {
    Text(&'a str),
    Money(i64),
}

impl ReportColumn {
    fn new(header: impl Into<String>, kind: ColumnKind) -> Self {
        Self { header: header.into(), kind }
    }

    pub fn is_monetary(&self) -> bool {
        matches!(self.kind, ColumnKind::Cost | ColumnKind::Subtotal | ColumnKind::Total)
    }

    pub fn cell<'a>(&self, record: &'a ConsolidatedRecord) -> Cell<'a> {
        match self.kind {
            ColumnKind::Identity => Cell::Text(record.identity_key.as_str()),
            ColumnKind::Name => Cell::Text(&record.name),
            ColumnKind::Department => Cell::Text(record.department.as_deref().unwrap_or("")),
            ColumnKind::Cost => Cell::Money(record.cost(&self.header)),
            ColumnKind::Subtotal => Cell::Money(record.subtotal(&self.header)),
            ColumnKind::Total => Cell::Money(record.total),
        }
    }
}

/// Display order of the report columns.
///
/// Identity, name, department (only when some record has one), the primary
/// cost column, then each cost center's members (sorted) followed by its
/// subtotal, then ungrouped cost columns (sorted), then the total.
pub fn report_columns(ledger: &Ledger) -> Vec<ReportColumn> {
    let [identity, name, department] = RESERVED_COLUMNS;
    let mut columns = vec![
        ReportColumn::new(identity, ColumnKind::Identity),
        ReportColumn::new(name, ColumnKind::Name),
    ];
    if ledger.has_departments() {
        columns.push(ReportColumn::new(department, ColumnKind::Department));
    }

    let present: HashSet<&str> = ledger.cost_columns.iter().map(|c| c.name.as_str()).collect();
    let mut placed: HashSet<&str> = HashSet::new();

    if let Some(primary) = ledger.primary_cost_column() {
        columns.push(ReportColumn::new(&primary.name, ColumnKind::Cost));
        placed.insert(primary.name.as_str());
    }

    for center in &ledger.cost_centers {
        let mut members: Vec<&str> = center
            .members
            .iter()
            .map(String::as_str)
            .filter(|m| present.contains(m) && !placed.contains(m))
            .collect();
        members.sort_unstable();
        for member in members {
            placed.insert(member);
            columns.push(ReportColumn::new(member, ColumnKind::Cost));
        }
        columns.push(ReportColumn::new(&center.name, ColumnKind::Subtotal));
    }

    let mut ungrouped: Vec<&str> = ledger
        .cost_columns
        .iter()
        .map(|c| c.name.as_str())
        .filter(|c| !placed.contains(c))
        .collect();
    ungrouped.sort_unstable();
    columns.extend(ungrouped.into_iter().map(|c| ReportColumn::new(c, ColumnKind::Cost)));

    columns.push(ReportColumn::new(&ledger.total_column, ColumnKind::Total));
    columns
}

// ---------------------------------------------------------------------------
// Options + Format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub sheet_name: String,
    /// Excel number format applied to every monetary cell.
    pub currency_format: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        (&ReportConfig::default()).into()
    }
}

impl From<&ReportConfig> for ReportOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            sheet_name: config.sheet_name.clone(),
            currency_format: config.currency_format.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Xlsx,
    Csv,
    Json,
}

impl ReportFormat {
    /// Infer from the output path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "xlsx" => Some(ReportFormat::Xlsx),
            "csv" => Some(ReportFormat::Csv),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Write the ledger as a single-sheet workbook.
pub fn write_xlsx(ledger: &Ledger, path: &Path, options: &ReportOptions) -> Result<(), IoError> {
    let target = path.display().to_string();
    let columns = report_columns(ledger);

    let header_format = Format::new().set_bold();
    let money_format = Format::new().set_num_format(&options.currency_format);

    let mut workbook = Workbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(&options.sheet_name)
        .map_err(|e| IoError::write(&target, e))?;

    let mut widths: Vec<usize> = columns.iter().map(|c| c.header.chars().count()).collect();

    for (col, column) in columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, &column.header, &header_format)
            .map_err(|e| IoError::write(&target, e))?;
    }

    for (row_idx, record) in ledger.records.iter().enumerate() {
        let row = (row_idx + 1) as u32;
        for (col, column) in columns.iter().enumerate() {
            let width = match column.cell(record) {
                Cell::Text(text) => {
                    worksheet
                        .write_string(row, col as u16, text)
                        .map_err(|e| IoError::write(&target, e))?;
                    text.chars().count()
                }
                Cell::Money(cents) => {
                    worksheet
                        .write_number_with_format(row, col as u16, cents as f64 / 100.0, &money_format)
                        .map_err(|e| IoError::write(&target, e))?;
                    money_display_width(cents)
                }
            };
            widths[col] = widths[col].max(width);
        }
    }

    for (col, width) in widths.iter().enumerate() {
        let width = (*width + 2).min(MAX_COLUMN_WIDTH);
        worksheet
            .set_column_width(col as u16, width as f64)
            .map_err(|e| IoError::write(&target, e))?;
    }
    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| IoError::write(&target, e))?;

    workbook.save(path).map_err(|e| IoError::write(&target, e))?;
    log::info!("wrote {} row(s) to {}", ledger.records.len(), target);
    Ok(())
}

/// Write the ledger as CSV. Monetary values are plain decimals like `1234.56`.
pub fn write_csv<W: Write>(ledger: &Ledger, writer: W) -> Result<(), IoError> {
    let columns = report_columns(ledger);
    let mut out = csv::Writer::from_writer(writer);

    out.write_record(columns.iter().map(|c| c.header.as_str()))
        .map_err(|e| IoError::write("<stream>", e))?;

    for record in &ledger.records {
        let fields: Vec<String> = columns
            .iter()
            .map(|column| match column.cell(record) {
                Cell::Text(text) => text.to_string(),
                Cell::Money(cents) => format_cents(cents),
            })
            .collect();
        out.write_record(&fields)
            .map_err(|e| IoError::write("<stream>", e))?;
    }

    out.flush().map_err(|e| IoError::write("<stream>", e))?;
    Ok(())
}

/// Write the whole ledger (meta, columns, records, summary) as pretty JSON.
pub fn write_json<W: Write>(ledger: &Ledger, writer: W) -> Result<(), IoError> {
    serde_json::to_writer_pretty(writer, ledger).map_err(|e| IoError::write("<stream>", e))
}

/// Rough rendered width of `#,##0.00`: digits, separators, decimals.
fn money_display_width(cents: i64) -> usize {
    let plain = format_cents(cents);
    let integer_digits = plain.split('.').next().map_or(0, |s| s.trim_start_matches('-').len());
    plain.len() + integer_digits.saturating_sub(1) / 3
}
