use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::error::LedgerError;
use crate::mapping::{ColumnMapping, StaticMappings};
use crate::model::CostCenter;

/// Output headers the report always emits; cost columns and centers may not reuse them.
pub const RESERVED_COLUMNS: [&str; 3] = ["IdentityKey", "Name", "Department"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub name: String,
    /// Source key of the roster that fixes the record universe.
    pub primary_source: String,
    #[serde(default = "default_total_column")]
    pub total_column: String,
    pub sources: BTreeMap<String, SourceConfig>,
    #[serde(default)]
    pub cost_centers: Vec<CostCenter>,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

fn default_total_column() -> String {
    "Total".into()
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub file: String,
    /// Worksheet to read from workbook files; first sheet when absent.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Column mapping. Sources without one need an external resolver.
    #[serde(default)]
    pub columns: Option<ColumnMapping>,
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// What to do with repeated identity keys inside one non-primary source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Keep every row. Always used for the primary source.
    KeepAll,
    /// First occurrence wins; later rows are treated as re-exports.
    #[default]
    KeepFirst,
    KeepLast,
}

/// Column read for the department when the primary mapping names none.
/// An empty string disables the fallback.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct DepartmentFallback(pub Option<String>);

impl Default for DepartmentFallback {
    fn default() -> Self {
        Self(Some("Department".into()))
    }
}

impl DepartmentFallback {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn column(&self) -> Option<&str> {
        self.0.as_deref().filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub dedup: DedupPolicy,
    #[serde(default)]
    pub department_fallback: DepartmentFallback,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    #[serde(default = "default_currency_format")]
    pub currency_format: String,
}

fn default_sheet_name() -> String {
    "Ledger".into()
}

fn default_currency_format() -> String {
    "#,##0.00".into()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: None,
            sheet_name: default_sheet_name(),
            currency_format: default_currency_format(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LedgerConfig {
    pub fn from_toml(input: &str) -> Result<Self, LedgerError> {
        let config: LedgerConfig =
            toml::from_str(input).map_err(|e| LedgerError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.sources.is_empty() {
            return Err(LedgerError::ConfigValidation(
                "at least one source is required".into(),
            ));
        }

        if !self.sources.contains_key(&self.primary_source) {
            return Err(LedgerError::ConfigValidation(format!(
                "primary_source '{}' is not a configured source",
                self.primary_source
            )));
        }

        if self.policy.dedup == DedupPolicy::KeepAll {
            return Err(LedgerError::ConfigValidation(
                "policy.dedup = \"keep_all\" is reserved for the primary source".into(),
            ));
        }

        let primary_mapped = self
            .sources
            .get(&self.primary_source)
            .is_some_and(|s| s.columns.is_some());
        let any_mapped = self.sources.values().any(|s| s.columns.is_some());
        if any_mapped && !primary_mapped {
            log::warn!(
                "primary source '{}' has no column mapping; an external resolver must supply it",
                self.primary_source
            );
        }

        // Standardized cost column names must be unique across sources
        let mut cost_columns: BTreeMap<&str, &str> = BTreeMap::new();
        for (source_key, source) in &self.sources {
            let Some(ref mapping) = source.columns else { continue };
            let column = mapping.standardized_cost_column.as_str();
            if column.trim().is_empty() {
                return Err(LedgerError::ConfigValidation(format!(
                    "source '{source_key}': standardized_cost must not be empty"
                )));
            }
            if let Some(other) = cost_columns.insert(column, source_key) {
                return Err(LedgerError::ConfigValidation(format!(
                    "cost column '{column}' is used by both '{other}' and '{source_key}'"
                )));
            }
            if RESERVED_COLUMNS.contains(&column) || column == self.total_column {
                return Err(LedgerError::ConfigValidation(format!(
                    "source '{source_key}': cost column '{column}' collides with a reserved column"
                )));
            }
        }

        let mut center_names: HashSet<&str> = HashSet::new();
        for center in &self.cost_centers {
            let name = center.name.as_str();
            if !center_names.insert(name) {
                return Err(LedgerError::ConfigValidation(format!(
                    "cost center '{name}' is defined more than once"
                )));
            }
            if cost_columns.contains_key(name)
                || RESERVED_COLUMNS.contains(&name)
                || name == self.total_column
            {
                return Err(LedgerError::ConfigValidation(format!(
                    "cost center '{name}' collides with a cost or reserved column"
                )));
            }
            for member in &center.members {
                if any_mapped && !cost_columns.contains_key(member.as_str()) {
                    log::warn!(
                        "cost center '{name}': member '{member}' is not provided by any configured source"
                    );
                }
            }
        }

        Ok(())
    }

    /// Mappings declared inline under `[sources.<key>.columns]`.
    pub fn static_mappings(&self) -> StaticMappings {
        let mappings = self
            .sources
            .iter()
            .filter_map(|(key, source)| source.columns.clone().map(|m| (key.clone(), m)))
            .collect();
        StaticMappings::new(mappings)
    }

    /// Which report header a standardized cost column would clash with:
    /// a reserved header, the total column, or a cost center.
    pub fn header_collision(&self, column: &str) -> Option<&str> {
        if let Some(reserved) = RESERVED_COLUMNS.iter().find(|r| **r == column) {
            return Some(*reserved);
        }
        if column == self.total_column {
            return Some(self.total_column.as_str());
        }
        self.cost_centers
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
