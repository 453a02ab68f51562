use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::aggregate::aggregate;
use crate::config::{DedupPolicy, LedgerConfig};
use crate::department::resolve_department;
use crate::error::LedgerError;
use crate::mapping::{resolve_all, ColumnMapping, MappingResolver};
use crate::merge::merge;
use crate::model::{
    ConsolidatedRecord, CostCenter, CostColumn, Ledger, LedgerInput, LedgerMeta, LedgerSummary,
    SourceStats, StandardizedTable,
};
use crate::standardize::standardize;

/// Consolidate every supplied table into one ledger.
///
/// Either returns a fully populated ledger or fails; nothing partial.
pub fn run(
    config: &LedgerConfig,
    input: &LedgerInput,
    mappings: &BTreeMap<String, ColumnMapping>,
) -> Result<Ledger, LedgerError> {
    for source_key in input.tables.keys() {
        if !mappings.contains_key(source_key) {
            return Err(LedgerError::MappingMissing { source: source_key.clone() });
        }
    }

    let primary_key = config.primary_source.as_str();
    let primary_raw = input
        .tables
        .get(primary_key)
        .ok_or_else(|| LedgerError::PrimaryMissing { source: primary_key.into() })?;

    check_cost_columns(config, input, mappings)?;

    // Standardize
    let mut primary: Option<StandardizedTable> = None;
    let mut secondaries: Vec<StandardizedTable> = Vec::new();
    let mut stats: BTreeMap<String, SourceStats> = BTreeMap::new();

    for (source_key, raw) in &input.tables {
        let mapping = &mappings[source_key];
        let is_primary = source_key == primary_key;
        let dedup = if is_primary { DedupPolicy::KeepAll } else { config.policy.dedup };

        let out = standardize(source_key, raw, mapping, dedup)?;
        log::info!(
            "standardized '{source_key}': {} of {} row(s) kept as '{}'",
            out.stats.rows_kept,
            out.stats.rows_read,
            out.table.cost_column
        );
        stats.insert(source_key.clone(), out.stats);

        if is_primary {
            primary = Some(out.table);
        } else {
            secondaries.push(out.table);
        }
    }

    let primary = primary.ok_or_else(|| LedgerError::PrimaryMissing { source: primary_key.into() })?;

    let mut cost_columns = vec![CostColumn {
        source: primary.source.clone(),
        name: primary.cost_column.clone(),
        primary: true,
    }];
    cost_columns.extend(secondaries.iter().map(|t| CostColumn {
        source: t.source.clone(),
        name: t.cost_column.clone(),
        primary: false,
    }));
    let column_names: Vec<String> = cost_columns.iter().map(|c| c.name.clone()).collect();

    // Merge
    let merged = merge(&primary, &secondaries);
    for (source_key, join) in &merged.joins {
        if let Some(s) = stats.get_mut(source_key) {
            s.matched = join.matched;
            s.unmatched = join.unmatched;
            s.orphaned = join.orphaned;
        }
    }
    if let Some(s) = stats.get_mut(primary_key) {
        s.matched = merged.records.len();
    }

    // Aggregate
    let aggregated = aggregate(&merged.records, &column_names, &config.cost_centers)?;

    // Departments
    let primary_mapping = &mappings[primary_key];
    let records: Vec<ConsolidatedRecord> = aggregated
        .into_iter()
        .enumerate()
        .map(|(index, record)| match primary_raw.row(index) {
            Some(row) => resolve_department(
                record,
                row,
                primary_mapping,
                &config.policy.department_fallback,
            ),
            None => record,
        })
        .collect();

    let summary = summarize(&records, &column_names, &config.cost_centers, stats)?;
    log::info!(
        "ledger '{}': {} record(s), {} cost column(s), grand total {} cents",
        config.name,
        summary.records,
        column_names.len(),
        summary.grand_total
    );

    Ok(Ledger {
        meta: LedgerMeta {
            config_name: config.name.clone(),
            primary_source: config.primary_source.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            fingerprint: fingerprint(&records),
        },
        cost_columns,
        cost_centers: config.cost_centers.clone(),
        total_column: config.total_column.clone(),
        records,
        summary,
    })
}

/// Resolve mappings for every table through `resolver`, then [`run`].
pub fn run_with_resolver<R: MappingResolver + ?Sized>(
    config: &LedgerConfig,
    input: &LedgerInput,
    resolver: &R,
) -> Result<Ledger, LedgerError> {
    let mappings = resolve_all(resolver, input)?;
    run(config, input, &mappings)
}

/// Standardized cost columns must be distinct from each other and from every
/// other report header. Mappings may come from a resolver the config never saw.
fn check_cost_columns(
    config: &LedgerConfig,
    input: &LedgerInput,
    mappings: &BTreeMap<String, ColumnMapping>,
) -> Result<(), LedgerError> {
    let mut by_column: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for source_key in input.tables.keys() {
        if let Some(mapping) = mappings.get(source_key) {
            let column = mapping.standardized_cost_column.as_str();
            if column.trim().is_empty() {
                return Err(LedgerError::ConfigValidation(format!(
                    "source '{source_key}': standardized cost column is empty"
                )));
            }
            if let Some(header) = config.header_collision(column) {
                return Err(LedgerError::ConfigValidation(format!(
                    "source '{source_key}': cost column '{column}' collides with report column '{header}'"
                )));
            }
            by_column.entry(column).or_default().push(source_key.clone());
        }
    }

    match by_column.into_iter().find(|(_, sources)| sources.len() > 1) {
        Some((column, sources)) => Err(LedgerError::DuplicateCostColumn {
            column: column.to_string(),
            sources,
        }),
        None => Ok(()),
    }
}

fn summarize(
    records: &[ConsolidatedRecord],
    cost_columns: &[String],
    centers: &[CostCenter],
    sources: BTreeMap<String, SourceStats>,
) -> Result<LedgerSummary, LedgerError> {
    let overflow = |what: &str| LedgerError::Aggregation(format!("ledger total overflows for '{what}'"));

    let mut column_totals: BTreeMap<String, i64> = BTreeMap::new();
    for column in cost_columns {
        let sum = records
            .iter()
            .try_fold(0i64, |acc, r| acc.checked_add(r.cost(column)))
            .ok_or_else(|| overflow(column.as_str()))?;
        column_totals.insert(column.clone(), sum);
    }

    let mut center_totals: BTreeMap<String, i64> = BTreeMap::new();
    for center in centers {
        let sum = records
            .iter()
            .try_fold(0i64, |acc, r| acc.checked_add(r.subtotal(&center.name)))
            .ok_or_else(|| overflow(center.name.as_str()))?;
        center_totals.insert(center.name.clone(), sum);
    }

    let grand_total = records
        .iter()
        .try_fold(0i64, |acc, r| acc.checked_add(r.total))
        .ok_or_else(|| overflow("grand total"))?;

    Ok(LedgerSummary {
        records: records.len(),
        grand_total,
        column_totals,
        center_totals,
        sources,
    })
}

/// Order-sensitive digest of every record field.
fn fingerprint(records: &[ConsolidatedRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        hasher.update(record.identity_key.as_str().as_bytes());
        hasher.update([0x1fu8]);
        hasher.update(record.name.as_bytes());
        hasher.update([0x1fu8]);
        hasher.update(record.department.as_deref().unwrap_or("").as_bytes());
        for (column, cents) in record.costs.iter().chain(record.subtotals.iter()) {
            hasher.update([0x1fu8]);
            hasher.update(column.as_bytes());
            hasher.update(cents.to_le_bytes());
        }
        hasher.update(record.total.to_le_bytes());
        hasher.update([0x1eu8]);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawTable;

    const CONFIG: &str = r#"
name = "Test"
primary_source = "colaboradores"
total_column = "Custo_Geral_Total"

[sources.colaboradores]
file = "colaboradores.csv"
[sources.colaboradores.columns]
name = "Nome"
identity = "CPF"
cost = "Salario"
standardized_cost = "Salario_Base"

[sources.github]
file = "github.csv"
[sources.github.columns]
name = "Assinante"
identity = "Documento"
cost = "Valor Mensal"
standardized_cost = "Custo_GitHub"

[[cost_centers]]
name = "Centro_Custo_Ferramentas"
members = ["Custo_GitHub"]
"#;

    fn raw(columns: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            columns.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn input() -> LedgerInput {
        let mut input = LedgerInput::default();
        input.insert(
            "colaboradores",
            raw(
                &["Nome", "CPF", "Department", "Salario"],
                &[&["A", "111", "Eng", "5000"], &["B", "222", "Ops", "4000"]],
            ),
        );
        input.insert(
            "github",
            raw(&["Assinante", "Documento", "Valor Mensal"], &[&["A", "1-1-1", "50"]]),
        );
        input
    }

    #[test]
    fn end_to_end() {
        let config = LedgerConfig::from_toml(CONFIG).unwrap();
        let ledger = run_with_resolver(&config, &input(), &config.static_mappings()).unwrap();

        assert_eq!(ledger.records.len(), 2);
        assert_eq!(ledger.cost_columns[0].name, "Salario_Base");
        assert!(ledger.cost_columns[0].primary);
        assert_eq!(ledger.total_column, "Custo_Geral_Total");

        let a = &ledger.records[0];
        assert_eq!(a.cost("Custo_GitHub"), 5_000);
        assert_eq!(a.subtotal("Centro_Custo_Ferramentas"), 5_000);
        assert_eq!(a.total, 505_000);
        assert_eq!(a.department.as_deref(), Some("Eng"));

        let b = &ledger.records[1];
        assert_eq!(b.cost("Custo_GitHub"), 0);
        assert_eq!(b.total, 400_000);

        assert_eq!(ledger.summary.grand_total, 905_000);
        assert_eq!(ledger.summary.column_totals["Custo_GitHub"], 5_000);
        assert_eq!(ledger.summary.center_totals["Centro_Custo_Ferramentas"], 5_000);
        assert_eq!(ledger.summary.sources["github"].matched, 1);
        assert_eq!(ledger.summary.sources["github"].unmatched, 1);
        assert_eq!(ledger.meta.fingerprint.len(), 64);
    }

    #[test]
    fn fingerprint_stable_across_runs() {
        let config = LedgerConfig::from_toml(CONFIG).unwrap();
        let mappings = resolve_all(&config.static_mappings(), &input()).unwrap();
        let first = run(&config, &input(), &mappings).unwrap();
        let second = run(&config, &input(), &mappings).unwrap();
        assert_eq!(first.meta.fingerprint, second.meta.fingerprint);
    }

    #[test]
    fn missing_mapping_aborts() {
        let config = LedgerConfig::from_toml(CONFIG).unwrap();
        let mut mappings = resolve_all(&config.static_mappings(), &input()).unwrap();
        mappings.remove("github");
        let err = run(&config, &input(), &mappings).unwrap_err();
        assert_eq!(err, LedgerError::MappingMissing { source: "github".into() });
    }

    #[test]
    fn missing_primary_aborts() {
        let config = LedgerConfig::from_toml(CONFIG).unwrap();
        let mut input = input();
        input.tables.remove("colaboradores");
        let mappings = resolve_all(&config.static_mappings(), &input).unwrap();
        let err = run(&config, &input, &mappings).unwrap_err();
        assert_eq!(err, LedgerError::PrimaryMissing { source: "colaboradores".into() });
    }

    #[test]
    fn resolver_cost_column_named_like_a_center_aborts() {
        let config = LedgerConfig::from_toml(CONFIG).unwrap();
        let mut mappings = resolve_all(&config.static_mappings(), &input()).unwrap();
        if let Some(m) = mappings.get_mut("github") {
            m.standardized_cost_column = "Centro_Custo_Ferramentas".into();
        }
        let err = run(&config, &input(), &mappings).unwrap_err();
        assert!(matches!(err, LedgerError::ConfigValidation(ref msg) if msg.contains("Centro_Custo_Ferramentas")));
    }

    #[test]
    fn duplicate_cost_column_aborts() {
        let config = LedgerConfig::from_toml(CONFIG).unwrap();
        let mut mappings = resolve_all(&config.static_mappings(), &input()).unwrap();
        if let Some(m) = mappings.get_mut("github") {
            m.standardized_cost_column = "Salario_Base".into();
        }
        let err = run(&config, &input(), &mappings).unwrap_err();
        assert_eq!(
            err,
            LedgerError::DuplicateCostColumn {
                column: "Salario_Base".into(),
                sources: vec!["colaboradores".into(), "github".into()],
            }
        );
    }
}
