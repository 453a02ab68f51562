use std::collections::{BTreeMap, HashMap, HashSet};

use crate::identity::IdentityKey;
use crate::model::{ConsolidatedRecord, StandardizedTable};

/// How one secondary source lined up against the roster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub matched: usize,
    pub unmatched: usize,
    pub orphaned: usize,
}

#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub records: Vec<ConsolidatedRecord>,
    /// Keyed by secondary source key.
    pub joins: BTreeMap<String, JoinStats>,
}

/// Left-join every secondary table onto the roster by identity key.
///
/// Output has exactly one record per primary row, in primary order. Every
/// cost column of every table is present on every record; no match reads 0.
/// Cost column names must be distinct across tables. A secondary with
/// repeated keys contributes its first row per key.
pub fn merge(primary: &StandardizedTable, secondaries: &[StandardizedTable]) -> MergeOutput {
    let mut records: Vec<ConsolidatedRecord> = primary
        .rows
        .iter()
        .map(|row| ConsolidatedRecord {
            identity_key: row.identity_key.clone(),
            name: row.name.clone(),
            department: None,
            costs: BTreeMap::from([(primary.cost_column.clone(), row.cost.unwrap_or(0))]),
            subtotals: BTreeMap::new(),
            total: 0,
        })
        .collect();

    let roster: HashSet<&IdentityKey> = primary.rows.iter().map(|r| &r.identity_key).collect();
    let mut joins = BTreeMap::new();

    for table in secondaries {
        let mut lookup: HashMap<&IdentityKey, Option<i64>> = HashMap::with_capacity(table.rows.len());
        for row in &table.rows {
            lookup.entry(&row.identity_key).or_insert(row.cost);
        }

        let mut stats = JoinStats {
            orphaned: lookup.keys().filter(|k| !roster.contains(*k)).count(),
            ..JoinStats::default()
        };

        for record in &mut records {
            let joined = lookup.get(&record.identity_key).copied();
            match joined {
                Some(_) => stats.matched += 1,
                None => stats.unmatched += 1,
            }
            record
                .costs
                .insert(table.cost_column.clone(), joined.flatten().unwrap_or(0));
        }

        if stats.orphaned > 0 {
            log::debug!(
                "source '{}': {} key(s) not on the roster were ignored",
                table.source,
                stats.orphaned
            );
        }
        joins.insert(table.source.clone(), stats);
    }

    MergeOutput { records, joins }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::normalize;
    use crate::model::StandardizedRow;

    fn row(name: &str, id: &str, cost: Option<i64>) -> StandardizedRow {
        StandardizedRow {
            name: name.into(),
            identity_key: normalize(id),
            cost,
        }
    }

    fn table(source: &str, column: &str, rows: Vec<StandardizedRow>) -> StandardizedTable {
        StandardizedTable {
            source: source.into(),
            cost_column: column.into(),
            rows,
        }
    }

    fn roster() -> StandardizedTable {
        table(
            "colaboradores",
            "Salario_Base",
            vec![row("A", "111", Some(500_000)), row("B", "222", Some(400_000))],
        )
    }

    #[test]
    fn match_and_fill_zero() {
        let tools = table("github", "Custo_GitHub", vec![row("A", "111", Some(5_000))]);
        let out = merge(&roster(), &[tools]);

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].cost("Custo_GitHub"), 5_000);
        assert_eq!(out.records[1].costs.get("Custo_GitHub"), Some(&0));
        assert_eq!(
            out.joins["github"],
            JoinStats { matched: 1, unmatched: 1, orphaned: 0 }
        );
    }

    #[test]
    fn roster_fixes_universe() {
        let gym = table(
            "gympass",
            "Custo_Gympass",
            vec![row("Z", "999", Some(10_000)), row("B", "222", Some(8_000))],
        );
        let out = merge(&roster(), &[gym]);
        assert_eq!(out.records.len(), 2);
        assert!(out.records.iter().all(|r| r.identity_key.as_str() != "999"));
        assert_eq!(out.records[1].cost("Custo_Gympass"), 8_000);
        assert_eq!(out.joins["gympass"].orphaned, 1);
    }

    #[test]
    fn missing_costs_become_zero() {
        let primary = table("colaboradores", "Salario_Base", vec![row("A", "111", None)]);
        let unimed = table("unimed", "Custo_Unimed", vec![row("A", "111", None)]);
        let out = merge(&primary, &[unimed]);
        assert_eq!(out.records[0].cost("Salario_Base"), 0);
        assert_eq!(out.records[0].costs.get("Custo_Unimed"), Some(&0));
        assert_eq!(out.joins["unimed"].matched, 1);
    }

    #[test]
    fn duplicate_roster_rows_each_get_the_match() {
        let primary = table(
            "colaboradores",
            "Salario_Base",
            vec![row("A", "111", Some(1)), row("A", "111", Some(2))],
        );
        let tools = table("github", "Custo_GitHub", vec![row("A", "111", Some(5_000))]);
        let out = merge(&primary, &[tools]);
        assert_eq!(out.records.len(), 2);
        assert!(out.records.iter().all(|r| r.cost("Custo_GitHub") == 5_000));
    }

    #[test]
    fn order_of_secondaries_irrelevant() {
        let a = table("github", "Custo_GitHub", vec![row("A", "111", Some(5_000))]);
        let b = table("unimed", "Custo_Unimed", vec![row("B", "222", Some(30_000))]);
        let forward = merge(&roster(), &[a.clone(), b.clone()]);
        let reverse = merge(&roster(), &[b, a]);
        assert_eq!(forward.records, reverse.records);
        assert_eq!(forward.joins, reverse.joins);
    }

    #[test]
    fn no_secondaries() {
        let out = merge(&roster(), &[]);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].costs.len(), 1);
        assert!(out.joins.is_empty());
    }
}
