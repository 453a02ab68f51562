use crate::config::DepartmentFallback;
use crate::mapping::ColumnMapping;
use crate::model::{ConsolidatedRecord, RowView};

/// Attach the department from the record's roster row.
///
/// Column choice: the mapping's explicit department column when the roster
/// has it, else the fallback column when the roster has that, else none.
/// A blank cell leaves the department unset. Never fails.
pub fn resolve_department(
    record: ConsolidatedRecord,
    roster_row: RowView<'_>,
    mapping: &ColumnMapping,
    fallback: &DepartmentFallback,
) -> ConsolidatedRecord {
    let explicit = mapping
        .department_column
        .as_deref()
        .and_then(|c| roster_row.get(c));
    let value = explicit.or_else(|| fallback.column().and_then(|c| roster_row.get(c)));

    let department = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    ConsolidatedRecord { department, ..record }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::normalize;
    use crate::model::RawTable;
    use std::collections::BTreeMap;

    fn record() -> ConsolidatedRecord {
        ConsolidatedRecord {
            identity_key: normalize("111"),
            name: "Ana".into(),
            department: None,
            costs: BTreeMap::new(),
            subtotals: BTreeMap::new(),
            total: 0,
        }
    }

    fn roster(columns: &[&str], values: &[&str]) -> RawTable {
        RawTable::new(
            columns.iter().map(|s| s.to_string()).collect(),
            vec![values.iter().map(|s| s.to_string()).collect()],
        )
    }

    fn mapping() -> ColumnMapping {
        ColumnMapping::new("Nome", "CPF", "Salario", "Salario_Base")
    }

    #[test]
    fn explicit_column_wins() {
        let t = roster(&["Nome", "Area", "Department"], &["Ana", "Engenharia", "Legacy"]);
        let m = mapping().with_department("Area");
        let out = resolve_department(record(), t.row(0).unwrap(), &m, &DepartmentFallback::default());
        assert_eq!(out.department.as_deref(), Some("Engenharia"));
    }

    #[test]
    fn falls_back_to_named_column() {
        let t = roster(&["Nome", "Department"], &["Ana", "Finance"]);
        let out = resolve_department(record(), t.row(0).unwrap(), &mapping(), &DepartmentFallback::default());
        assert_eq!(out.department.as_deref(), Some("Finance"));
    }

    #[test]
    fn explicit_column_absent_uses_fallback() {
        let t = roster(&["Nome", "Departamento"], &["Ana", "RH"]);
        let m = mapping().with_department("Setor");
        let fallback = DepartmentFallback(Some("Departamento".into()));
        let out = resolve_department(record(), t.row(0).unwrap(), &m, &fallback);
        assert_eq!(out.department.as_deref(), Some("RH"));
    }

    #[test]
    fn nothing_available_leaves_none() {
        let t = roster(&["Nome"], &["Ana"]);
        let out = resolve_department(record(), t.row(0).unwrap(), &mapping(), &DepartmentFallback::default());
        assert_eq!(out.department, None);

        let t = roster(&["Nome", "Department"], &["Ana", "Finance"]);
        let out = resolve_department(record(), t.row(0).unwrap(), &mapping(), &DepartmentFallback::none());
        assert_eq!(out.department, None);
    }

    #[test]
    fn blank_cell_is_none() {
        let t = roster(&["Nome", "Department"], &["Ana", "  "]);
        let out = resolve_department(record(), t.row(0).unwrap(), &mapping(), &DepartmentFallback::default());
        assert_eq!(out.department, None);
    }

    #[test]
    fn other_fields_untouched() {
        let t = roster(&["Department"], &["Ops"]);
        let before = record();
        let out = resolve_department(before.clone(), t.row(0).unwrap(), &mapping(), &DepartmentFallback::default());
        assert_eq!(out.identity_key, before.identity_key);
        assert_eq!(out.name, before.name);
        assert_eq!(out.costs, before.costs);
    }
}
