use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::model::LedgerInput;

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Which original columns of one source hold the name, the fiscal identifier
/// and the monetary amount, and what the amount column is called afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnMapping {
    #[serde(rename = "name")]
    pub name_column: String,
    #[serde(rename = "identity")]
    pub identity_column: String,
    #[serde(rename = "cost")]
    pub cost_column: String,
    #[serde(rename = "standardized_cost")]
    pub standardized_cost_column: String,
    /// Explicit department column. Only read on the primary source.
    #[serde(rename = "department", default, skip_serializing_if = "Option::is_none")]
    pub department_column: Option<String>,
}

impl ColumnMapping {
    pub fn new(
        name_column: impl Into<String>,
        identity_column: impl Into<String>,
        cost_column: impl Into<String>,
        standardized_cost_column: impl Into<String>,
    ) -> Self {
        Self {
            name_column: name_column.into(),
            identity_column: identity_column.into(),
            cost_column: cost_column.into(),
            standardized_cost_column: standardized_cost_column.into(),
            department_column: None,
        }
    }

    pub fn with_department(mut self, column: impl Into<String>) -> Self {
        self.department_column = Some(column.into());
        self
    }

    /// The three original columns a raw table must expose.
    pub fn required_columns(&self) -> [&str; 3] {
        [
            self.name_column.as_str(),
            self.identity_column.as_str(),
            self.cost_column.as_str(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Resolver seam
// ---------------------------------------------------------------------------

/// Produces the column mapping for one source from its column names.
///
/// Implementations may be slow or rate-limited (an inference service, a
/// human in the loop); the engine only ever sees the resolved mappings.
pub trait MappingResolver {
    fn resolve_mapping(
        &self,
        source_key: &str,
        column_names: &[String],
    ) -> Result<ColumnMapping, LedgerError>;
}

/// Mappings declared up front, e.g. in the `[sources.*.columns]` config tables.
#[derive(Debug, Clone, Default)]
pub struct StaticMappings {
    mappings: BTreeMap<String, ColumnMapping>,
}

impl StaticMappings {
    pub fn new(mappings: BTreeMap<String, ColumnMapping>) -> Self {
        Self { mappings }
    }

    pub fn insert(&mut self, source_key: impl Into<String>, mapping: ColumnMapping) {
        self.mappings.insert(source_key.into(), mapping);
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl MappingResolver for StaticMappings {
    fn resolve_mapping(
        &self,
        source_key: &str,
        _column_names: &[String],
    ) -> Result<ColumnMapping, LedgerError> {
        self.mappings
            .get(source_key)
            .cloned()
            .ok_or_else(|| LedgerError::MappingMissing { source: source_key.into() })
    }
}

/// Memoizes an inner resolver per (source key, column list).
pub struct CachedResolver<R> {
    inner: R,
    cache: RefCell<HashMap<(String, Vec<String>), ColumnMapping>>,
}

impl<R: MappingResolver> CachedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, cache: RefCell::new(HashMap::new()) }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: MappingResolver> MappingResolver for CachedResolver<R> {
    fn resolve_mapping(
        &self,
        source_key: &str,
        column_names: &[String],
    ) -> Result<ColumnMapping, LedgerError> {
        let key = (source_key.to_string(), column_names.to_vec());
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(hit.clone());
        }

        // Errors are not cached; a failed resolution is retried next call.
        let mapping = self.inner.resolve_mapping(source_key, column_names)?;
        self.cache.borrow_mut().insert(key, mapping.clone());
        Ok(mapping)
    }
}

/// Resolve a mapping for every supplied table, in source-key order.
pub fn resolve_all<R: MappingResolver + ?Sized>(
    resolver: &R,
    input: &LedgerInput,
) -> Result<BTreeMap<String, ColumnMapping>, LedgerError> {
    let mut out = BTreeMap::new();
    for (source_key, table) in &input.tables {
        let mapping = resolver.resolve_mapping(source_key, &table.columns)?;
        log::debug!(
            "mapping for '{source_key}': name='{}' identity='{}' cost='{}' -> '{}'",
            mapping.name_column,
            mapping.identity_column,
            mapping.cost_column,
            mapping.standardized_cost_column
        );
        out.insert(source_key.clone(), mapping);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawTable;
    use std::cell::Cell;

    struct CountingResolver {
        calls: Cell<usize>,
    }

    impl MappingResolver for CountingResolver {
        fn resolve_mapping(
            &self,
            source_key: &str,
            _column_names: &[String],
        ) -> Result<ColumnMapping, LedgerError> {
            self.calls.set(self.calls.get() + 1);
            Ok(ColumnMapping::new("Nome", "CPF", "Valor", format!("Custo_{source_key}")))
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn static_resolves_known_source() {
        let mut mappings = StaticMappings::default();
        mappings.insert("github", ColumnMapping::new("Assinante", "Documento", "Valor Mensal", "Custo_GitHub"));
        let m = mappings.resolve_mapping("github", &[]).unwrap();
        assert_eq!(m.standardized_cost_column, "Custo_GitHub");
        assert_eq!(m.required_columns(), ["Assinante", "Documento", "Valor Mensal"]);
    }

    #[test]
    fn static_unknown_source_is_mapping_missing() {
        let mappings = StaticMappings::default();
        let err = mappings.resolve_mapping("unimed", &[]).unwrap_err();
        assert_eq!(err, LedgerError::MappingMissing { source: "unimed".into() });
    }

    #[test]
    fn cached_calls_inner_once_per_schema() {
        let resolver = CachedResolver::new(CountingResolver { calls: Cell::new(0) });
        let cols = columns(&["Nome", "CPF", "Valor"]);

        resolver.resolve_mapping("gympass", &cols).unwrap();
        resolver.resolve_mapping("gympass", &cols).unwrap();
        assert_eq!(resolver.cached_len(), 1);

        // Different schema for the same source is a different entry
        resolver.resolve_mapping("gympass", &columns(&["Nome", "CPF", "Valor", "Plano"])).unwrap();
        assert_eq!(resolver.cached_len(), 2);
        assert_eq!(resolver.into_inner().calls.get(), 2);
    }

    #[test]
    fn resolve_all_fails_on_first_missing() {
        let mut mappings = StaticMappings::default();
        mappings.insert("colaboradores", ColumnMapping::new("Nome", "CPF", "Salario", "Salario_Base"));

        let mut input = LedgerInput::default();
        input.tables.insert("colaboradores".into(), RawTable::new(columns(&["Nome", "CPF", "Salario"]), vec![]));
        input.tables.insert("github".into(), RawTable::new(columns(&["Assinante"]), vec![]));

        let err = resolve_all(&mappings, &input).unwrap_err();
        assert_eq!(err, LedgerError::MappingMissing { source: "github".into() });
    }

    #[test]
    fn deserialize_from_toml_table() {
        let m: ColumnMapping = toml::from_str(
            r#"
name = "Nome"
identity = "CPF"
cost = "Salario"
standardized_cost = "Salario_Base"
department = "Departamento"
"#,
        )
        .unwrap();
        assert_eq!(m, ColumnMapping::new("Nome", "CPF", "Salario", "Salario_Base").with_department("Departamento"));
    }
}
