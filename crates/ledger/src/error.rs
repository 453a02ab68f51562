use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (unknown primary source, duplicate names, etc.).
    ConfigValidation(String),
    /// One or more mapped columns are absent from a source's raw table.
    SchemaMismatch {
        source: String,
        missing: Vec<String>,
        available: Vec<String>,
    },
    /// A supplied table has no column mapping.
    MappingMissing { source: String },
    /// The primary (roster) source was not supplied.
    PrimaryMissing { source: String },
    /// Two sources map to the same standardized cost column.
    DuplicateCostColumn { column: String, sources: Vec<String> },
    /// Nothing to sum, or a sum left the representable range.
    Aggregation(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::SchemaMismatch { source, missing, available } => {
                let quoted: Vec<String> = missing.iter().map(|c| format!("'{c}'")).collect();
                write!(
                    f,
                    "source '{source}': missing column(s) {} (available: {})",
                    quoted.join(", "),
                    available.join(", ")
                )
            }
            Self::MappingMissing { source } => {
                write!(f, "source '{source}': no column mapping supplied")
            }
            Self::PrimaryMissing { source } => {
                write!(f, "primary source '{source}' was not supplied")
            }
            Self::DuplicateCostColumn { column, sources } => {
                write!(
                    f,
                    "cost column '{column}' is mapped by more than one source: {}",
                    sources.join(", ")
                )
            }
            Self::Aggregation(msg) => write!(f, "aggregation error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}
