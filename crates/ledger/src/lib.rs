//! `payledger-ledger` - Multi-source cost consolidation engine.
//!
//! Pure engine crate: receives pre-loaded tables and resolved column mappings,
//! returns a consolidated ledger. No CLI or IO dependencies.

pub mod aggregate;
pub mod amount;
pub mod config;
pub mod department;
pub mod error;
pub mod identity;
pub mod mapping;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod standardize;

pub use config::{DedupPolicy, DepartmentFallback, LedgerConfig};
pub use error::LedgerError;
pub use identity::{normalize, IdentityKey};
pub use mapping::{ColumnMapping, MappingResolver};
pub use model::{ConsolidatedRecord, CostCenter, CostColumn, Ledger, LedgerInput, RawTable};
pub use pipeline::{run, run_with_resolver};
