//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                                  |
//! |---------|-----------|----------------------------------------------|
//! | 0       | Universal | Success                                      |
//! | 1       | Universal | General error (unspecified)                  |
//! | 2       | Universal | CLI usage error (bad args, no output target) |
//! | 3-9     | ledger    | Config, schema, mapping, aggregation         |
//! | 10-19   | io        | Reading sources, writing reports             |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `CliError::ledger` or `CliError::io`

use payledger_io::IoError;
use payledger_ledger::LedgerError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
#[allow(dead_code)]
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, no output target, unknown report extension.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Ledger (3-9)
// =============================================================================

/// Config is not valid TOML, fails validation, or two sources share a cost column.
pub const EXIT_LEDGER_INVALID_CONFIG: u8 = 3;

/// A source file lacks a column its mapping names.
pub const EXIT_LEDGER_SCHEMA_MISMATCH: u8 = 4;

/// A source has no column mapping.
pub const EXIT_LEDGER_MAPPING_MISSING: u8 = 5;

/// Totals could not be computed (no cost column, overflow).
pub const EXIT_LEDGER_AGGREGATION: u8 = 6;

// =============================================================================
// IO (10-19)
// =============================================================================

/// A config or source file is missing, unreadable, empty, or in an unknown format.
pub const EXIT_IO_READ: u8 = 10;

/// The report could not be written.
pub const EXIT_IO_WRITE: u8 = 11;

/// Map a ledger error to its exit code.
pub fn ledger_exit_code(err: &LedgerError) -> u8 {
    match err {
        LedgerError::ConfigParse(_)
        | LedgerError::ConfigValidation(_)
        | LedgerError::PrimaryMissing { .. }
        | LedgerError::DuplicateCostColumn { .. } => EXIT_LEDGER_INVALID_CONFIG,
        LedgerError::SchemaMismatch { .. } => EXIT_LEDGER_SCHEMA_MISMATCH,
        LedgerError::MappingMissing { .. } => EXIT_LEDGER_MAPPING_MISSING,
        LedgerError::Aggregation(_) => EXIT_LEDGER_AGGREGATION,
    }
}

/// Map an IO error to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Write { .. } => EXIT_IO_WRITE,
        IoError::Read { .. }
        | IoError::Parse { .. }
        | IoError::EmptyTable { .. }
        | IoError::UnsupportedFormat { .. } => EXIT_IO_READ,
    }
}
