// payledger CLI - consolidate per-employee costs from several source files

mod commands;
mod exit_codes;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use payledger_io::{IoError, ReportFormat};
use payledger_ledger::LedgerError;

use exit_codes::{io_exit_code, ledger_exit_code, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "payledger")]
#[command(about = "Consolidate per-employee costs from payroll, tool and benefit exports")]
#[command(version)]
struct Cli {
    /// Log level for diagnostics on stderr (RUST_LOG overrides)
    #[arg(long, global = true, default_value = "warn", value_name = "LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every source, consolidate, and write the report
    #[command(after_help = "\
Examples:
  payledger run rateio.toml
  payledger run rateio.toml -o rateio.xlsx
  payledger run rateio.toml -o rateio.csv
  payledger run rateio.toml --format json -o ledger.json
  payledger run rateio.toml --json > ledger.json

Exit codes:
  0   Ledger written
  2   Usage error (no output target, unknown report extension)
  3   Invalid config
  4   Source missing a mapped column
  5   Source without a column mapping
  6   Totals could not be computed
  10  Cannot read a source file
  11  Cannot write the report")]
    Run {
        /// Ledger config (TOML)
        config: PathBuf,

        /// Report path (default: [report].output from the config)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Report format (default: from the output extension)
        #[arg(long, short = 'f')]
        format: Option<OutputFormat>,

        /// Also print the ledger as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Parse and validate a config without reading any source
    #[command(after_help = "\
Examples:
  payledger validate rateio.toml")]
    Validate {
        /// Ledger config (TOML)
        config: PathBuf,
    },

    /// Print the column names of every configured source
    #[command(after_help = "\
Examples:
  payledger columns rateio.toml
  payledger columns rateio.toml --json")]
    Columns {
        /// Ledger config (TOML)
        config: PathBuf,

        /// Emit a JSON object keyed by source
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Xlsx,
    Csv,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Xlsx => ReportFormat::Xlsx,
            OutputFormat::Csv => ReportFormat::Csv,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::setup_logging(&cli.log_level);

    let result = match cli.command {
        Commands::Run { config, output, format, json } => {
            commands::cmd_run(config, output, format.map(ReportFormat::from), json)
        }
        Commands::Validate { config } => commands::cmd_validate(config),
        Commands::Columns { config, json } => commands::cmd_columns(config, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Create error from a ledger error with the matching exit code and hint.
    pub fn ledger(err: LedgerError) -> Self {
        let hint = match &err {
            LedgerError::SchemaMismatch { .. } => {
                Some("check the mapping against `payledger columns <config>`".to_string())
            }
            LedgerError::MappingMissing { source } => {
                Some(format!("add a [sources.{source}.columns] table to the config"))
            }
            LedgerError::DuplicateCostColumn { .. } => {
                Some("give each source its own standardized_cost name".to_string())
            }
            _ => None,
        };
        Self { code: ledger_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn io(err: IoError) -> Self {
        let hint = match &err {
            IoError::UnsupportedFormat { .. } => {
                Some("supported: csv, tsv, txt, xlsx, xlsm, xls, xlsb, ods".to_string())
            }
            _ => None,
        };
        Self { code: io_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
