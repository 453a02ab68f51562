use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use payledger_io::{load_sources, write_csv, write_json, write_xlsx, IoError, ReportFormat, ReportOptions};
use payledger_ledger::amount::format_cents;
use payledger_ledger::{run_with_resolver, Ledger, LedgerConfig, LedgerError};

use crate::CliError;

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(
    config_path: PathBuf,
    output: Option<PathBuf>,
    format: Option<ReportFormat>,
    json_output: bool,
) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;

    // Resolve the report target before touching any source
    let output = output.or_else(|| config.report.output.as_ref().map(|p| base_dir.join(p)));
    let target = match output {
        Some(path) => {
            let format = format.or_else(|| ReportFormat::from_path(&path)).ok_or_else(|| {
                CliError::usage(format!("cannot infer report format from {}", path.display()))
                    .with_hint("pass --format xlsx|csv|json")
            })?;
            Some((path, format))
        }
        None if json_output => None,
        None => {
            return Err(CliError::usage("no report output")
                .with_hint("pass -o PATH, set [report].output in the config, or use --json"))
        }
    };

    let input = load_sources(&config, &base_dir).map_err(CliError::io)?;
    log::info!("loaded {} source table(s)", input.tables.len());
    let ledger =
        run_with_resolver(&config, &input, &config.static_mappings()).map_err(CliError::ledger)?;

    if let Some((path, format)) = target {
        log::debug!("writing {format:?} report to {}", path.display());
        write_report(&ledger, &path, format, &ReportOptions::from(&config.report))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write_json(&ledger, &mut handle).map_err(CliError::io)?;
        writeln!(handle).map_err(|e| CliError::io(stream_error(e)))?;
    }

    print_summary(&ledger);
    Ok(())
}

fn write_report(
    ledger: &Ledger,
    path: &Path,
    format: ReportFormat,
    options: &ReportOptions,
) -> Result<(), CliError> {
    let write_err = |e: io::Error| {
        CliError::io(IoError::Write { target: path.display().to_string(), message: e.to_string() })
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    if format == ReportFormat::Xlsx {
        return write_xlsx(ledger, path, options).map_err(CliError::io);
    }

    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    let written = match format {
        ReportFormat::Csv => write_csv(ledger, &mut writer),
        _ => write_json(ledger, &mut writer),
    };
    written.map_err(CliError::io)?;
    writer.flush().map_err(write_err)
}

/// Human summary to stderr.
fn print_summary(ledger: &Ledger) {
    let s = &ledger.summary;
    eprintln!(
        "{} record(s) from {} source(s), {} cost column(s), grand total {}",
        s.records,
        s.sources.len(),
        ledger.cost_columns.len(),
        format_cents(s.grand_total),
    );
    for (name, total) in &s.center_totals {
        eprintln!("  {name}: {}", format_cents(*total));
    }
    for (source, stats) in &s.sources {
        if stats.orphaned > 0 || stats.non_numeric_costs > 0 || stats.duplicates_dropped > 0 {
            eprintln!(
                "source '{source}': {} not on roster, {} non-numeric cost(s), {} duplicate(s) dropped",
                stats.orphaned, stats.non_numeric_costs, stats.duplicates_dropped,
            );
        }
    }
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, _) = load_config(&config_path)?;

    // The CLI resolves mappings from the config alone
    if let Some((source, _)) = config.sources.iter().find(|(_, s)| s.columns.is_none()) {
        return Err(CliError::ledger(LedgerError::MappingMissing { source: source.clone() }));
    }

    println!(
        "ok: '{}': {} source(s), primary '{}', {} cost center(s)",
        config.name,
        config.sources.len(),
        config.primary_source,
        config.cost_centers.len(),
    );
    Ok(())
}

// ============================================================================
// columns
// ============================================================================

pub fn cmd_columns(config_path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let input = load_sources(&config, &base_dir).map_err(CliError::io)?;

    let columns: BTreeMap<&str, &[String]> = input
        .tables
        .iter()
        .map(|(source, table)| (source.as_str(), table.columns.as_slice()))
        .collect();

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if json_output {
        let json = serde_json::to_string_pretty(&columns).map_err(|e| CliError::io(stream_error(e)))?;
        writeln!(handle, "{json}").map_err(|e| CliError::io(stream_error(e)))?;
    } else {
        for (source, names) in &columns {
            writeln!(handle, "{source}: {}", names.join(", ")).map_err(|e| CliError::io(stream_error(e)))?;
        }
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Read and validate the config. Returns it with the directory that source
/// paths resolve against.
fn load_config(config_path: &Path) -> Result<(LedgerConfig, PathBuf), CliError> {
    let text = std::fs::read_to_string(config_path).map_err(|e| {
        CliError::io(IoError::Read { path: config_path.to_path_buf(), message: e.to_string() })
    })?;
    let config = LedgerConfig::from_toml(&text).map_err(CliError::ledger)?;
    log::info!("config '{}' from {}: {} source(s)", config.name, config_path.display(), config.sources.len());
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    Ok((config, base_dir))
}

fn stream_error(err: impl std::fmt::Display) -> IoError {
    IoError::Write { target: "<stdout>".into(), message: err.to_string() }
}
