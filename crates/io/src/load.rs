// Source file loading: CSV/TSV and Excel-family workbooks into RawTable

use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use payledger_ledger::{LedgerConfig, LedgerInput, RawTable};

use crate::error::IoError;

/// Load one source file into a raw table.
///
/// The first non-blank row is the header. Fully blank rows are dropped.
/// `sheet` selects a worksheet in workbook formats and is ignored for text
/// formats.
pub fn load_table(path: &Path, sheet: Option<&str>) -> Result<RawTable, IoError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let grid = match extension.as_str() {
        "csv" | "txt" => {
            let content = read_file_as_utf8(path)?;
            let delimiter = sniff_delimiter(&content);
            parse_delimited(path, &content, delimiter)?
        }
        "tsv" => {
            let content = read_file_as_utf8(path)?;
            parse_delimited(path, &content, b'\t')?
        }
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook(path, sheet)?,
        _ => {
            return Err(IoError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            })
        }
    };

    let table = into_table(path, grid)?;
    log::debug!(
        "loaded {}: {} column(s), {} row(s)",
        path.display(),
        table.columns.len(),
        table.len()
    );
    Ok(table)
}

/// Load every configured source. Relative file paths resolve against `base_dir`,
/// normally the directory holding the config file.
pub fn load_sources(config: &LedgerConfig, base_dir: &Path) -> Result<LedgerInput, IoError> {
    let mut input = LedgerInput::default();
    for (source_key, source) in &config.sources {
        let path = base_dir.join(&source.file);
        let table = load_table(&path, source.sheet.as_deref())?;
        log::info!("source '{source_key}': {} row(s) from {}", table.len(), path.display());
        input.insert(source_key.clone(), table);
    }
    Ok(input)
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

/// Pick the field delimiter for a text export.
///
/// Each candidate reads a short sample of non-blank lines. Its header must
/// split into at least two fields; among those, the candidate whose rows
/// most often match the header width wins, then the wider header. Falls back
/// to `,`.
fn sniff_delimiter(content: &str) -> u8 {
    const CANDIDATES: [u8; 4] = [b';', b'\t', b',', b'|'];
    const SAMPLE_LINES: usize = 10;

    let sample = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SAMPLE_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    CANDIDATES
        .iter()
        .filter_map(|&delim| {
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(delim)
                .has_headers(false)
                .flexible(true)
                .from_reader(sample.as_bytes());
            let widths: Vec<usize> = reader.records().map_while(Result::ok).map(|r| r.len()).collect();
            let (&header, rows) = widths.split_first()?;
            if header < 2 {
                return None;
            }
            let agreeing = rows.iter().filter(|&&w| w == header).count();
            Some((delim, agreeing, header))
        })
        // max_by_key keeps the last maximum; reverse so list order breaks ties
        .rev()
        .max_by_key(|&(_, agreeing, header)| (agreeing, header))
        .map_or(b',', |(delim, _, _)| delim)
}

/// Read file and convert to UTF-8, falling back to Windows-1252 for spreadsheet exports.
fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path).map_err(|e| IoError::read(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| IoError::read(path, e))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            log::debug!("{} is not UTF-8; decoded as Windows-1252", path.display());
            Ok(decoded.into_owned())
        }
    }
}

fn parse_delimited(path: &Path, content: &str, delimiter: u8) -> Result<Vec<Vec<String>>, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| IoError::parse(path, e))?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok(grid)
}

// ---------------------------------------------------------------------------
// Workbooks
// ---------------------------------------------------------------------------

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<String>>, IoError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| IoError::read(path, e))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| IoError::EmptyTable { path: path.to_path_buf() })?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IoError::parse(path, format!("sheet '{sheet_name}': {e}")))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // Integers without decimals so "5000" and 5000.0 read alike
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

// ---------------------------------------------------------------------------
// Grid -> RawTable
// ---------------------------------------------------------------------------

fn into_table(path: &Path, grid: Vec<Vec<String>>) -> Result<RawTable, IoError> {
    let mut rows = grid
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()));

    let header = rows
        .next()
        .ok_or_else(|| IoError::EmptyTable { path: path.to_path_buf() })?;
    let columns: Vec<String> = header
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let data: Vec<Vec<String>> = rows.collect();
    if data.is_empty() {
        return Err(IoError::EmptyTable { path: path.to_path_buf() });
    }

    Ok(RawTable::new(columns, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_semicolon() {
        let content = "Nome;CPF;Valor\nAna;111;10,50\nBia;222;3,00\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn sniff_comma_default() {
        assert_eq!(sniff_delimiter("single\nline\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn sniff_prefers_consistent_split() {
        // Decimal commas inside a tab-separated export
        let content = "Nome\tValor\nAna\t10,50\nBia\t3,25\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn sniff_ignores_delimiters_inside_quotes() {
        let content = "\"Nome\",\"Obs\"\n\"Ana\",\"ferias; 10 dias\"\n\"Bia\",\"-\"\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn float_cells_render_like_text() {
        assert_eq!(cell_to_string(&Data::Float(5000.0)), "5000");
        assert_eq!(cell_to_string(&Data::Float(199.9)), "199.9");
        assert_eq!(cell_to_string(&Data::Int(42)), "42");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[test]
    fn blank_rows_and_bom_dropped() {
        let grid = vec![
            vec!["".into(), " ".into()],
            vec!["\u{feff}Nome".into(), " CPF ".into()],
            vec!["Ana".into(), "111".into()],
            vec!["".into(), "".into()],
        ];
        let table = into_table(Path::new("t.csv"), grid).unwrap();
        assert_eq!(table.columns, vec!["Nome".to_string(), "CPF".to_string()]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn header_only_is_empty() {
        let grid = vec![vec!["Nome".into(), "CPF".into()]];
        let err = into_table(Path::new("t.csv"), grid).unwrap_err();
        assert!(matches!(err, IoError::EmptyTable { .. }));
    }
}
