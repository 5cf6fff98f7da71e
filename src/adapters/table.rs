use crate::domain::model::{format_number, CellValue, LogTable, NA_TOKENS};
use crate::utils::error::{CheckError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::io::Read;
use std::path::Path;

/// Load a trial log, dispatching on the file extension, and normalize its
/// column names.
///
/// Supported formats:
/// * `.csv` – header row followed by one row per trial
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – first worksheet, first row is the header
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<LogTable> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CheckError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    tracing::debug!("Loading table {} (format: {})", path.display(), ext);

    let table = match ext.as_str() {
        "csv" => read_table_csv(std::fs::File::open(path)?)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_spreadsheet(path)?,
        other => {
            return Err(CheckError::UnsupportedFormat {
                extension: other.to_string(),
            })
        }
    };

    tracing::debug!(
        "Loaded {} rows x {} columns: {:?}",
        table.row_count(),
        table.column_count(),
        table.columns
    );
    Ok(table)
}

/// Parse a comma separated log from any reader.
pub fn read_table_csv<R: Read>(reader: R) -> Result<LogTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(CellValue::infer).collect());
    }

    let mut table = LogTable::new(columns, rows);
    table.normalize_column_names();
    Ok(table)
}

fn load_spreadsheet(path: &Path) -> Result<LogTable> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CheckError::SpreadsheetError(calamine::Error::Msg("workbook has no sheets")))??;

    let mut row_iter = range.rows();
    let columns: Vec<String> = match row_iter.next() {
        Some(header) => header.iter().map(header_name).collect(),
        None => Vec::new(),
    };

    let rows = row_iter
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();

    let mut table = LogTable::new(columns, rows);
    table.normalize_column_names();
    Ok(table)
}

fn header_name(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Float(v) => format_number(*v),
        Data::Int(i) => i.to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(v) => CellValue::Number(*v),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::String(s) if s.trim().is_empty() || NA_TOKENS.contains(&s.trim()) => {
            CellValue::Empty
        }
        Data::String(s) => CellValue::Text(s.trim().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}
