use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// CellValue
// ---------------------------------------------------------------------------

/// Tokens a dataframe reader treats as a missing value.
pub const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One cell of a trial log, typed the way a spreadsheet reader would see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Empty,
}

impl CellValue {
    /// Infer the type of a raw text cell (CSV).
    pub fn infer(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() || NA_TOKENS.contains(&s) {
            return CellValue::Empty;
        }
        if let Ok(v) = s.parse::<f64>() {
            // "NAN" 之類的拼法也視為缺值
            if v.is_nan() {
                return CellValue::Empty;
            }
            return CellValue::Number(v);
        }
        if s.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }
        CellValue::Text(s.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) if !v.is_nan() => Some(*v),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Text form used for label comparisons (`SlipTrial`, `StressBlock`, ...).
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    /// `false` in the loose sense a dataframe uses: a false flag or a numeric zero.
    pub fn is_false(&self) -> bool {
        match self {
            CellValue::Bool(b) => !*b,
            CellValue::Number(v) => *v == 0.0,
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Number(v) => v.is_nan(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{}", format_number(*v)),
            CellValue::Bool(true) => write!(f, "True"),
            CellValue::Bool(false) => write!(f, "False"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Empty => write!(f, "nan"),
        }
    }
}

/// Integral values print without a fraction, everything else as-is.
pub fn format_number(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.0}", v)
    } else {
        format!("{}", v)
    }
}

/// Float repr the way numpy prints a scalar: integral values keep a `.0`.
pub fn format_float_repr(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        format_number(v)
    }
}

/// `{:.2}` with pandas-style `nan` for missing aggregates.
pub fn format_fixed(v: f64, decimals: usize) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else {
        format!("{:.*}", decimals, v)
    }
}

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

/// Trim, turn spaces into underscores and drop anything outside `[A-Za-z0-9_]`.
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

// ---------------------------------------------------------------------------
// LogTable
// ---------------------------------------------------------------------------

/// A loaded trial log: one row per trial, named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl LogTable {
    /// Rows shorter than the header are padded with `Empty`, longer ones truncated.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn normalize_column_names(&mut self) {
        for column in &mut self.columns {
            *column = normalize_column_name(column);
        }
    }

    pub fn column_name(&self, idx: usize) -> &str {
        &self.columns[idx]
    }

    /// First column whose lowercase name equals `name`.
    pub fn find_column_exact(&self, name: &str) -> Option<usize> {
        let name = name.to_lowercase();
        self.columns.iter().position(|c| c.to_lowercase() == name)
    }

    /// First column whose lowercase name contains `fragment`.
    pub fn find_column_containing(&self, fragment: &str) -> Option<usize> {
        let fragment = fragment.to_lowercase();
        self.columns
            .iter()
            .position(|c| c.to_lowercase().contains(&fragment))
    }

    pub fn columns_containing(&self, fragment: &str) -> Vec<usize> {
        let fragment = fragment.to_lowercase();
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.to_lowercase().contains(&fragment))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        &self.rows[row][col]
    }

    pub fn values(&self, col: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().map(move |row| &row[col])
    }

    /// Numeric view of a column; non-numeric and missing cells are `None`.
    pub fn numeric_column(&self, col: usize) -> Vec<Option<f64>> {
        self.values(col).map(CellValue::as_f64).collect()
    }

    /// Indices of rows whose cell in `col`, as text, equals `label`.
    pub fn rows_labelled(&self, col: usize, label: &str) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row[col].as_text() == label)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn empty_cell_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|v| v.is_empty())
            .count()
    }
}

// ---------------------------------------------------------------------------
// Check results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Ok,
    Error,
    Unsure,
}

/// What a single check found: its pass/fail state and the lines it reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    pub passed: bool,
    pub messages: Vec<String>,
}

impl CheckOutcome {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            messages: Vec::new(),
        }
    }

    pub fn say(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Record a missing-input warning and return the outcome as failed.
    pub fn warn(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!("⚠️ {}: {}", self.name, message);
        self.messages.push(format!("Warning: {}", message));
        self.passed = false;
        self
    }

    pub fn finish(mut self, passed: bool) -> Self {
        self.passed = passed;
        self
    }

    /// `Ok` when passed, otherwise the given failure verdict.
    pub fn verdict_or(&self, failure: Verdict) -> Verdict {
        if self.passed {
            Verdict::Ok
        } else {
            failure
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    #[serde(flatten)]
    pub outcome: CheckOutcome,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub file: String,
    pub checked_at: DateTime<Utc>,
    pub results: Vec<CheckResult>,
}

impl CheckReport {
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.outcome.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("  Nr Slips "), "Nr_Slips");
        assert_eq!(normalize_column_name("Velocity (m/s)"), "Velocity_ms");
        assert_eq!(normalize_column_name("Total-Dropped#"), "TotalDropped");
    }

    #[test]
    fn test_infer_cell_values() {
        assert_eq!(CellValue::infer(""), CellValue::Empty);
        assert_eq!(CellValue::infer(" 3 "), CellValue::Number(3.0));
        assert_eq!(CellValue::infer("2.5"), CellValue::Number(2.5));
        assert_eq!(CellValue::infer("FALSE"), CellValue::Bool(false));
        assert_eq!(CellValue::infer("true"), CellValue::Bool(true));
        assert_eq!(
            CellValue::infer("SlipTrial"),
            CellValue::Text("SlipTrial".to_string())
        );
    }

    #[test]
    fn test_missing_value_tokens_are_empty() {
        for token in ["NaN", "nan", "NA", "N/A", "null", "NULL", "#N/A", "<NA>", " None ", "NAN"] {
            assert_eq!(CellValue::infer(token), CellValue::Empty, "token {token:?}");
        }
        // 只有完全相符才算缺值
        assert_eq!(CellValue::infer("NAME"), CellValue::Text("NAME".to_string()));
        assert_eq!(CellValue::Number(f64::NAN).as_f64(), None);
        assert_eq!(CellValue::Bool(true).as_f64(), Some(1.0));
    }

    #[test]
    fn test_cell_text_and_falsiness() {
        assert_eq!(CellValue::Number(4.0).as_text(), "4");
        assert_eq!(CellValue::Number(4.5).as_text(), "4.5");
        assert_eq!(CellValue::Bool(false).as_text(), "False");
        assert!(CellValue::Bool(false).is_false());
        assert!(CellValue::Number(0.0).is_false());
        assert!(!CellValue::Text("False".to_string()).is_false());
        assert!(!CellValue::Empty.is_false());
    }

    #[test]
    fn test_table_padding_and_lookup() {
        let mut table = LogTable::new(
            vec!["Time ".to_string(), "Nr Slips".to_string(), "Slip Error".to_string()],
            vec![vec![CellValue::Number(1.0)]],
        );
        table.normalize_column_names();

        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.find_column_exact("time"), Some(0));
        assert_eq!(table.find_column_exact("nr_slips"), Some(1));
        assert_eq!(table.find_column_containing("SLIP"), Some(1));
        assert_eq!(table.columns_containing("slip"), vec![1, 2]);
        assert_eq!(table.empty_cell_count(), 2);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(1.25), "1.25");
        assert_eq!(format_number(f64::NAN), "nan");
        assert_eq!(format_fixed(f64::NAN, 2), "nan");
        assert_eq!(format_fixed(3.14159, 2), "3.14");
    }

    #[test]
    fn test_format_float_repr() {
        assert_eq!(format_float_repr(4.0), "4.0");
        assert_eq!(format_float_repr(0.5), "0.5");
        assert_eq!(format_float_repr(-2.0), "-2.0");
        assert_eq!(format_float_repr(f64::NAN), "nan");
    }
}
