use crate::core::stats;
use crate::domain::model::{format_fixed, CheckOutcome, LogTable};
use serde::Serialize;

pub const MIN_SESSION: &str = "min_session";

/// Spacing between consecutive trials, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalStats {
    pub count: usize,
    pub mean_sec: f64,
    pub min_sec: f64,
    pub max_sec: f64,
}

/// Overview of a trial log: data gaps and timing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSummary {
    pub rows: usize,
    pub columns: usize,
    pub empty_cells: usize,
    /// `None` when the log has no `Time` column.
    pub total_time_sec: Option<f64>,
    pub intervals: Option<IntervalStats>,
}

impl LogSummary {
    pub fn from_table(table: &LogTable) -> Self {
        let time = table.find_column_exact("time").map(|col| table.numeric_column(col));

        let total_time_sec = time.as_ref().map(|t| stats::max(t.iter().copied()));
        let intervals = time.as_ref().map(|t| {
            let d = stats::diffs(t);
            IntervalStats {
                count: d.len(),
                mean_sec: stats::mean_slice(&d),
                min_sec: stats::min(d.iter().copied().map(Some)),
                max_sec: stats::max(d.iter().copied().map(Some)),
            }
        });

        Self {
            rows: table.row_count(),
            columns: table.column_count(),
            empty_cells: table.empty_cell_count(),
            total_time_sec,
            intervals,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        if self.empty_cells > 0 {
            lines.push(format!(
                "WARNING: Found {} empty value(s) in the data",
                self.empty_cells
            ));
        } else {
            lines.push("No empty values found in the data.".to_string());
        }
        lines.push(format!("Rows: {}, Columns: {}", self.rows, self.columns));

        match self.total_time_sec {
            Some(total) => lines.push(format!(
                "Total time: {} minutes ({} seconds)",
                format_fixed(total / 60.0, 2),
                format_fixed(total, 2)
            )),
            None => lines.push("Warning: Could not find Time column".to_string()),
        }

        if let Some(iv) = &self.intervals {
            lines.push(String::new());
            lines.push("Inter-trial lengths (time differences between consecutive rows):".to_string());
            lines.push(format!("  Count: {} intervals", iv.count));
            lines.push(format!(
                "  Mean: {} seconds ({} minutes)",
                format_fixed(iv.mean_sec, 4),
                format_fixed(iv.mean_sec / 60.0, 4)
            ));
            lines.push(format!("  Min: {} seconds", format_fixed(iv.min_sec, 4)));
            lines.push(format!(
                "  Max: {} seconds ({} minutes)",
                format_fixed(iv.max_sec, 4),
                format_fixed(iv.max_sec / 60.0, 4)
            ));
        }

        lines
    }
}

/// A test session must run longer than `min_sec` seconds.
pub fn check_min_session(table: &LogTable, min_sec: f64) -> CheckOutcome {
    let mut outcome = CheckOutcome::new(MIN_SESSION);

    let time = match table.find_column_exact("time") {
        Some(col) => col,
        None => return outcome.warn("Time column not found in log"),
    };

    let max_time = stats::max(table.numeric_column(time));
    let result = max_time > min_sec;
    outcome.say(format!(
        "Time column max value ({} seconds) must be greater than {} seconds: {}",
        format_fixed(max_time, 2),
        format_fixed(min_sec, 0),
        result
    ));
    outcome.finish(result)
}
