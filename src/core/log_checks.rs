//! Sanity checks for a single trial log.
//!
//! Every check reads the table, never mutates it, and reports through a
//! [`CheckOutcome`]. A check whose columns are missing fails with a warning
//! instead of returning an error.

use crate::config::toml_config::CheckConfig;
use crate::core::stats;
use crate::domain::model::{format_fixed, format_number, CheckOutcome, LogTable};

pub const NRSLIPS_TOTAL: &str = "nrslips_total";
pub const TOTALDROPPED_EQUALS_SLIPS: &str = "totaldropped_equals_slips";
pub const STRESS_DROPPED: &str = "stress_dropped";
pub const VELOCITY_COMPARISON: &str = "velocity_comparison";
pub const STRESS_BLOCK_VELOCITY: &str = "stress_block_velocity";
pub const STRESS_BLOCK_BALANCE: &str = "stress_block_balance";
pub const SLIP_TRIAL_SLIPS: &str = "slip_trial_slips";
pub const TRIAL_DURATION: &str = "trial_duration";

/// Trial type column: `TrialType` itself, otherwise the first column that
/// mentions a trial or block type.
fn trial_type_column(table: &LogTable) -> Option<usize> {
    table.find_column_exact("trialtype").or_else(|| {
        table.columns.iter().position(|c| {
            let lower = c.to_lowercase();
            lower.contains("trialtype") || lower.contains("blocktype")
        })
    })
}

fn column_names(table: &LogTable, cols: &[usize]) -> Vec<String> {
    cols.iter().map(|&c| table.column_name(c).to_string()).collect()
}

/// Sum of `cols` over `rows`, skipping non-numeric cells.
fn sum_over(table: &LogTable, rows: &[usize], cols: &[usize]) -> f64 {
    stats::sum(
        rows.iter()
            .flat_map(|&r| cols.iter().map(move |&c| table.cell(r, c).as_f64())),
    )
}

fn mean_over(table: &LogTable, rows: &[usize], col: usize) -> f64 {
    stats::mean(rows.iter().map(|&r| table.cell(r, col).as_f64()))
}

fn all_rows(table: &LogTable) -> Vec<usize> {
    (0..table.row_count()).collect()
}

/// `NrSlips` must equal the sum of the other slip columns in every row.
pub fn check_nrslips_total(table: &LogTable, _config: &CheckConfig) -> CheckOutcome {
    let mut outcome = CheckOutcome::new(NRSLIPS_TOTAL);

    let nrslips = table.find_column_exact("nrslips");
    let others: Vec<usize> = table
        .columns_containing("slip")
        .into_iter()
        .filter(|&c| table.column_name(c).to_lowercase() != "nrslips")
        .collect();

    let nrslips = match nrslips {
        Some(col) if !others.is_empty() => col,
        _ => return outcome.warn("Could not find NrSlips or other slip columns"),
    };

    let mismatches = (0..table.row_count())
        .filter(|&r| {
            let other_sum = sum_over(table, &[r], &others);
            table.cell(r, nrslips).as_f64() != Some(other_sum)
        })
        .count();

    let matches = mismatches == 0;
    outcome.say(format!(
        "NrSlips matches sum of other slip columns: {}",
        matches
    ));
    if mismatches > 0 {
        outcome.say(format!("Mismatches found in {} row(s)", mismatches));
    }
    outcome.finish(matches)
}

/// The final `TotalDropped` value must equal all slips counted over the session.
pub fn check_totaldropped_equals_slips(table: &LogTable, _config: &CheckConfig) -> CheckOutcome {
    let mut outcome = CheckOutcome::new(TOTALDROPPED_EQUALS_SLIPS);

    let total_dropped = table.find_column_exact("totaldropped");
    let slip_cols = table.columns_containing("slip");

    let total_dropped = match total_dropped {
        Some(col) if !slip_cols.is_empty() => col,
        _ => return outcome.warn("Could not find TotalDropped or slip columns"),
    };
    if table.is_empty() {
        return outcome.warn("Log has no rows to compare");
    }

    let total_slips = sum_over(table, &all_rows(table), &slip_cols);
    let final_dropped = table.cell(table.row_count() - 1, total_dropped).as_f64();
    let matches = final_dropped == Some(total_slips);

    outcome.say(format!(
        "Final TotalDropped: {}, all slips: {}",
        final_dropped.map(format_number).unwrap_or_else(|| "nan".to_string()),
        format_number(total_slips)
    ));
    outcome.say(format!(
        "Total dropped column final number equals all slips: {}",
        matches
    ));
    outcome.finish(matches)
}

/// More items must be dropped during stress blocks than outside them.
pub fn check_stress_dropped(table: &LogTable, config: &CheckConfig) -> CheckOutcome {
    let mut outcome = CheckOutcome::new(STRESS_DROPPED);

    let (total_dropped, block_type) = match (
        table.find_column_exact("totaldropped"),
        table.find_column_exact("blocktype"),
    ) {
        (Some(td), Some(bt)) => (td, bt),
        _ => return outcome.warn("Could not find TotalDropped or BlockType column"),
    };

    let labels = &config.labels;
    let stress_rows = table.rows_labelled(block_type, &labels.stress_block);
    let non_stress_rows = table.rows_labelled(block_type, &labels.non_stress_block);
    let stress_dropped = sum_over(table, &stress_rows, &[total_dropped]);
    let non_stress_dropped = sum_over(table, &non_stress_rows, &[total_dropped]);

    let result = stress_dropped > non_stress_dropped;
    outcome.say(format!(
        "{} total dropped: {}, {} total dropped: {}",
        labels.stress_block,
        format_number(stress_dropped),
        labels.non_stress_block,
        format_number(non_stress_dropped)
    ));
    outcome.say(format!("Stress has more dropped: {}", result));
    outcome.finish(result)
}

/// Non-slip trials must be faster on average than slip trials.
pub fn check_velocity_comparison(table: &LogTable, config: &CheckConfig) -> CheckOutcome {
    let mut outcome = CheckOutcome::new(VELOCITY_COMPARISON);

    let (velocity, trial_type) = match (
        table.find_column_containing("velocity"),
        trial_type_column(table),
    ) {
        (Some(v), Some(t)) => (v, t),
        _ => return outcome.warn("Could not find velocity or trial type column"),
    };

    let labels = &config.labels;
    let slip_avg = mean_over(table, &table.rows_labelled(trial_type, &labels.slip_trial), velocity);
    let non_slip_avg = mean_over(
        table,
        &table.rows_labelled(trial_type, &labels.non_slip_trial),
        velocity,
    );

    // NaN 比較結果為 false
    let result = non_slip_avg > slip_avg;
    outcome.say(format!(
        "Slip trials avg velocity: {}, Non-slip trials avg velocity: {}",
        format_fixed(slip_avg, 2),
        format_fixed(non_slip_avg, 2)
    ));
    outcome.say(format!("Non-slip trials are faster: {}", result));
    outcome.finish(result)
}

/// Informational: mean velocity in stress and non-stress blocks.
pub fn check_stress_block_velocity(table: &LogTable, config: &CheckConfig) -> CheckOutcome {
    let mut outcome = CheckOutcome::new(STRESS_BLOCK_VELOCITY);

    let (velocity, block_type) = match (
        table.find_column_containing("velocity"),
        table.find_column_exact("blocktype"),
    ) {
        (Some(v), Some(b)) => (v, b),
        _ => return outcome.warn("Could not find velocity or block type column"),
    };

    let labels = &config.labels;
    let stress_avg = mean_over(
        table,
        &table.rows_labelled(block_type, &labels.stress_block),
        velocity,
    );
    let non_stress_avg = mean_over(
        table,
        &table.rows_labelled(block_type, &labels.non_stress_block),
        velocity,
    );

    outcome.say(format!(
        "{} avg velocity: {}, {} avg velocity: {}",
        labels.stress_block,
        format_fixed(stress_avg, 2),
        labels.non_stress_block,
        format_fixed(non_stress_avg, 2)
    ));
    outcome.finish(true)
}

/// Outside training, stress and non-stress blocks must have the same number of trials.
pub fn check_stress_block_balance(table: &LogTable, config: &CheckConfig) -> CheckOutcome {
    let mut outcome = CheckOutcome::new(STRESS_BLOCK_BALANCE);

    let (training, block_type) = match (
        table.find_column_exact("training"),
        table.find_column_exact("blocktype"),
    ) {
        (Some(t), Some(b)) => (t, b),
        _ => return outcome.warn("Could not find Training or BlockType column"),
    };

    let labels = &config.labels;
    let (mut stress_count, mut non_stress_count) = (0usize, 0usize);
    for r in (0..table.row_count()).filter(|&r| table.cell(r, training).is_false()) {
        let block = table.cell(r, block_type).as_text();
        if block == labels.stress_block {
            stress_count += 1;
        } else if block == labels.non_stress_block {
            non_stress_count += 1;
        }
    }

    let result = stress_count == non_stress_count;
    outcome.say(format!(
        "NonTraining: {} count: {}, {} count: {}",
        labels.stress_block, stress_count, labels.non_stress_block, non_stress_count
    ));
    outcome.say(format!("Equal counts: {}", result));
    outcome.finish(result)
}

/// Slip trials must contain more slips in total than non-slip trials.
pub fn check_slip_trial_slips(table: &LogTable, config: &CheckConfig) -> CheckOutcome {
    let mut outcome = CheckOutcome::new(SLIP_TRIAL_SLIPS);

    let slip_cols = table.columns_containing("slip");
    let trial_type = trial_type_column(table);

    let trial_type = match trial_type {
        Some(col) if !slip_cols.is_empty() => col,
        _ => {
            return outcome.warn(format!(
                "Could not find required columns. Slip columns: {:?}, Trial type: {:?}",
                column_names(table, &slip_cols),
                trial_type.map(|c| table.column_name(c).to_string())
            ))
        }
    };

    let labels = &config.labels;
    let slip_total = sum_over(
        table,
        &table.rows_labelled(trial_type, &labels.slip_trial),
        &slip_cols,
    );
    let non_slip_total = sum_over(
        table,
        &table.rows_labelled(trial_type, &labels.non_slip_trial),
        &slip_cols,
    );

    let result = slip_total > non_slip_total;
    outcome.say(format!(
        "Slips in Slip trials total: {}, Slips in Non-slip trials total: {}",
        format_number(slip_total),
        format_number(non_slip_total)
    ));
    outcome.say(format!("Slip trials have more slips: {}", result));
    outcome.finish(result)
}

/// Average trial length and total session length; the session must last
/// the expected number of seconds within the configured tolerance.
pub fn check_trial_duration(table: &LogTable, config: &CheckConfig) -> CheckOutcome {
    let mut outcome = CheckOutcome::new(TRIAL_DURATION);

    let time = match table.find_column_exact("time") {
        Some(col) => col,
        None => return outcome.warn("Could not find Time column"),
    };

    let times = table.numeric_column(time);
    let avg_sec = stats::mean_slice(&stats::diffs(&times));
    let total_sec = stats::max(times.iter().copied());

    let expected = config.log.expected_duration_sec;
    let is_close = (total_sec - expected).abs() < config.log.duration_tolerance_sec;

    outcome.say(format!(
        "Average trial duration: {} minutes ({} seconds)",
        format_fixed(avg_sec / 60.0, 2),
        format_fixed(avg_sec, 2)
    ));
    outcome.say(format!(
        "Total duration: {} minutes ({} seconds)",
        format_fixed(total_sec / 60.0, 2),
        format_fixed(total_sec, 2)
    ));
    outcome.say(format!(
        "Total duration is close to {} seconds: {}",
        format_number(expected),
        is_close
    ));
    outcome.finish(is_close)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::table::read_table_csv;

    fn table(csv_text: &str) -> LogTable {
        read_table_csv(csv_text.as_bytes()).unwrap()
    }

    fn config() -> CheckConfig {
        CheckConfig::default()
    }

    const GOOD_LOG: &str = "\
Time,TrialType,BlockType,Training,Velocity,NrSlips,NrErrorSlips,NrOtherSlips,TotalDropped
100,NonSlipTrial,NonStressBlock,TRUE,2.0,0,0,0,0
200,SlipTrial,StressBlock,FALSE,1.0,2,1,1,2
400,NonSlipTrial,NonStressBlock,FALSE,3.0,0,0,0,2
959,SlipTrial,StressBlock,FALSE,1.5,1,1,0,3
";

    #[test]
    fn test_nrslips_total() {
        let outcome = check_nrslips_total(&table(GOOD_LOG), &config());
        assert!(outcome.passed);
        assert_eq!(outcome.messages, vec!["NrSlips matches sum of other slip columns: true"]);

        let bad = table("NrSlips,ErrorSlips\n1,1\n2,1\n3,\n");
        let outcome = check_nrslips_total(&bad, &config());
        assert!(!outcome.passed);
        assert_eq!(outcome.messages[1], "Mismatches found in 2 row(s)");
    }

    #[test]
    fn test_totaldropped_counts_every_slip_column() {
        // NrSlips (3) + NrErrorSlips (2) + NrOtherSlips (1) = 6
        let outcome = check_totaldropped_equals_slips(&table(GOOD_LOG), &config());
        assert!(!outcome.passed);

        let log = table("NrSlips,OtherSlips,TotalDropped\n1,0,1\n1,2,4\n");
        let outcome = check_totaldropped_equals_slips(&log, &config());
        assert!(outcome.passed);
        assert_eq!(outcome.messages[0], "Final TotalDropped: 4, all slips: 4");
    }

    #[test]
    fn test_totaldropped_on_empty_log_fails_without_panicking() {
        let outcome = check_totaldropped_equals_slips(&table("NrSlips,TotalDropped\n"), &config());
        assert!(!outcome.passed);
        assert!(outcome.messages[0].starts_with("Warning:"));
    }

    #[test]
    fn test_stress_dropped() {
        let outcome = check_stress_dropped(&table(GOOD_LOG), &config());
        assert!(outcome.passed);
        assert_eq!(
            outcome.messages[0],
            "StressBlock total dropped: 5, NonStressBlock total dropped: 2"
        );
    }

    #[test]
    fn test_velocity_comparison() {
        let outcome = check_velocity_comparison(&table(GOOD_LOG), &config());
        assert!(outcome.passed);
        assert_eq!(
            outcome.messages[0],
            "Slip trials avg velocity: 1.25, Non-slip trials avg velocity: 2.50"
        );
    }

    #[test]
    fn test_missing_value_cells_are_skipped_by_aggregates() {
        let log = table("Time,BlockType,TotalDropped\n1,StressBlock,NaN\n2,StressBlock,3\n3,NonStressBlock,1\n");
        let outcome = check_stress_dropped(&log, &config());
        assert!(outcome.passed);
        assert_eq!(
            outcome.messages[0],
            "StressBlock total dropped: 3, NonStressBlock total dropped: 1"
        );

        let log = table("TrialType,Velocity\nSlipTrial,1\nSlipTrial,nan\nNonSlipTrial,2\n");
        let outcome = check_velocity_comparison(&log, &config());
        assert!(outcome.passed);
        assert_eq!(
            outcome.messages[0],
            "Slip trials avg velocity: 1.00, Non-slip trials avg velocity: 2.00"
        );

        assert_eq!(table("Time\n0\nNA\n10\n").empty_cell_count(), 1);
    }

    #[test]
    fn test_velocity_comparison_without_slip_trials_is_false() {
        let log = table("TrialType,Velocity\nNonSlipTrial,3\n");
        let outcome = check_velocity_comparison(&log, &config());
        assert!(!outcome.passed);
        assert!(outcome.messages[0].contains("Slip trials avg velocity: nan"));
    }

    #[test]
    fn test_trial_type_falls_back_to_block_type() {
        let log = table("BlockType,Velocity\nSlipTrial,1\nNonSlipTrial,2\n");
        let outcome = check_velocity_comparison(&log, &config());
        assert!(outcome.passed);
    }

    #[test]
    fn test_stress_block_velocity_is_informational() {
        let outcome = check_stress_block_velocity(&table(GOOD_LOG), &config());
        assert!(outcome.passed);
        assert_eq!(
            outcome.messages[0],
            "StressBlock avg velocity: 1.25, NonStressBlock avg velocity: 2.50"
        );
    }

    #[test]
    fn test_stress_block_balance_ignores_training_rows() {
        let outcome = check_stress_block_balance(&table(GOOD_LOG), &config());
        assert!(!outcome.passed);
        assert_eq!(
            outcome.messages[0],
            "NonTraining: StressBlock count: 2, NonStressBlock count: 1"
        );

        let numeric_flags = table("Training,BlockType\n0,StressBlock\n0,NonStressBlock\n1,StressBlock\n");
        assert!(check_stress_block_balance(&numeric_flags, &config()).passed);
    }

    #[test]
    fn test_slip_trial_slips() {
        let outcome = check_slip_trial_slips(&table(GOOD_LOG), &config());
        assert!(outcome.passed);
        assert_eq!(
            outcome.messages[0],
            "Slips in Slip trials total: 6, Slips in Non-slip trials total: 0"
        );
    }

    #[test]
    fn test_trial_duration() {
        let outcome = check_trial_duration(&table(GOOD_LOG), &config());
        assert!(outcome.passed);
        // (959 - 100) / 3 = 286.33 s
        assert_eq!(
            outcome.messages[0],
            "Average trial duration: 4.77 minutes (286.33 seconds)"
        );
        assert_eq!(outcome.messages[1], "Total duration: 15.98 minutes (959.00 seconds)");

        let mut short = config();
        short.log.expected_duration_sec = 600.0;
        assert!(!check_trial_duration(&table(GOOD_LOG), &short).passed);
    }

    #[test]
    fn test_custom_labels() {
        let mut cfg = config();
        cfg.labels.stress_block = "High".to_string();
        cfg.labels.non_stress_block = "Low".to_string();

        let log = table("BlockType,TotalDropped\nHigh,3\nLow,1\n");
        assert!(check_stress_dropped(&log, &cfg).passed);
    }

    #[test]
    fn test_missing_columns_fail_with_warning() {
        let empty = table("Unrelated\n1\n");
        let checks: [fn(&LogTable, &CheckConfig) -> CheckOutcome; 8] = [
            check_nrslips_total,
            check_totaldropped_equals_slips,
            check_stress_dropped,
            check_velocity_comparison,
            check_stress_block_velocity,
            check_stress_block_balance,
            check_slip_trial_slips,
            check_trial_duration,
        ];

        for check in checks {
            let outcome = check(&empty, &config());
            assert!(!outcome.passed, "{} should fail", outcome.name);
            assert_eq!(outcome.messages.len(), 1);
            assert!(outcome.messages[0].starts_with("Warning:"));
        }
    }

    #[test]
    fn test_checks_are_pure() {
        let log = table(GOOD_LOG);
        let before = log.clone();
        let first = check_slip_trial_slips(&log, &config());
        let second = check_slip_trial_slips(&log, &config());
        assert_eq!(first, second);
        assert_eq!(log, before);
    }
}
