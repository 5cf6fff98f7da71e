use crate::domain::model::{CheckOutcome, CheckReport, Verdict};
use colored::Colorize;

pub const DIVIDER: &str = "--------------------------------------------------";

pub fn set_color_enabled(enabled: bool) {
    if !enabled {
        colored::control::set_override(false);
    }
}

pub fn verdict_line(verdict: Verdict) -> String {
    match verdict {
        Verdict::Ok => "OK".green().to_string(),
        Verdict::Error => "ERROR".red().to_string(),
        Verdict::Unsure => "UNSURE".red().to_string(),
    }
}

pub fn warning_line(message: &str) -> String {
    message.yellow().to_string()
}

pub fn print_outcome(outcome: &CheckOutcome) {
    for message in &outcome.messages {
        if message.starts_with("Warning:") {
            println!("{}", warning_line(message));
        } else {
            println!("{}", message);
        }
    }
}

pub fn print_report(report: &CheckReport) {
    println!("Checking logfile {}...", report.file);

    for result in &report.results {
        print_outcome(&result.outcome);
        println!("{}", verdict_line(result.verdict));
        println!("{}", DIVIDER);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divider_width() {
        assert_eq!(DIVIDER.len(), 50);
        assert!(DIVIDER.chars().all(|c| c == '-'));
    }

    #[test]
    fn test_verdict_line_contains_label() {
        assert!(verdict_line(Verdict::Ok).contains("OK"));
        assert!(verdict_line(Verdict::Error).contains("ERROR"));
        assert!(verdict_line(Verdict::Unsure).contains("UNSURE"));
    }
}
