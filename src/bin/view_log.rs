use anyhow::Context;
use clap::Parser;
use crane_check::adapters::discovery;
use crane_check::core::summary::{check_min_session, LogSummary};
use crane_check::domain::model::Verdict;
use crane_check::utils::{console, logger, validation};
use crane_check::{load_table, CheckConfig, CheckError};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "view-log")]
#[command(about = "Summarize a crane game log and check the session length")]
struct Args {
    /// Log to summarize; when omitted the longest matching log in --dir is used
    file: Option<PathBuf>,

    /// Directory searched when no file is given
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Only consider .csv files whose name contains this text
    #[arg(long, default_value = "TEST")]
    pattern: String,

    /// Minimum session length in seconds
    #[arg(long)]
    min_session: Option<f64>,

    #[arg(short, long)]
    config: Option<String>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Exit with status 2 when the session is too short
    #[arg(long)]
    strict: bool,

    #[arg(long)]
    no_color: bool,

    #[arg(long)]
    log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,
}

#[derive(Serialize)]
struct ViewOutput<'a> {
    file: String,
    summary: &'a LogSummary,
    min_session_sec: f64,
    min_session_passed: bool,
}

fn run(args: &Args) -> anyhow::Result<bool> {
    let config = CheckConfig::load_or_default(args.config.as_deref())?;
    let min_session = args.min_session.unwrap_or(config.log.min_session_sec);
    validation::validate_positive_number("min_session", min_session)?;

    let path = match &args.file {
        Some(file) => file.clone(),
        None => {
            let found = discovery::find_longest_log(&args.dir, &args.pattern)?;
            tracing::info!("📄 Using longest log: {}", found.display());
            found
        }
    };

    let table =
        load_table(&path).with_context(|| format!("Failed to load {}", path.display()))?;
    let summary = LogSummary::from_table(&table);
    let outcome = check_min_session(&table, min_session);

    if args.json {
        let output = ViewOutput {
            file: path.display().to_string(),
            summary: &summary,
            min_session_sec: min_session,
            min_session_passed: outcome.passed,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Reading file: {}", path.display());
        println!("{}", console::DIVIDER);
        for line in summary.lines() {
            if line.starts_with("WARNING") || line.starts_with("Warning") {
                println!("{}", console::warning_line(&line));
            } else {
                println!("{}", line);
            }
        }
        println!("{}", console::DIVIDER);
        console::print_outcome(&outcome);
        println!("{}", console::verdict_line(outcome.verdict_or(Verdict::Error)));
    }

    Ok(outcome.passed)
}

fn main() {
    let args = Args::parse();
    logger::init(args.verbose, args.log_json);
    console::set_color_enabled(!args.no_color);

    match run(&args) {
        Ok(passed) => {
            if args.strict && !passed {
                std::process::exit(2);
            }
        }
        Err(e) => {
            tracing::error!("❌ view-log failed: {:#}", e);
            match e.downcast_ref::<CheckError>() {
                Some(check_error) => {
                    eprintln!("❌ {}", check_error.user_friendly_message());
                    eprintln!("💡 Suggestion: {}", check_error.recovery_suggestion());
                    std::process::exit(check_error.exit_code());
                }
                None => {
                    eprintln!("❌ {:#}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults_and_flags() {
        let args = Args::parse_from(["view-log"]);
        assert!(args.file.is_none());
        assert_eq!(args.pattern, "TEST");
        assert!(!args.log_json);

        let args = Args::parse_from([
            "view-log",
            "run.csv",
            "--log-json",
            "--min-session",
            "120",
            "-v",
        ]);
        assert_eq!(args.file, Some(PathBuf::from("run.csv")));
        assert!(args.log_json);
        assert!(args.verbose);
        assert_eq!(args.min_session, Some(120.0));
    }
}
