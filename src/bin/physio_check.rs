use anyhow::Context;
use clap::Parser;
use crane_check::core::physio;
use crane_check::domain::model::Verdict;
use crane_check::utils::validation::{self, Validate};
use crane_check::utils::{console, logger};
use crane_check::{load_recording, CheckConfig, CheckError};

#[derive(Debug, Parser)]
#[command(name = "physio-check")]
#[command(about = "Inspect EDA, ECG and trigger channels of a MATLAB recording")]
struct Args {
    /// Recording to inspect
    #[arg(default_value = "example_data/02032000.mat")]
    file: String,

    #[arg(short, long)]
    config: Option<String>,

    /// Override the SNR in dB above which the ECG counts as clean
    #[arg(long)]
    snr_high_db: Option<f64>,

    /// Print the analysis as JSON
    #[arg(long)]
    json: bool,

    /// Include the per-sample time axis (minutes) in the JSON output
    #[arg(long, requires = "json")]
    time_axis: bool,

    /// Exit with status 2 when a channel is missing or the ECG is noisy
    #[arg(long)]
    strict: bool,

    #[arg(long)]
    no_color: bool,

    #[arg(long)]
    log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,
}

impl Validate for Args {
    fn validate(&self) -> crane_check::Result<()> {
        validation::validate_path("file", &self.file)?;
        validation::validate_file_extensions(
            "file",
            std::slice::from_ref(&self.file),
            validation::RECORDING_EXTENSIONS,
        )?;
        if let Some(snr) = self.snr_high_db {
            validation::validate_range("snr_high_db", snr, -200.0, 200.0)?;
        }
        Ok(())
    }
}

fn run(args: &Args) -> anyhow::Result<bool> {
    args.validate()?;
    let mut config = CheckConfig::load_or_default(args.config.as_deref())?;
    if let Some(snr) = args.snr_high_db {
        config.physio.snr_high_db = snr;
    }
    config.validate_config()?;

    let recording =
        load_recording(&args.file).with_context(|| format!("Failed to load {}", args.file))?;
    let report = physio::analyze(&recording, &config.physio);
    let passed = report.passed();

    if args.json {
        let report = report.keep_time_axis(args.time_axis);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let name = std::path::Path::new(&args.file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.file.clone());
        println!("Loading mat file: {}", name);
        println!();
        for line in report.lines() {
            if line.starts_with("Warning:") {
                println!("{}", console::warning_line(&line));
            } else {
                println!("{}", line);
            }
        }
        println!("{}", console::DIVIDER);
        let verdict = if passed {
            Verdict::Ok
        } else {
            Verdict::Error
        };
        println!("{}", console::verdict_line(verdict));
    }

    Ok(passed)
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
            tracing::error!("❌ physio-check failed: {:#}", e);
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
    fn test_time_axis_needs_json() {
        let args = Args::parse_from(["physio-check", "rec.mat", "--json", "--time-axis"]);
        assert!(args.time_axis);
        assert!(Args::try_parse_from(["physio-check", "rec.mat", "--time-axis"]).is_err());
    }
}
