use clap::Parser;
use crane_check::domain::model::CheckReport;
use crane_check::utils::{console, logger, validation::Validate};
use crane_check::{load_table, CheckEngine, CheckError, CliConfig};

fn run(config: &CliConfig) -> Result<CheckReport, CheckError> {
    config.validate()?;
    let check_config = config.check_config()?;

    let table = load_table(&config.file)?;
    let file_name = std::path::Path::new(&config.file)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.file.clone());

    Ok(CheckEngine::standard(check_config).run(&file_name, &table))
}

fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init(config.verbose, config.log_json);
    console::set_color_enabled(!config.no_color);

    tracing::info!("Starting crane-check");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    let report = match run(&config) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(
                "❌ Check failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };

    if config.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                let e = CheckError::from(e);
                eprintln!("❌ {}", e.user_friendly_message());
                std::process::exit(e.exit_code());
            }
        }
    } else {
        console::print_report(&report);
    }

    // 嚴格模式：任何檢查失敗都回傳非零
    if config.strict && !report.all_passed() {
        tracing::warn!("⚠️ {} check(s) failed", report.failed_count());
        std::process::exit(2);
    }
}
