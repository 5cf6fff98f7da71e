pub mod toml_config;

use crate::config::toml_config::CheckConfig;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "crane-check")]
#[command(about = "Sanity checks for crane game trial logs (.csv / .xlsx)")]
pub struct CliConfig {
    /// Trial log to check
    pub file: String,

    /// Optional TOML file with thresholds and labels
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the expected session length in seconds
    #[arg(long)]
    pub expected_duration: Option<f64>,

    /// Override the allowed deviation from the expected length in seconds
    #[arg(long)]
    pub duration_tolerance: Option<f64>,

    /// Print the report as JSON instead of colored text
    #[arg(long)]
    pub json: bool,

    /// Exit with a non-zero status when any check fails
    #[arg(long)]
    pub strict: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    pub log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 載入 TOML 配置並套用命令列覆蓋設定
    pub fn check_config(&self) -> Result<CheckConfig> {
        let mut config = CheckConfig::load_or_default(self.config.as_deref())?;

        if let Some(expected) = self.expected_duration {
            config.log.expected_duration_sec = expected;
            tracing::info!("🔧 Expected duration overridden to: {}s", expected);
        }
        if let Some(tolerance) = self.duration_tolerance {
            config.log.duration_tolerance_sec = tolerance;
            tracing::info!("🔧 Duration tolerance overridden to: {}s", tolerance);
        }

        config.validate()?;
        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("file", &self.file)?;
        validation::validate_file_extensions(
            "file",
            std::slice::from_ref(&self.file),
            validation::TABLE_EXTENSIONS,
        )?;
        if let Some(config) = &self.config {
            validation::validate_path("config", config)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli_arguments() {
        let cli = CliConfig::parse_from([
            "crane-check",
            "logs/run_TEST_CraneOut.xlsx",
            "--expected-duration",
            "600",
            "--strict",
        ]);

        assert_eq!(cli.file, "logs/run_TEST_CraneOut.xlsx");
        assert!(cli.strict);
        assert!(!cli.json);
        assert!(cli.validate().is_ok());

        let config = cli.check_config().unwrap();
        assert_eq!(config.log.expected_duration_sec, 600.0);
        assert_eq!(config.log.duration_tolerance_sec, 2.0);
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let cli = CliConfig::parse_from(["crane-check", "notes.txt"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let cli = CliConfig::parse_from(["crane-check", "run.csv", "--duration-tolerance", "0"]);
        assert!(cli.check_config().is_err());
    }
}
