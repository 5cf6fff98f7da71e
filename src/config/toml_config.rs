use crate::utils::error::{CheckError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub log: LogConfig,
    pub labels: LabelConfig,
    pub physio: PhysioConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// 預期的總時長（秒）
    pub expected_duration_sec: f64,
    pub duration_tolerance_sec: f64,
    /// 有效測試記錄的最短時長（秒）
    pub min_session_sec: f64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            expected_duration_sec: 959.0,
            duration_tolerance_sec: 2.0,
            min_session_sec: 300.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub slip_trial: String,
    pub non_slip_trial: String,
    pub stress_block: String,
    pub non_stress_block: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            slip_trial: "SlipTrial".to_string(),
            non_slip_trial: "NonSlipTrial".to_string(),
            stress_block: "StressBlock".to_string(),
            non_stress_block: "NonStressBlock".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysioConfig {
    pub eda_keyword: String,
    pub ecg_keyword: String,
    pub trigger_keyword: String,
    /// 高於此值的 ECG SNR 視為 "high"
    pub snr_high_db: f64,
}

impl Default for PhysioConfig {
    fn default() -> Self {
        Self {
            eda_keyword: "EDA".to_string(),
            ecg_keyword: "ECG".to_string(),
            trigger_keyword: "Trigger".to_string(),
            snr_high_db: 20.0,
        }
    }
}

impl CheckConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CheckError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CheckError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 沒有指定檔案時使用預設值
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                tracing::debug!("Loading check configuration from {}", path);
                Self::from_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// 替換環境變數 (例如 ${CRANE_EXPECTED_DURATION})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CheckError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if !self.log.expected_duration_sec.is_finite() || self.log.expected_duration_sec < 0.0 {
            return Err(CheckError::InvalidConfigValueError {
                field: "log.expected_duration_sec".to_string(),
                value: self.log.expected_duration_sec.to_string(),
                reason: "Duration cannot be negative".to_string(),
            });
        }
        validation::validate_positive_number(
            "log.duration_tolerance_sec",
            self.log.duration_tolerance_sec,
        )?;
        if !self.log.min_session_sec.is_finite() || self.log.min_session_sec < 0.0 {
            return Err(CheckError::InvalidConfigValueError {
                field: "log.min_session_sec".to_string(),
                value: self.log.min_session_sec.to_string(),
                reason: "Duration cannot be negative".to_string(),
            });
        }

        validation::validate_non_empty_string("labels.slip_trial", &self.labels.slip_trial)?;
        validation::validate_non_empty_string("labels.non_slip_trial", &self.labels.non_slip_trial)?;
        validation::validate_non_empty_string("labels.stress_block", &self.labels.stress_block)?;
        validation::validate_non_empty_string(
            "labels.non_stress_block",
            &self.labels.non_stress_block,
        )?;

        validation::validate_non_empty_string("physio.eda_keyword", &self.physio.eda_keyword)?;
        validation::validate_non_empty_string("physio.ecg_keyword", &self.physio.ecg_keyword)?;
        validation::validate_non_empty_string(
            "physio.trigger_keyword",
            &self.physio.trigger_keyword,
        )?;
        validation::validate_range("physio.snr_high_db", self.physio.snr_high_db, -200.0, 200.0)?;

        Ok(())
    }
}

impl Validate for CheckConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = CheckConfig::from_toml_str("").unwrap();
        assert_eq!(config, CheckConfig::default());
        assert_eq!(config.log.expected_duration_sec, 959.0);
        assert_eq!(config.labels.stress_block, "StressBlock");
        assert_eq!(config.physio.snr_high_db, 20.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[log]
expected_duration_sec = 600.0

[labels]
slip_trial = "Slip"

[physio]
ecg_keyword = "Cardio"
"#;

        let config = CheckConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.log.expected_duration_sec, 600.0);
        assert_eq!(config.log.duration_tolerance_sec, 2.0);
        assert_eq!(config.labels.slip_trial, "Slip");
        assert_eq!(config.labels.non_slip_trial, "NonSlipTrial");
        assert_eq!(config.physio.ecg_keyword, "Cardio");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CRANE_CHECK_TEST_LABEL", "HighStress");

        let toml_content = r#"
[labels]
stress_block = "${CRANE_CHECK_TEST_LABEL}"
"#;

        let config = CheckConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.labels.stress_block, "HighStress");

        std::env::remove_var("CRANE_CHECK_TEST_LABEL");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[log]
duration_tolerance_sec = 0.0
"#;
        let config = CheckConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let toml_content = r#"
[physio]
eda_keyword = "  "
"#;
        let config = CheckConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = CheckConfig::from_toml_str("[log\nexpected").unwrap_err();
        assert!(matches!(err, CheckError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[log]
min_session_sec = 120.0
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = CheckConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.log.min_session_sec, 120.0);
    }
}
