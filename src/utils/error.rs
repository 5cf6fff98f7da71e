use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("MAT file error: {message}")]
    MatFormatError { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Unsupported file extension: .{extension}")]
    UnsupportedFormat { extension: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Format,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CheckError {
    pub fn mat(message: impl Into<String>) -> Self {
        CheckError::MatFormatError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CheckError::FileNotFound { .. } | CheckError::UnsupportedFormat { .. } => {
                ErrorCategory::Input
            }
            CheckError::CsvError(_)
            | CheckError::SpreadsheetError(_)
            | CheckError::MatFormatError { .. } => ErrorCategory::Format,
            CheckError::ConfigError { .. }
            | CheckError::ConfigValidationError { .. }
            | CheckError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            CheckError::IoError(_) | CheckError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Format => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 對應嚴重程度的程序退出碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            CheckError::FileNotFound { .. } => {
                "Check the path; relative paths are resolved against the current directory".to_string()
            }
            CheckError::UnsupportedFormat { .. } => {
                "Export the log as .csv or .xlsx, or the recording as a MATLAB .mat file".to_string()
            }
            CheckError::CsvError(_) => "Make sure the file is comma separated with a header row".to_string(),
            CheckError::SpreadsheetError(_) => {
                "Open the workbook and re-save it; the first sheet must hold the log".to_string()
            }
            CheckError::MatFormatError { .. } => {
                "Re-export the recording as a Level 5 MAT file with data, labels, units, isi and isi_units".to_string()
            }
            CheckError::ConfigError { .. }
            | CheckError::ConfigValidationError { .. }
            | CheckError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or remove the offending key to use the default".to_string()
            }
            CheckError::IoError(_) => "Check file permissions and free disk space".to_string(),
            CheckError::SerializationError(_) => "Retry without --json".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CheckError::FileNotFound { path } => format!("Error: File not found: {}", path),
            CheckError::UnsupportedFormat { extension } => {
                format!("Cannot read files with extension '.{}'", extension)
            }
            CheckError::MatFormatError { message } => {
                format!("The recording could not be read: {}", message)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
