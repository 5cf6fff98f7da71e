use crate::config::toml_config::CheckConfig;
use crate::domain::model::{CheckOutcome, LogTable, Verdict};

/// A single sanity check over a loaded trial log.
///
/// Implementations must be pure: the same table and configuration always
/// produce the same outcome, and missing columns yield a failed outcome
/// rather than an error.
pub trait TableCheck {
    fn name(&self) -> &str;

    /// Verdict shown when the check does not pass.
    fn failure_verdict(&self) -> Verdict {
        Verdict::Error
    }

    fn run(&self, table: &LogTable, config: &CheckConfig) -> CheckOutcome;
}
