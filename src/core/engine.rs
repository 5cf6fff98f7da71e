use crate::config::toml_config::CheckConfig;
use crate::core::log_checks::*;
use crate::domain::model::{CheckOutcome, CheckReport, CheckResult, LogTable, Verdict};
use crate::domain::ports::TableCheck;

pub type CheckFn = fn(&LogTable, &CheckConfig) -> CheckOutcome;

/// Adapts a plain check function to [`TableCheck`].
pub struct FnCheck {
    name: &'static str,
    failure_verdict: Verdict,
    func: CheckFn,
}

impl FnCheck {
    pub fn new(name: &'static str, func: CheckFn) -> Self {
        Self {
            name,
            failure_verdict: Verdict::Error,
            func,
        }
    }

    pub fn unsure_on_failure(mut self) -> Self {
        self.failure_verdict = Verdict::Unsure;
        self
    }
}

impl TableCheck for FnCheck {
    fn name(&self) -> &str {
        self.name
    }

    fn failure_verdict(&self) -> Verdict {
        self.failure_verdict
    }

    fn run(&self, table: &LogTable, config: &CheckConfig) -> CheckOutcome {
        (self.func)(table, config)
    }
}

pub struct CheckEngine {
    checks: Vec<Box<dyn TableCheck>>,
    config: CheckConfig,
}

impl CheckEngine {
    pub fn new(config: CheckConfig) -> Self {
        Self {
            checks: Vec::new(),
            config,
        }
    }

    /// The full trial-log suite, in reporting order.
    pub fn standard(config: CheckConfig) -> Self {
        Self::new(config)
            .with_check(FnCheck::new(NRSLIPS_TOTAL, check_nrslips_total))
            .with_check(FnCheck::new(
                TOTALDROPPED_EQUALS_SLIPS,
                check_totaldropped_equals_slips,
            ))
            .with_check(FnCheck::new(STRESS_DROPPED, check_stress_dropped))
            .with_check(FnCheck::new(VELOCITY_COMPARISON, check_velocity_comparison))
            .with_check(
                FnCheck::new(STRESS_BLOCK_VELOCITY, check_stress_block_velocity)
                    .unsure_on_failure(),
            )
            .with_check(FnCheck::new(STRESS_BLOCK_BALANCE, check_stress_block_balance))
            .with_check(FnCheck::new(SLIP_TRIAL_SLIPS, check_slip_trial_slips))
            .with_check(FnCheck::new(TRIAL_DURATION, check_trial_duration))
    }

    pub fn with_check<C: TableCheck + 'static>(mut self, check: C) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn check_names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    pub fn run(&self, file: &str, table: &LogTable) -> CheckReport {
        tracing::info!("🔍 Running {} checks on {}", self.checks.len(), file);

        let results = self
            .checks
            .iter()
            .map(|check| {
                let outcome = check.run(table, &self.config);
                let verdict = outcome.verdict_or(check.failure_verdict());
                tracing::debug!("{} -> {:?}", check.name(), verdict);
                CheckResult { outcome, verdict }
            })
            .collect();

        let report = CheckReport {
            file: file.to_string(),
            checked_at: chrono::Utc::now(),
            results,
        };
        tracing::info!(
            "✅ {} passed, {} failed",
            report.passed_count(),
            report.failed_count()
        );
        report
    }
}
