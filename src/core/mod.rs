pub mod engine;
pub mod log_checks;
pub mod physio;
pub mod signal;
pub mod stats;
pub mod summary;

pub use crate::domain::model::{CheckOutcome, CheckReport, LogTable, Verdict};
pub use crate::domain::ports::TableCheck;
pub use crate::utils::error::Result;
