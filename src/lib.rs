pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::{mat::load_recording, table::load_table};
pub use crate::config::{toml_config::CheckConfig, CliConfig};
pub use crate::core::{engine::CheckEngine, physio::PhysioReport, summary::LogSummary};
pub use crate::utils::error::{CheckError, Result};
