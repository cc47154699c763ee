//! Application Layer - Use cases
//!
//! Write path: `record_usage` (one event) and `pipeline` (queue + worker).
//! Read path: `stats` (statistics query engine).

pub mod config;
pub mod pipeline;
pub mod record_usage;
pub mod stats;

pub use record_usage::{RecordUsageUseCase, UsageWriteOutcome};
pub use stats::StatsQueryUseCase;
