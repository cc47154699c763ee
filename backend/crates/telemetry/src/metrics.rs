//! Telemetry Prometheus metrics

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, register_int_counter, register_int_counter_vec};

/// `target` label for request log writes
pub const TARGET_LOG: &str = "log";
/// `target` label for aggregate upserts
pub const TARGET_AGGREGATE: &str = "aggregate";

lazy_static! {
    pub static ref EVENTS_DROPPED_TOTAL: IntCounter = register_int_counter!(
        "telemetry_events_dropped_total",
        "Usage events dropped because the telemetry queue was full or closed"
    )
    .expect("telemetry_events_dropped_total registers once");
    pub static ref WRITE_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "telemetry_write_failures_total",
        "Failed telemetry writes by target",
        &["target"]
    )
    .expect("telemetry_write_failures_total registers once");
}
