//! Gateway Prometheus metrics

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, IntGauge, register_int_counter, register_int_counter_vec, register_int_gauge};

lazy_static! {
    pub static ref RATE_LIMITED_TOTAL: IntCounter = register_int_counter!(
        "gateway_rate_limited_total",
        "Requests rejected by the per-client rate limiter"
    )
    .expect("gateway_rate_limited_total registers once");
    pub static ref MAINTENANCE_REJECTIONS_TOTAL: IntCounter = register_int_counter!(
        "gateway_maintenance_rejections_total",
        "Requests short-circuited by maintenance mode"
    )
    .expect("gateway_maintenance_rejections_total registers once");
    pub static ref AUTH_REJECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gateway_auth_rejections_total",
        "Requests rejected by the API-key authenticator",
        &["reason"]
    )
    .expect("gateway_auth_rejections_total registers once");
    pub static ref HANDLERS_LOADED: IntGauge = register_int_gauge!(
        "gateway_handlers_loaded",
        "Handler modules registered at startup"
    )
    .expect("gateway_handlers_loaded registers once");
}
