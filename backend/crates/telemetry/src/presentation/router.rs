//! Telemetry Router

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::{Router, routing::get};
use std::sync::Arc;

use crate::domain::repository::{RequestLogRepository, UsageStatRepository};
use crate::presentation::handlers::{self, StatsAppState};
use crate::presentation::middleware::{UsageRecorder, record_usage};

/// Admin statistics routes under `/admin/stats`
pub fn stats_router<S>(store: S) -> Router
where
    S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
{
    let state = StatsAppState {
        store: Arc::new(store),
    };

    Router::new()
        .route("/admin/stats/overall", get(handlers::overall::<S>))
        .route("/admin/stats/daily", get(handlers::daily::<S>))
        .route("/admin/stats/range", get(handlers::range::<S>))
        .route("/admin/stats/endpoint", get(handlers::endpoint::<S>))
        .with_state(state)
}

/// Record usage for every API request routed through `router`
pub fn with_usage_recording(router: Router, recorder: UsageRecorder) -> Router {
    router.layer(middleware::from_fn(move |req: Request, next: Next| {
        record_usage(recorder.clone(), req, next)
    }))
}
