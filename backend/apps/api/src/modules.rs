//! Built-in handler modules
//!
//! Operational endpoints and the admin surface, registered through the
//! handler registry exactly like business modules.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use gateway::{
    AdminToken, AppError, EndpointHits, HandlerModule, LoadedHandlers, SettingsProvider,
    hits_router, with_admin_guard,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use telemetry::{RequestLogRepository, UsageStatRepository, stats_router};

/// Everything the built-in modules need from the process
pub struct BuiltinDeps<P, S> {
    pub settings: P,
    pub store: S,
    pub hits: Arc<EndpointHits>,
    pub admin_token: AdminToken,
    pub loaded: LoadedHandlers,
    pub started_at: Instant,
}

#[derive(Clone)]
struct SystemState<P> {
    settings: Arc<P>,
    loaded: LoadedHandlers,
    started_at: Instant,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    healthy: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    handlers: usize,
    uptime_seconds: u64,
    maintenance: bool,
    version: &'static str,
}

pub fn builtin_modules<P, S>(deps: BuiltinDeps<P, S>) -> Vec<HandlerModule>
where
    P: SettingsProvider + Clone + Send + Sync + 'static,
    S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
{
    let system = SystemState {
        settings: Arc::new(deps.settings),
        loaded: deps.loaded,
        started_at: deps.started_at,
    };
    let status_state = system.clone();
    let settings_state = system;
    let stats_token = deps.admin_token.clone();
    let hits_token = deps.admin_token;
    let store = deps.store;
    let hits = deps.hits;

    vec![
        HandlerModule::new("system", "health", |router: Router| {
            Ok(router.route("/health", get(health)))
        }),
        HandlerModule::new("system", "status", move |router: Router| {
            Ok(router.merge(
                Router::new()
                    .route("/status", get(status::<P>))
                    .with_state(status_state),
            ))
        }),
        HandlerModule::new("system", "settings", move |router: Router| {
            Ok(router.merge(
                Router::new()
                    .route("/settings", get(public_settings::<P>))
                    .with_state(settings_state),
            ))
        }),
        HandlerModule::new("system", "metrics", |router: Router| {
            Ok(router.route("/metrics", get(metrics)))
        }),
        HandlerModule::new("admin", "stats", move |router: Router| {
            Ok(router.merge(with_admin_guard(stats_router(store), stats_token)))
        }),
        HandlerModule::new("admin", "hits", move |router: Router| {
            Ok(router.merge(with_admin_guard(hits_router(hits), hits_token)))
        }),
    ]
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { healthy: true })
}

/// GET /status
async fn status<P>(State(state): State<SystemState<P>>) -> Json<StatusResponse>
where
    P: SettingsProvider + Clone + Send + Sync + 'static,
{
    let maintenance = match state.settings.current().await {
        Ok(settings) => settings.maintenance.enabled,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read settings for status");
            false
        }
    };

    Json(StatusResponse {
        handlers: state.loaded.get(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        maintenance,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /settings
async fn public_settings<P>(State(state): State<SystemState<P>>) -> Response
where
    P: SettingsProvider + Clone + Send + Sync + 'static,
{
    match state.settings.current().await {
        Ok(settings) => Json(settings.public_view()).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read settings");
            AppError::service_unavailable("Settings are temporarily unavailable")
                .with_source(e)
                .into_response()
        }
    }
}

/// GET /metrics
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}
