//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod config;
mod modules;

use axum::{
    Router, http,
    http::{Method, header},
};
use config::ServerConfig;
use gateway::application::config::GatewayConfig;
use gateway::{AdminToken, FileSettingsProvider, GatewayState, HandlerRegistry, with_admission, with_envelope};
use modules::{BuiltinDeps, builtin_modules};
use platform::rate_limit::spawn_sweeper;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use telemetry::{
    InMemoryUsageStore, PgUsageRepository, RequestLogRepository, TelemetryPipeline, UsageRecorder,
    UsageStatRepository, with_usage_recording,
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

/// Upper bound on flushing queued usage events at shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api=info,gateway=info,telemetry=info,platform=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    match config.database_url.clone() {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(&database_url)
                .await?;

            tracing::info!("Connected to database");

            // Run migrations
            sqlx::migrate!("../../../database/migrations")
                .run(&pool)
                .await?;

            tracing::info!("Migrations completed");

            run(config, PgUsageRepository::new(pool)).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, usage data is kept in memory only");
            run(config, InMemoryUsageStore::new()).await
        }
    }
}

async fn run<S>(config: ServerConfig, store: S) -> anyhow::Result<()>
where
    S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
{
    let started_at = Instant::now();

    let provider = FileSettingsProvider::with_ttl(&config.settings_path, config.settings_cache_ttl);
    tracing::info!(path = %provider.path().display(), "Using settings file");

    // Usage pipeline
    let (pipeline, pipeline_handle) = TelemetryPipeline::spawn(store.clone(), &config.telemetry);

    // Admission state
    let gateway_state = GatewayState::new(
        provider.clone(),
        GatewayConfig {
            rate_limit: config.rate_limit.clone(),
            admin_token: config.admin_token.clone(),
            ..GatewayConfig::default()
        },
    );
    let sweeper = spawn_sweeper(&gateway_state.limiter);

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set, admin routes are unauthenticated");
    }

    // Handler modules
    let registry = HandlerRegistry::new();
    let loaded = registry.loaded_handlers();
    let registry = builtin_modules(BuiltinDeps {
        settings: provider,
        store,
        hits: gateway_state.hits.clone(),
        admin_token: AdminToken::new(config.admin_token.clone()),
        loaded,
        started_at,
    })
    .into_iter()
    .fold(registry, HandlerRegistry::register);

    let report = registry.load(Router::new());
    tracing::info!(
        loaded = report.loaded,
        failed = report.failures.len(),
        "Handler modules loaded"
    );

    // CORS configuration
    let allowed_origins: Vec<http::HeaderValue> = config
        .frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            http::HeaderName::from_static("x-api-key"),
            http::HeaderName::from_static(kernel::endpoint::API_VERSION_HEADER),
        ]))
        .allow_credentials(true);

    // Build router: envelope -> usage recording -> admission, innermost first
    let app = with_envelope(report.router, gateway_state.clone());
    let app = with_usage_recording(app, UsageRecorder::new(pipeline, config.telemetry.clone()));
    let app = with_admission(app, gateway_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The server owned the last pipeline sender; the worker now drains
    sweeper.abort();
    pipeline_handle.drain(DRAIN_TIMEOUT).await;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining");
}
