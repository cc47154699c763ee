//! Server Configuration
//!
//! Process-level settings read once from the environment at startup.
//! Operator-editable settings (maintenance, keys) live in the settings file
//! and are re-read per request instead.

use anyhow::Context;
use platform::rate_limit::RateLimitConfig;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use telemetry::TelemetryConfig;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SETTINGS_PATH: &str = "config/settings.json";
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub settings_path: PathBuf,
    /// Zero re-reads the settings file on every request
    pub settings_cache_ttl: Duration,
    /// `None` selects the in-memory usage store
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub rate_limit: RateLimitConfig,
    pub telemetry: TelemetryConfig,
    pub admin_token: Option<String>,
    pub frontend_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = TelemetryConfig::default();
        let rate_defaults = RateLimitConfig::default();

        let telemetry = TelemetryConfig {
            queue_capacity: parse_or(&lookup, "TELEMETRY_QUEUE_CAPACITY", defaults.queue_capacity)?,
            max_in_flight: parse_or(&lookup, "TELEMETRY_MAX_IN_FLIGHT", defaults.max_in_flight)?,
            ..defaults
        };

        let rate_limit = RateLimitConfig::new(
            parse_or(&lookup, "RATE_LIMIT_MAX_REQUESTS", rate_defaults.max_requests)?,
            parse_or(&lookup, "RATE_LIMIT_WINDOW_MS", rate_defaults.window.as_millis() as u64)?,
        );

        let frontend_origins = non_empty(&lookup, "FRONTEND_ORIGINS")
            .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            settings_path: non_empty(&lookup, "SETTINGS_PATH")
                .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string())
                .into(),
            settings_cache_ttl: Duration::from_millis(parse_or(&lookup, "SETTINGS_CACHE_TTL_MS", 0)?),
            database_url: non_empty(&lookup, "DATABASE_URL"),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            rate_limit,
            telemetry,
            admin_token: non_empty(&lookup, "ADMIN_TOKEN"),
            frontend_origins,
        })
    }
}

fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty(lookup, name) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
