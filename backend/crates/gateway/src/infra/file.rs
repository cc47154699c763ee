//! File-backed settings provider
//!
//! Reads and parses the JSON document on every call. An optional TTL keeps
//! the last parse for a short time; edits become visible within one TTL.

use crate::domain::provider::SettingsProvider;
use crate::domain::settings::GatewaySettings;
use crate::error::SettingsError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FileSettingsProvider {
    path: PathBuf,
    ttl: Duration,
    cached: Arc<Mutex<Option<(Instant, Arc<GatewaySettings>)>>>,
}

impl FileSettingsProvider {
    /// Provider that re-reads the file on every call
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_ttl(path, Duration::ZERO)
    }

    pub fn with_ttl(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fresh_cached(&self) -> Option<Arc<GatewaySettings>> {
        if self.ttl.is_zero() {
            return None;
        }
        let cached = self.cached.lock().ok()?;
        match cached.as_ref() {
            Some((loaded_at, settings)) if loaded_at.elapsed() < self.ttl => Some(settings.clone()),
            _ => None,
        }
    }

    async fn read(&self) -> Result<GatewaySettings, SettingsError> {
        let display = self.path.display().to_string();
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SettingsError::Read {
                path: display.clone(),
                source,
            })?;
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: display,
            source,
        })
    }
}

impl SettingsProvider for FileSettingsProvider {
    async fn current(&self) -> Result<Arc<GatewaySettings>, SettingsError> {
        if let Some(settings) = self.fresh_cached() {
            return Ok(settings);
        }

        let settings = Arc::new(self.read().await?);

        if !self.ttl.is_zero() {
            if let Ok(mut cached) = self.cached.lock() {
                *cached = Some((Instant::now(), settings.clone()));
            }
        }

        Ok(settings)
    }
}
