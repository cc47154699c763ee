//! In-memory settings provider
//!
//! Holds the document in process; `replace`/`update` take effect on the
//! next request. Used by tests and by embedders that manage settings
//! themselves.

use crate::domain::provider::SettingsProvider;
use crate::domain::settings::GatewaySettings;
use crate::error::SettingsError;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default)]
pub struct StaticSettingsProvider {
    inner: Arc<RwLock<Arc<GatewaySettings>>>,
}

impl StaticSettingsProvider {
    pub fn new(settings: GatewaySettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(settings))),
        }
    }

    pub fn replace(&self, settings: GatewaySettings) {
        if let Ok(mut inner) = self.inner.write() {
            *inner = Arc::new(settings);
        }
    }

    pub fn update(&self, change: impl FnOnce(&mut GatewaySettings)) {
        if let Ok(mut inner) = self.inner.write() {
            let mut next = GatewaySettings::clone(&inner);
            change(&mut next);
            *inner = Arc::new(next);
        }
    }
}

impl SettingsProvider for StaticSettingsProvider {
    async fn current(&self) -> Result<Arc<GatewaySettings>, SettingsError> {
        self.inner
            .read()
            .map(|settings| settings.clone())
            .map_err(|_| SettingsError::Unavailable("settings lock poisoned".to_string()))
    }
}
