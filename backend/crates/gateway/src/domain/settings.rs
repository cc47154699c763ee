//! Gateway Settings
//!
//! The settings document operators edit at runtime. Field names follow the
//! JSON layout (`maintenance.enabled`, `apiSettings.requireApikey`, ...).

use platform::crypto::secret_eq;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Creator string used when settings omit one or cannot be read
pub const DEFAULT_CREATOR: &str = "gateway";

/// Whole settings document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewaySettings {
    pub maintenance: MaintenanceSettings,
    pub api_settings: ApiSettings,
    pub api_keys: Vec<ApiKeyRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaintenanceSettings {
    pub enabled: bool,
    /// Overrides the default maintenance message
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// When false, API paths are served without a credential
    pub require_apikey: bool,
    /// Branding merged into every JSON response
    pub creator: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            require_apikey: true,
            creator: DEFAULT_CREATOR.to_string(),
        }
    }
}

/// One configured credential
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyRecord {
    /// Secret the client presents
    pub key: String,
    /// Stable identifier recorded in telemetry instead of the key
    pub id: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// API roots the key may call; `None` means all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    /// Admitted requests per UTC day; `None` means unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_limit: Option<u64>,
}

fn enabled_by_default() -> bool {
    true
}

impl ApiKeyRecord {
    pub fn new(key: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            id: id.into(),
            enabled: true,
            scopes: None,
            daily_limit: None,
        }
    }

    /// Whether this key may call endpoints under `root`
    pub fn allows_root(&self, root: &str) -> bool {
        match &self.scopes {
            Some(scopes) => scopes.iter().any(|scope| scope == root),
            None => true,
        }
    }
}

// Keys must never reach logs
impl fmt::Debug for ApiKeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyRecord")
            .field("id", &self.id)
            .field("enabled", &self.enabled)
            .field("scopes", &self.scopes)
            .field("daily_limit", &self.daily_limit)
            .finish_non_exhaustive()
    }
}

impl GatewaySettings {
    /// Find the record for a presented key
    ///
    /// Every configured key is compared so lookup time does not depend on
    /// where (or whether) the key appears in the list.
    pub fn find_key(&self, presented: &str) -> Option<&ApiKeyRecord> {
        let mut found = None;
        for record in &self.api_keys {
            if secret_eq(presented, &record.key) && found.is_none() {
                found = Some(record);
            }
        }
        found
    }

    pub fn creator(&self) -> &str {
        &self.api_settings.creator
    }

    /// Settings safe to show to anonymous callers
    pub fn public_view(&self) -> PublicSettings {
        PublicSettings {
            maintenance: self.maintenance.enabled,
            maintenance_message: self.maintenance.message.clone(),
            require_apikey: self.api_settings.require_apikey,
            creator: self.api_settings.creator.clone(),
        }
    }
}

/// Response for GET /settings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSettings {
    pub maintenance: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_message: Option<String>,
    pub require_apikey: bool,
    pub creator: String,
}
