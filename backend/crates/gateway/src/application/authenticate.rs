//! API-Key Authenticator
//!
//! Validates the presented credential for API paths and meters admitted
//! requests per key per UTC day.

use crate::domain::settings::{ApiKeyRecord, GatewaySettings};
use crate::error::{GatewayError, GatewayResult};
use chrono::NaiveDate;
use dashmap::DashMap;
use kernel::endpoint::api_root;
use kernel::request::ApiKeyIdentity;

/// Result of authenticating one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Path is not an API endpoint
    NotApplicable,
    /// Admitted without a usable key (enforcement disabled)
    Anonymous,
    /// Admitted with a valid key
    Authenticated(ApiKeyIdentity),
}

/// Daily admitted-request counters, keyed by key id
#[derive(Debug, Default)]
pub struct KeyUsageMeter {
    usage: DashMap<String, DailyUsage>,
}

#[derive(Debug, Clone, Copy)]
struct DailyUsage {
    day: NaiveDate,
    count: u64,
}

impl KeyUsageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request against `limit`; false when the day's quota is used up
    pub fn try_consume(&self, key_id: &str, limit: Option<u64>, today: NaiveDate) -> bool {
        let mut usage = self
            .usage
            .entry(key_id.to_string())
            .or_insert(DailyUsage { day: today, count: 0 });

        if usage.day != today {
            usage.day = today;
            usage.count = 0;
        }

        if limit.is_some_and(|limit| usage.count >= limit) {
            return false;
        }
        usage.count += 1;
        true
    }

    /// Requests admitted today for a key
    pub fn used_today(&self, key_id: &str, today: NaiveDate) -> u64 {
        self.usage
            .get(key_id)
            .filter(|usage| usage.day == today)
            .map(|usage| usage.count)
            .unwrap_or(0)
    }
}

/// API-key authenticator
#[derive(Debug, Default)]
pub struct ApiKeyAuthenticator {
    meter: KeyUsageMeter,
}

impl ApiKeyAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meter(&self) -> &KeyUsageMeter {
        &self.meter
    }

    /// Decide whether a request to `path` presenting `presented` may proceed
    ///
    /// With enforcement disabled nothing is rejected; a valid key still tags
    /// the request so it is metered under its identity.
    pub fn authenticate(
        &self,
        settings: &GatewaySettings,
        path: &str,
        presented: Option<&str>,
        today: NaiveDate,
    ) -> GatewayResult<AuthOutcome> {
        let Some(root) = api_root(path) else {
            return Ok(AuthOutcome::NotApplicable);
        };

        let verdict = self.verify(settings, root, presented, today);

        if settings.api_settings.require_apikey {
            verdict.map(AuthOutcome::Authenticated)
        } else {
            Ok(verdict
                .map(AuthOutcome::Authenticated)
                .unwrap_or(AuthOutcome::Anonymous))
        }
    }

    fn verify(
        &self,
        settings: &GatewaySettings,
        root: &str,
        presented: Option<&str>,
        today: NaiveDate,
    ) -> GatewayResult<ApiKeyIdentity> {
        let presented = presented
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(GatewayError::MissingApiKey)?;

        let record: &ApiKeyRecord = settings
            .find_key(presented)
            .ok_or(GatewayError::InvalidApiKey)?;

        if !record.enabled {
            return Err(GatewayError::DisabledApiKey);
        }

        if !record.allows_root(root) {
            return Err(GatewayError::KeyOutOfScope {
                root: root.to_string(),
            });
        }

        if !self.meter.try_consume(&record.id, record.daily_limit, today) {
            return Err(GatewayError::QuotaExceeded);
        }

        Ok(ApiKeyIdentity::new(record.id.clone()))
    }
}
