//! Application Configuration
//!
//! Process-level knobs for the admission layer. Live, operator-editable
//! settings are not here; they come from a `SettingsProvider`.

use platform::rate_limit::RateLimitConfig;

/// Gateway application configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Per-client fixed window
    pub rate_limit: RateLimitConfig,
    /// Bearer token for `/admin/*`; `None` leaves admin routes open
    pub admin_token: Option<String>,
    /// Largest JSON body the envelope will buffer and rewrite
    pub envelope_body_limit: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            admin_token: None,
            envelope_body_limit: 2 * 1024 * 1024,
        }
    }
}
