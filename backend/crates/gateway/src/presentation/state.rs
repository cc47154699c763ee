//! Shared middleware state

use crate::application::authenticate::ApiKeyAuthenticator;
use crate::application::config::GatewayConfig;
use crate::application::hit_counter::EndpointHits;
use crate::domain::provider::SettingsProvider;
use crate::domain::settings::GatewaySettings;
use platform::rate_limit::FixedWindowLimiter;
use std::sync::Arc;

/// State shared by every admission middleware
#[derive(Clone)]
pub struct GatewayState<P>
where
    P: SettingsProvider + Clone + Send + Sync + 'static,
{
    pub settings: Arc<P>,
    pub limiter: Arc<FixedWindowLimiter>,
    pub authenticator: Arc<ApiKeyAuthenticator>,
    pub hits: Arc<EndpointHits>,
    pub config: Arc<GatewayConfig>,
}

impl<P> GatewayState<P>
where
    P: SettingsProvider + Clone + Send + Sync + 'static,
{
    pub fn new(settings: P, config: GatewayConfig) -> Self {
        Self {
            settings: Arc::new(settings),
            limiter: Arc::new(FixedWindowLimiter::new(config.rate_limit.clone())),
            authenticator: Arc::new(ApiKeyAuthenticator::new()),
            hits: Arc::new(EndpointHits::new()),
            config: Arc::new(config),
        }
    }
}

/// Settings read once by the maintenance gate and reused by later stages
/// of the same request
#[derive(Debug, Clone)]
pub struct SettingsSnapshot(pub Arc<GatewaySettings>);

/// Token guarding `/admin/*`
#[derive(Debug, Clone, Default)]
pub struct AdminToken(pub Option<Arc<str>>);

impl AdminToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.is_empty()).map(Arc::from))
    }
}
