//! Settings Provider Trait
//!
//! Callers ask for `current()` on every request and never keep the result
//! beyond that request, so operator edits apply without a restart.

use crate::domain::settings::GatewaySettings;
use crate::error::SettingsError;
use std::sync::Arc;

/// Source of the live gateway settings
#[trait_variant::make(SettingsProvider: Send)]
pub trait LocalSettingsProvider {
    /// Settings as they are right now
    async fn current(&self) -> Result<Arc<GatewaySettings>, SettingsError>;
}
