//! Request-context values
//!
//! Values that one middleware stage places into request extensions for the
//! stages (and handlers) behind it.

use serde::Serialize;

/// Identity of the API key that admitted a request
///
/// Inserted by the authenticator, read by telemetry and by handlers that
/// want to meter per key. The plaintext key is never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiKeyIdentity {
    pub id: String,
}

impl ApiKeyIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}
