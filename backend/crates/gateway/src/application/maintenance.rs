//! Maintenance Gate
//!
//! While maintenance is on, only operational paths get through. API paths
//! receive a JSON rejection, everything else the maintenance page.

use crate::domain::settings::GatewaySettings;
use kernel::endpoint::is_api_path;

/// Paths served normally during maintenance (exact match)
pub const ALLOWED_PATHS: [&str; 6] = [
    "/settings",
    "/status",
    "/health",
    "/support",
    "/metrics",
    "/favicon.ico",
];

/// Paths served normally during maintenance (prefix match)
pub const ALLOWED_PREFIXES: [&str; 3] = ["/assets/", "/static/", "/admin/"];

/// Message used when settings do not provide one
pub const DEFAULT_MESSAGE: &str =
    "Service is under maintenance, please try again later";

/// Canned page for non-API paths
pub const MAINTENANCE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Under Maintenance</title>
<style>
body { font-family: system-ui, sans-serif; display: flex; align-items: center;
       justify-content: center; min-height: 100vh; margin: 0; background: #f5f5f5; }
main { text-align: center; padding: 2rem; }
</style>
</head>
<body>
<main>
<h1>Under Maintenance</h1>
<p>We are performing scheduled maintenance. Please check back soon.</p>
</main>
</body>
</html>
"#;

/// Outcome of the gate for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceDecision {
    Pass,
    RejectJson,
    RejectPage,
}

/// Whether `path` stays reachable during maintenance
pub fn is_allowed(path: &str) -> bool {
    ALLOWED_PATHS.contains(&path) || ALLOWED_PREFIXES.iter().any(|p| path.starts_with(p))
}

pub fn evaluate(settings: &GatewaySettings, path: &str) -> MaintenanceDecision {
    if !settings.maintenance.enabled || is_allowed(path) {
        MaintenanceDecision::Pass
    } else if is_api_path(path) {
        MaintenanceDecision::RejectJson
    } else {
        MaintenanceDecision::RejectPage
    }
}

/// Message shown in the JSON rejection
pub fn message(settings: &GatewaySettings) -> String {
    settings
        .maintenance
        .message
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MESSAGE.to_string())
}
