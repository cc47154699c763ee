//! Endpoint classification
//!
//! A path is an "API endpoint" when its first segment is one of the
//! versioned roots in [`API_ROOTS`]. Admission (key checks, hit counters)
//! and telemetry (logs, aggregates) both classify paths through this module
//! so the two layers always agree on what is metered.

/// Roots whose paths are metered and key-checked
pub const API_ROOTS: [&str; 4] = ["api", "ai", "random", "maker"];

/// Version assumed when neither the path nor the header names one
pub const DEFAULT_API_VERSION: &str = "v1";

/// Header a client may use to select an API version
pub const API_VERSION_HEADER: &str = "x-api-version";

/// Return the API root of `path`, if it has one
///
/// ```rust
/// use kernel::endpoint::api_root;
/// assert_eq!(api_root("/api/download/video"), Some("api"));
/// assert_eq!(api_root("/apidocs"), None);
/// assert_eq!(api_root("/status"), None);
/// ```
pub fn api_root(path: &str) -> Option<&'static str> {
    let rest = path.strip_prefix('/')?;
    let (first, tail) = rest.split_once('/')?;
    if tail.is_empty() {
        return None;
    }
    API_ROOTS.iter().copied().find(|root| *root == first)
}

/// True when the path falls under one of the API roots
#[inline]
pub fn is_api_path(path: &str) -> bool {
    api_root(path).is_some()
}

/// Logical endpoint name: the path with its root and version segment removed
///
/// ```rust
/// use kernel::endpoint::endpoint_name;
/// assert_eq!(endpoint_name("/api/v2/download/video/"), Some("download/video".to_string()));
/// assert_eq!(endpoint_name("/ai/chat"), Some("chat".to_string()));
/// assert_eq!(endpoint_name("/settings"), None);
/// ```
pub fn endpoint_name(path: &str) -> Option<String> {
    let root = api_root(path)?;
    let rest = &path[root.len() + 2..];
    let rest = match rest.split_once('/') {
        Some((first, tail)) if is_version_segment(first) => tail,
        None if is_version_segment(rest) => "",
        _ => rest,
    };
    let name = rest.trim_matches('/');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// API version of a request
///
/// A `vN` segment right after the root wins, then the version header,
/// then [`DEFAULT_API_VERSION`].
pub fn api_version(path: &str, header: Option<&str>) -> String {
    if let Some(root) = api_root(path) {
        let rest = &path[root.len() + 2..];
        let first = rest.split('/').next().unwrap_or_default();
        if is_version_segment(first) {
            return first.to_string();
        }
    }
    match header.map(str::trim) {
        Some(v) if is_version_segment(v) => v.to_string(),
        _ => DEFAULT_API_VERSION.to_string(),
    }
}

fn is_version_segment(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}
