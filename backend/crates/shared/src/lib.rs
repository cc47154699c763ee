//! Shared Kernel - vocabulary shared by every gateway crate
//!
//! This crate contains the "smallest core" that the admission layer and the
//! telemetry layer must agree on:
//! - Common error types and result aliases
//! - Typed identifiers (request ids)
//! - Endpoint classification (API roots, logical endpoint names, versions)
//! - Request-context values passed between middleware stages
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all crates.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod endpoint;
pub mod id;
pub mod request;
