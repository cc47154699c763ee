//! Domain Layer - Settings vocabulary
//!
//! This layer contains:
//! - The live settings document (maintenance, API settings, keys)
//! - API key records
//! - The settings provider trait (interface)

pub mod provider;
pub mod settings;
