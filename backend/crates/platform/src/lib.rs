//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Client identification and header redaction
//! - Constant-time secret comparison
//! - Fixed-window rate limiting and its idle-client sweeper

pub mod client;
pub mod crypto;
pub mod rate_limit;
