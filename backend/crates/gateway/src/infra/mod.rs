//! Infrastructure Layer
//!
//! Settings provider implementations.

pub mod file;
pub mod memory;
