//! Infrastructure Layer
//!
//! Usage store implementations.

pub mod memory;
pub mod postgres;
