//! Domain Layer - Usage telemetry vocabulary
//!
//! This layer contains:
//! - Entities (request log entries, usage aggregates)
//! - Query filters
//! - Repository traits (interfaces)

pub mod entities;
pub mod repository;
