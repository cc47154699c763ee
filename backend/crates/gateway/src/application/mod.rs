//! Application Layer - Admission logic
//!
//! Pure decisions used by the middleware in `presentation/`.

pub mod authenticate;
pub mod config;
pub mod envelope;
pub mod hit_counter;
pub mod maintenance;
pub mod registry;
