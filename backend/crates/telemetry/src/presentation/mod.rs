//! Presentation Layer
//!
//! Usage-recording middleware and the admin statistics routes.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::StatsAppState;
pub use middleware::{UsageRecorder, record_usage};
pub use router::{stats_router, with_usage_recording};
