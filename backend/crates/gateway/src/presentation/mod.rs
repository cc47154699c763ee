//! Presentation Layer
//!
//! Axum middleware and admin routes.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
