//! Axum HTTP API server.
//!
//! This crate provides:
//! - Photo upload and job hand-off to the video pipeline
//! - Task status polling with reconciliation
//! - Result download and Stripe payment intents
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{Correction, Reconciler};
pub use state::AppState;
