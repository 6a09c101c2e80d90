//! HTTP handlers for tenant-service.
//!
//! Thin translation between HTTP and the services: every handler returns
//! `Result<_, AppError>` and lets `ServiceError` map to a status code.

pub mod context;
pub mod health;
pub mod role_template;
pub mod tenant;
pub mod user;

pub use health::{health_check, metrics_endpoint, readiness_check};
