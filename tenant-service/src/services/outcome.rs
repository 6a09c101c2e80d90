//! Success/failure protocol shared by every back-end facing operation.
//!
//! Back-end adapters translate their own failure signals into
//! [`ServiceError`] at the call site, so nothing below the HTTP layer ever
//! sees a raw transport or protocol error.

use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found")]
    NotFound,

    #[error("email already in use")]
    EmailCollision,

    #[error("{0}")]
    Message(String),

    #[error("unexpected failure: {0:#}")]
    Exception(anyhow::Error),
}

pub type Outcome<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn message(text: impl Into<String>) -> Self {
        ServiceError::Message(text.into())
    }

    pub fn exception(cause: impl Into<anyhow::Error>) -> Self {
        ServiceError::Exception(cause.into())
    }

    /// Stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound => "not_found",
            ServiceError::EmailCollision => "email_collision",
            ServiceError::Message(_) => "message",
            ServiceError::Exception(_) => "exception",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound)
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Exception(anyhow::Error::new(err))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Exception(anyhow::Error::new(err))
    }
}

impl From<mongodb::error::Error> for ServiceError {
    fn from(err: mongodb::error::Error) -> Self {
        ServiceError::Exception(anyhow::Error::new(err))
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServiceError::Exception(anyhow::Error::new(err))
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound => AppError::NotFound(anyhow::anyhow!("Resource not found")),
            ServiceError::EmailCollision => {
                AppError::Conflict(anyhow::anyhow!("A user with this email already exists"))
            }
            ServiceError::Message(message) => AppError::InternalError(anyhow::anyhow!(message)),
            ServiceError::Exception(cause) => AppError::InternalError(cause),
        }
    }
}

/// Logs `error` under `context`, with detail chosen by variant.
///
/// Fields of the enclosing span (tenant, backend, template) are attached by
/// the subscriber, so callers enter a span rather than repeating them here.
pub fn log_failure(error: &ServiceError, context: &str) {
    match error {
        ServiceError::Message(detail) => {
            tracing::error!(error.kind = error.kind(), detail = %detail, "{}", context)
        }
        ServiceError::Exception(cause) => {
            tracing::error!(error.kind = error.kind(), error = ?cause, "{}", context)
        }
        ServiceError::NotFound | ServiceError::EmailCollision => {
            tracing::warn!(error.kind = error.kind(), "{}", context)
        }
    }
}

/// Treats a missing artifact as already removed.
pub fn absent_is_removed(result: Outcome<()>) -> Outcome<()> {
    match result {
        Err(ServiceError::NotFound) => Ok(()),
        other => other,
    }
}
