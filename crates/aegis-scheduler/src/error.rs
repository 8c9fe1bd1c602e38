//! Error types for the scheduler.

use thiserror::Error;

/// Scheduler errors.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Worker not found in the registry.
    #[error("worker not found: {0}")]
    WorkerNotFound(String),

    /// Request failed boundary validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Selection found zero eligible candidates.
    #[error("no suitable worker available")]
    NoSuitableWorker,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<aegis_proto::ValidationError> for SchedulerError {
    fn from(err: aegis_proto::ValidationError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
