//! Validation errors and the shared error body shape.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::TaskStatus;

/// Errors raised when a request fails boundary validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Worker id was empty.
    #[error("worker id must not be empty")]
    EmptyWorkerId,

    /// Task id was empty.
    #[error("task id must not be empty")]
    EmptyTaskId,

    /// Declared capabilities were malformed.
    #[error("invalid capabilities: {0}")]
    InvalidCapabilities(String),

    /// A usage fraction fell outside 0..=1.
    #[error("{field} must be a fraction in 0..=1, got {value}")]
    UsageOutOfRange { field: &'static str, value: f64 },

    /// A completion carried a non-terminal status.
    #[error("completion status must be terminal, got {0}")]
    NonTerminalStatus(TaskStatus),
}

/// JSON error body returned by both the master API and the agent listener.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    /// Human-readable error description.
    pub error: String,
}

impl ErrorBody {
    /// Creates an error body from any displayable error.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
