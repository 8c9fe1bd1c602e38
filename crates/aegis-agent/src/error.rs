//! Error types for the agent.

use thiserror::Error;

/// Agent errors.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Transport failure talking to the master.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The master answered with an error status.
    #[error("rejected by master: {0}")]
    Rejected(String),

    /// The master has no record of this worker.
    #[error("unknown to master: {0}")]
    UnknownWorker(String),

    /// The task handler failed while processing a task.
    #[error("task execution failed: {0}")]
    TaskExecution(String),

    /// An inbound task failed validation at the execute listener.
    #[error("invalid task: {0}")]
    InvalidTask(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<aegis_proto::ValidationError> for AgentError {
    fn from(err: aegis_proto::ValidationError) -> Self {
        Self::Rejected(err.to_string())
    }
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
