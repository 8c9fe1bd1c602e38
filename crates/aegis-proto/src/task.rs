//! Task assignment, completion, and dispatch messages.
//!
//! Task payloads are opaque JSON: the master routes and records them but
//! never interprets their contents. Only the agent's task handler does.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Requirements a task declares against candidate workers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskRequirements {
    /// Require a GPU-capable worker.
    pub gpu: Option<bool>,
    /// Require at least this much available memory, in bytes.
    pub min_memory_bytes: Option<u64>,
}

impl TaskRequirements {
    /// Creates an empty requirement set that any active worker satisfies.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            gpu: None,
            min_memory_bytes: None,
        }
    }

    /// Requires a GPU-capable worker.
    #[must_use]
    pub const fn with_gpu(mut self) -> Self {
        self.gpu = Some(true);
        self
    }

    /// Requires a minimum amount of available memory.
    #[must_use]
    pub const fn with_min_memory(mut self, min_memory_bytes: u64) -> Self {
        self.min_memory_bytes = Some(min_memory_bytes);
        self
    }

    /// Whether this task must land on a GPU-capable worker.
    #[must_use]
    pub fn needs_gpu(&self) -> bool {
        self.gpu == Some(true)
    }
}

/// Request to assign a task to the best-fit worker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AssignRequest {
    /// Caller-supplied opaque task identifier.
    pub task_id: String,
    /// Requirements candidate workers must satisfy.
    #[serde(default)]
    pub requirements: TaskRequirements,
}

impl AssignRequest {
    /// Creates an assignment request with no requirements.
    #[must_use]
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            requirements: TaskRequirements::none(),
        }
    }

    /// Sets the requirements.
    #[must_use]
    pub const fn with_requirements(mut self, requirements: TaskRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Validates the identifier.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyTaskId` for an empty id.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.task_id.is_empty() {
            return Err(ValidationError::EmptyTaskId);
        }
        Ok(())
    }
}

/// Assignment outcome naming the chosen worker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AssignResponse {
    /// Echo of the task identifier.
    pub task_id: String,
    /// Chosen worker.
    pub worker_id: String,
    /// Dispatch address of the chosen worker, when it advertised one.
    pub address: Option<String>,
}

/// Lifecycle status of a task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Assigned to a worker, outcome pending.
    Assigned,
    /// Finished successfully.
    Completed,
    /// Finished with a handler failure.
    Failed,
}

impl TaskStatus {
    /// Whether this status ends the task lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Assigned => write!(f, "assigned"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Report that a task reached a terminal state on a worker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CompleteRequest {
    /// Task identifier.
    pub task_id: String,
    /// Worker the task ran on.
    pub worker_id: String,
    /// Terminal status.
    pub status: TaskStatus,
}

impl CompleteRequest {
    /// Creates a successful completion report.
    #[must_use]
    pub fn new(task_id: impl Into<String>, worker_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            worker_id: worker_id.into(),
            status: TaskStatus::Completed,
        }
    }

    /// Marks the report as a handler failure.
    #[must_use]
    pub const fn failed(mut self) -> Self {
        self.status = TaskStatus::Failed;
        self
    }

    /// Validates identifiers and that the status is terminal.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.task_id.is_empty() {
            return Err(ValidationError::EmptyTaskId);
        }
        if self.worker_id.is_empty() {
            return Err(ValidationError::EmptyWorkerId);
        }
        if !self.status.is_terminal() {
            return Err(ValidationError::NonTerminalStatus(self.status));
        }
        Ok(())
    }
}

/// Opaque task delivered to an agent's execute listener.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskPayload {
    /// Task identifier, echoed in the completion report.
    pub task_id: String,
    /// Optional task kind hint for the handler.
    pub kind: Option<String>,
    /// Opaque payload; never interpreted by the scheduler.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl TaskPayload {
    /// Creates a payload-less task.
    #[must_use]
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            kind: None,
            payload: serde_json::Value::Null,
        }
    }

    /// Sets the kind hint.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the opaque payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Validates the identifier.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyTaskId` for an empty id.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.task_id.is_empty() {
            return Err(ValidationError::EmptyTaskId);
        }
        Ok(())
    }
}

/// Acceptance acknowledgement from an agent's execute listener.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExecuteResponse {
    /// Echo of the task identifier.
    pub task_id: String,
    /// Whether the task was accepted for execution.
    pub accepted: bool,
}

/// Aggregate pool statistics.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsResponse {
    /// Total registered workers, active or not.
    pub total_workers: usize,
    /// Workers currently active.
    pub active_workers: usize,
    /// Tasks assigned across the pool since start.
    pub total_tasks_processed: u64,
    /// In-flight task count per worker.
    pub current_load: HashMap<String, u32>,
}
