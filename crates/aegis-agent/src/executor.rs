//! Task execution seam and dispatch bookkeeping.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use aegis_proto::{TaskPayload, TaskStatus};

use crate::client::MasterClient;
use crate::error::Result;

/// Handler invoked for every task dispatched to this agent.
///
/// Implementations see only the payload; registration, heartbeats and
/// completion reporting stay with the agent. A returned error or a panic
/// inside `handle` is reported to the master as a failed completion and
/// never takes the agent down.
#[async_trait]
pub trait TaskHandler: Send + Sync + std::fmt::Debug {
    /// Processes one task and returns its result value.
    async fn handle(&self, task: TaskPayload) -> Result<Value>;
}

/// Default handler that echoes the payload back as the result.
///
/// Stands in until a real workload handler is wired up; useful for
/// exercising the full assignment loop end to end.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoHandler;

#[async_trait]
impl TaskHandler for EchoHandler {
    async fn handle(&self, task: TaskPayload) -> Result<Value> {
        info!(task_id = %task.task_id, "echoing task payload");
        Ok(serde_json::json!({
            "task_id": task.task_id,
            "kind": task.kind,
            "payload": task.payload,
        }))
    }
}

/// Runs tasks on spawned Tokio tasks and reports their terminal status.
///
/// The in-flight gauge counts accepted tasks that have not yet settled and
/// feeds the load figure carried by heartbeats.
#[derive(Debug)]
pub struct TaskExecutor {
    worker_id: String,
    handler: Arc<dyn TaskHandler>,
    client: MasterClient,
    in_flight: Arc<AtomicU32>,
}

impl TaskExecutor {
    /// Creates an executor reporting completions for `worker_id`.
    pub fn new(
        worker_id: impl Into<String>,
        handler: Arc<dyn TaskHandler>,
        client: MasterClient,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            handler,
            client,
            in_flight: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Number of tasks accepted but not yet settled.
    #[must_use]
    pub fn in_flight(&self) -> u32 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Accepts a task and runs it in the background.
    ///
    /// The handler runs on its own spawned task so that a panic surfaces as
    /// a join error here instead of unwinding the dispatch loop. Whatever
    /// the outcome, a terminal completion report goes to the master and the
    /// in-flight gauge is released.
    pub fn dispatch(&self, task: TaskPayload) -> JoinHandle<()> {
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        let worker_id = self.worker_id.clone();
        let handler = Arc::clone(&self.handler);
        let client = self.client.clone();
        let in_flight = Arc::clone(&self.in_flight);

        tokio::spawn(async move {
            let task_id = task.task_id.clone();
            info!(task_id = %task_id, "task started");

            let outcome = tokio::spawn(async move { handler.handle(task).await }).await;

            let status = match outcome {
                Ok(Ok(_)) => {
                    info!(task_id = %task_id, "task completed");
                    TaskStatus::Completed
                }
                Ok(Err(error)) => {
                    error!(task_id = %task_id, error = %error, "task handler failed");
                    TaskStatus::Failed
                }
                Err(error) => {
                    error!(task_id = %task_id, error = %error, "task handler panicked");
                    TaskStatus::Failed
                }
            };

            in_flight.fetch_sub(1, Ordering::Relaxed);

            if let Err(error) = client.complete(&task_id, &worker_id, status).await {
                warn!(task_id = %task_id, error = %error, "completion report failed");
            }
        })
    }
}
