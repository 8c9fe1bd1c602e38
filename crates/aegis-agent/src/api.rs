//! HTTP listener accepting task dispatches from the master.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use aegis_proto::{ErrorBody, ExecuteResponse, TaskPayload};

use crate::error::AgentError;
use crate::executor::TaskExecutor;

/// Shared listener state.
pub struct ListenerState {
    pub worker_id: String,
    pub executor: Arc<TaskExecutor>,
}

/// Creates the listener router.
pub fn router(state: Arc<ListenerState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/execute", post(execute_task))
        .with_state(state)
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidTask(_) => StatusCode::BAD_REQUEST,
            Self::UnknownWorker(_) => StatusCode::NOT_FOUND,
            Self::Http(_) | Self::Rejected(_) => StatusCode::BAD_GATEWAY,
            Self::TaskExecution(_) | Self::Config(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<ListenerState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        worker_id: state.worker_id.clone(),
        in_flight: state.executor.in_flight(),
    })
}

/// Accepts a task and hands it to the executor.
///
/// Acceptance is acknowledged immediately; the outcome travels back to the
/// master as a completion report, not in this response.
async fn execute_task(
    State(state): State<Arc<ListenerState>>,
    Json(task): Json<TaskPayload>,
) -> Result<Json<ExecuteResponse>, AgentError> {
    task.validate()
        .map_err(|error| AgentError::InvalidTask(error.to_string()))?;

    let task_id = task.task_id.clone();
    info!(task_id = %task_id, "task accepted");
    state.executor.dispatch(task);

    Ok(Json(ExecuteResponse {
        task_id,
        accepted: true,
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    worker_id: String,
    in_flight: u32,
}
