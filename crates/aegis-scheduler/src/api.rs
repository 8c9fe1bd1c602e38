//! HTTP API handlers for the scheduler.
//!
//! Each handler deserialises a request body, calls the owning component, and
//! maps the typed error onto a status code with a JSON error body. There is
//! no other logic here.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use aegis_proto::{
    Ack, AssignRequest, AssignResponse, CompleteRequest, ErrorBody, HeartbeatRequest,
    RegisterRequest, RegisterResponse, ShutdownRequest, StatsResponse,
};

use crate::error::SchedulerError;
use crate::ledger::TaskLedger;
use crate::registry::{WorkerNode, WorkerRegistry, WorkerStatus};
use crate::selection::Selector;

/// Shared application state.
pub struct AppState {
    pub registry: Arc<WorkerRegistry>,
    pub ledger: Arc<TaskLedger>,
    pub selector: Selector,
    /// Heartbeat interval handed to workers at registration.
    pub heartbeat_interval: Duration,
}

/// Creates the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(health_check))
        // Worker lifecycle
        .route("/worker/register", post(register_worker))
        .route("/worker/heartbeat", post(heartbeat))
        .route("/worker/shutdown", post(shutdown_worker))
        .route("/workers", get(list_workers))
        // Task routing
        .route("/task/assign", post(assign_task))
        .route("/task/complete", post(complete_task))
        // Statistics
        .route("/stats", get(stats))
        .with_state(state)
}

impl IntoResponse for SchedulerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::WorkerNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NoSuitableWorker => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy" })
}

/// Registers a worker and hands back the heartbeat interval to use.
async fn register_worker(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, SchedulerError> {
    state.registry.register(&request)?;
    info!(worker_id = %request.worker_id, has_gpu = request.capabilities.has_gpu, "worker registered");

    Ok(Json(RegisterResponse::accepted(
        request.worker_id,
        state.heartbeat_interval.as_secs(),
    )))
}

/// Ingests a periodic worker heartbeat.
async fn heartbeat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HeartbeatRequest>,
) -> Result<Json<Ack>, SchedulerError> {
    if request.worker_id.is_empty() {
        return Err(SchedulerError::InvalidRequest(
            "worker id must not be empty".to_owned(),
        ));
    }
    state
        .registry
        .update_heartbeat(&request.worker_id, &request.status)?;
    Ok(Json(Ack::ok()))
}

/// Handles an explicit shutdown notice from a worker.
async fn shutdown_worker(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ShutdownRequest>,
) -> Result<Json<Ack>, SchedulerError> {
    request.validate()?;
    state.registry.mark_inactive(&request.worker_id)?;
    info!(worker_id = %request.worker_id, "worker shutdown notice");
    Ok(Json(Ack::ok()))
}

/// Lists all registered workers.
async fn list_workers(State(state): State<Arc<AppState>>) -> Json<Vec<WorkerSummary>> {
    let workers = state.registry.list_all();
    Json(workers.iter().map(WorkerSummary::from).collect())
}

/// Assigns a task to the best-fit worker.
async fn assign_task(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<AssignResponse>, SchedulerError> {
    request.validate()?;

    let workers = state.registry.list_all();
    let worker_id = state
        .selector
        .select(&request.requirements, &workers)
        .ok_or(SchedulerError::NoSuitableWorker)?;

    state
        .ledger
        .assign_task(&request.task_id, &worker_id)
        .map_err(|error| match error {
            // The sweep can evict the chosen worker between the selection
            // snapshot and the recording; the caller named no worker.
            SchedulerError::WorkerNotFound(_) => SchedulerError::NoSuitableWorker,
            other => other,
        })?;
    let address = state.registry.get(&worker_id).and_then(|node| node.address);

    Ok(Json(AssignResponse {
        task_id: request.task_id,
        worker_id,
        address,
    }))
}

/// Records a terminal task completion.
async fn complete_task(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompleteRequest>,
) -> Result<Json<Ack>, SchedulerError> {
    request.validate()?;
    state
        .ledger
        .complete_task(&request.task_id, &request.worker_id, request.status)?;
    Ok(Json(Ack::ok()))
}

/// Aggregate pool statistics.
async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(state.ledger.stats())
}

// Response types

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Per-worker summary for the ops listing.
#[derive(Serialize)]
pub struct WorkerSummary {
    pub id: String,
    pub address: Option<String>,
    pub status: WorkerStatus,
    pub current_load: u32,
    pub tasks_processed: u64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub has_gpu: bool,
    pub last_heartbeat_secs_ago: u64,
    pub registered_at_secs_ago: u64,
}

impl From<&WorkerNode> for WorkerSummary {
    fn from(node: &WorkerNode) -> Self {
        Self {
            id: node.id.clone(),
            address: node.address.clone(),
            status: node.status,
            current_load: node.current_load,
            tasks_processed: node.tasks_processed,
            cpu_usage: node.cpu_usage,
            memory_usage: node.memory_usage,
            has_gpu: node.capabilities.has_gpu,
            last_heartbeat_secs_ago: node.last_heartbeat.elapsed().as_secs(),
            registered_at_secs_ago: node.registered_at.elapsed().as_secs(),
        }
    }
}
