//! Worker registry for tracking registered workers.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use aegis_proto::{GpuMemory, RegisterRequest, StatusReport, WorkerCapabilities};

use crate::error::{Result, SchedulerError};

/// Unique worker identifier.
pub type WorkerId = String;

/// Worker registry.
///
/// Thread-safe registry for all registered workers. Each record is mutated
/// under its own map entry lock; no operation holds more than one entry lock
/// at a time.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: DashMap<WorkerId, WorkerNode>,
}

impl WorkerRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: DashMap::new(),
        }
    }

    /// Registers a worker, validating the request first.
    ///
    /// Registration is idempotent: a known id is overwritten with a fresh
    /// record, resetting its load to zero and its status to active.
    pub fn register(&self, request: &RegisterRequest) -> Result<()> {
        request.validate()?;

        let node = WorkerNode::from_register_request(request);
        if self.workers.insert(node.id.clone(), node).is_some() {
            debug!(worker_id = %request.worker_id, "re-registration replaced existing record");
        }
        Ok(())
    }

    /// Gets a worker by id.
    pub fn get(&self, worker_id: &str) -> Option<WorkerNode> {
        self.workers.get(worker_id).map(|r| r.clone())
    }

    /// Updates a worker from a heartbeat report, validating the report first.
    ///
    /// Refreshes the heartbeat timestamp and reactivates a record the
    /// staleness sweep had demoted. Never creates a record for an unknown id.
    pub fn update_heartbeat(&self, worker_id: &str, report: &StatusReport) -> Result<()> {
        report.validate()?;

        let mut worker = self
            .workers
            .get_mut(worker_id)
            .ok_or_else(|| SchedulerError::WorkerNotFound(worker_id.to_owned()))?;

        worker.current_load = report.current_load;
        worker.cpu_usage = report.cpu_usage;
        worker.memory_usage = report.memory_usage;
        worker.gpu_memory = report.gpu_memory;
        worker.status = WorkerStatus::Active;
        worker.last_heartbeat = Instant::now();

        Ok(())
    }

    /// Marks a worker inactive with zero load.
    ///
    /// Used for explicit shutdown notices. The record stays in the registry
    /// until the eviction policy removes it.
    pub fn mark_inactive(&self, worker_id: &str) -> Result<()> {
        let mut worker = self
            .workers
            .get_mut(worker_id)
            .ok_or_else(|| SchedulerError::WorkerNotFound(worker_id.to_owned()))?;

        worker.status = WorkerStatus::Inactive;
        worker.current_load = 0;
        Ok(())
    }

    /// Records a task assignment against a worker.
    pub fn record_assignment(&self, worker_id: &str) -> Result<()> {
        let mut worker = self
            .workers
            .get_mut(worker_id)
            .ok_or_else(|| SchedulerError::WorkerNotFound(worker_id.to_owned()))?;

        worker.current_load += 1;
        worker.tasks_processed += 1;
        Ok(())
    }

    /// Records a task completion against a worker.
    ///
    /// Load never goes below zero, even for unbalanced completion reports.
    pub fn record_completion(&self, worker_id: &str) -> Result<()> {
        let mut worker = self
            .workers
            .get_mut(worker_id)
            .ok_or_else(|| SchedulerError::WorkerNotFound(worker_id.to_owned()))?;

        worker.current_load = worker.current_load.saturating_sub(1);
        Ok(())
    }

    /// Demotes workers with overdue heartbeats and evicts long-silent records.
    ///
    /// A record older than `evict_after` is removed outright; an active record
    /// older than `heartbeat_timeout` is demoted to inactive. Candidates are
    /// collected before any mutation so no entry lock is held across the scan.
    pub fn sweep_stale(&self, heartbeat_timeout: Duration, evict_after: Duration) -> SweepReport {
        let mut to_demote = Vec::new();
        let mut to_evict = Vec::new();

        for entry in &self.workers {
            let age = entry.last_heartbeat.elapsed();
            if age > evict_after {
                to_evict.push(entry.key().clone());
            } else if entry.status == WorkerStatus::Active && age > heartbeat_timeout {
                to_demote.push(entry.key().clone());
            }
        }

        for worker_id in &to_demote {
            if let Some(mut worker) = self.workers.get_mut(worker_id) {
                worker.status = WorkerStatus::Inactive;
            }
        }
        for worker_id in &to_evict {
            self.workers.remove(worker_id);
        }

        SweepReport {
            demoted: to_demote,
            evicted: to_evict,
        }
    }

    /// Lists all workers.
    pub fn list_all(&self) -> Vec<WorkerNode> {
        self.workers.iter().map(|r| r.value().clone()).collect()
    }

    /// Returns the number of registered workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Returns true if no workers are registered.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Returns the number of active workers.
    pub fn active_count(&self) -> usize {
        self.workers
            .iter()
            .filter(|r| r.status == WorkerStatus::Active)
            .count()
    }

    /// Returns the in-flight task count per worker.
    pub fn load_map(&self) -> HashMap<WorkerId, u32> {
        self.workers
            .iter()
            .map(|r| (r.key().clone(), r.current_load))
            .collect()
    }
}

/// Outcome of a staleness sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Workers demoted to inactive this sweep.
    pub demoted: Vec<WorkerId>,
    /// Worker records evicted this sweep.
    pub evicted: Vec<WorkerId>,
}

impl SweepReport {
    /// Returns true if the sweep changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.demoted.is_empty() && self.evicted.is_empty()
    }
}

/// A registered worker as tracked by the master.
#[derive(Debug, Clone)]
pub struct WorkerNode {
    /// Unique worker identifier.
    pub id: WorkerId,
    /// Dispatch address, when the worker advertised one.
    pub address: Option<String>,
    /// Declared hardware capabilities.
    pub capabilities: WorkerCapabilities,
    /// Current status.
    pub status: WorkerStatus,
    /// In-flight task count as tracked by assign/complete.
    pub current_load: u32,
    /// Tasks assigned to this worker since registration.
    pub tasks_processed: u64,
    /// Most recent CPU utilisation report, fraction 0..=1.
    pub cpu_usage: f64,
    /// Most recent memory utilisation report, fraction 0..=1.
    pub memory_usage: f64,
    /// Most recent GPU memory snapshot, if the worker reports one.
    pub gpu_memory: Option<GpuMemory>,
    /// Time of last heartbeat (or registration).
    pub last_heartbeat: Instant,
    /// Time the worker registered.
    pub registered_at: Instant,
}

impl WorkerNode {
    /// Creates a fresh record from a registration request.
    #[must_use]
    pub fn from_register_request(request: &RegisterRequest) -> Self {
        Self {
            id: request.worker_id.clone(),
            address: request.address.clone(),
            capabilities: request.capabilities.clone(),
            status: WorkerStatus::Active,
            current_load: 0,
            tasks_processed: 0,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            gpu_memory: None,
            last_heartbeat: Instant::now(),
            registered_at: Instant::now(),
        }
    }

    /// Memory not currently in use, in bytes, per the latest report.
    #[must_use]
    #[allow(clippy::as_conversions, clippy::cast_precision_loss)]
    pub fn available_memory(&self) -> f64 {
        self.capabilities.memory_bytes as f64 * (1.0 - self.memory_usage)
    }

    /// Age of the last heartbeat.
    #[must_use]
    pub fn heartbeat_age(&self) -> Duration {
        self.last_heartbeat.elapsed()
    }
}

/// Worker status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    /// Worker is heartbeating and eligible for selection.
    Active,
    /// Worker shut down or went stale; excluded from selection.
    Inactive,
}

impl WorkerStatus {
    /// Returns true if the worker can accept tasks.
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}
