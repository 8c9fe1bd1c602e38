//! Task assignment bookkeeping and bounded history.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use aegis_proto::{StatsResponse, TaskStatus};

use crate::error::{Result, SchedulerError};
use crate::registry::WorkerRegistry;

/// One assignment/completion record, kept for auditing and statistics only.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskHistoryEntry {
    /// Caller-supplied task identifier.
    pub task_id: String,
    /// Worker the task was assigned to.
    pub worker_id: String,
    /// When the assignment was recorded.
    pub timestamp: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// When a terminal status was recorded.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Ledger of task assignments and completions.
///
/// Wraps the registry's load accounting and keeps a fixed-capacity history
/// ring: appends are O(1) amortised, evicting the oldest entry once the ring
/// is full. The pool-wide assignment counter is independent of worker
/// records, so evicting a worker never deflates the statistics.
#[derive(Debug)]
pub struct TaskLedger {
    registry: Arc<WorkerRegistry>,
    history: Mutex<VecDeque<TaskHistoryEntry>>,
    max_history: usize,
    total_assigned: AtomicU64,
}

impl TaskLedger {
    /// Creates a ledger over the given registry.
    ///
    /// A `max_history` of zero retains no history entries; load accounting
    /// and the assignment counter still run.
    #[must_use]
    pub fn new(registry: Arc<WorkerRegistry>, max_history: usize) -> Self {
        Self {
            registry,
            history: Mutex::new(VecDeque::with_capacity(max_history)),
            max_history,
            total_assigned: AtomicU64::new(0),
        }
    }

    /// Records a task assignment: bumps the worker's load and task counter
    /// and appends an "assigned" history entry.
    pub fn assign_task(&self, task_id: &str, worker_id: &str) -> Result<()> {
        self.registry.record_assignment(worker_id)?;
        self.total_assigned.fetch_add(1, Ordering::Relaxed);

        let entry = TaskHistoryEntry {
            task_id: task_id.to_owned(),
            worker_id: worker_id.to_owned(),
            timestamp: Utc::now(),
            status: TaskStatus::Assigned,
            completed_at: None,
        };

        // A zero-capacity ring keeps no history.
        if self.max_history > 0 {
            let mut history = self.history.lock();
            if history.len() >= self.max_history {
                history.pop_front();
            }
            history.push_back(entry);
        }

        info!(task_id = %task_id, worker_id = %worker_id, "task assigned");
        Ok(())
    }

    /// Records a terminal completion: drops the worker's load and closes the
    /// oldest still-open history entry for the task.
    ///
    /// Duplicate submissions therefore resolve one assignment per completion,
    /// oldest first; already-terminal entries are never rewritten. A report
    /// with no open entry (e.g. the assignment was evicted from the ring)
    /// still adjusts load and succeeds.
    pub fn complete_task(&self, task_id: &str, worker_id: &str, status: TaskStatus) -> Result<()> {
        if !status.is_terminal() {
            return Err(SchedulerError::InvalidRequest(format!(
                "completion status must be terminal, got {status}"
            )));
        }

        self.registry.record_completion(worker_id)?;

        let mut history = self.history.lock();
        let open = history
            .iter_mut()
            .find(|e| e.task_id == task_id && e.status == TaskStatus::Assigned);
        match open {
            Some(entry) => {
                entry.status = status;
                entry.completed_at = Some(Utc::now());
            }
            None => {
                debug!(task_id = %task_id, "completion without an open history entry");
            }
        }
        drop(history);

        info!(task_id = %task_id, worker_id = %worker_id, status = %status, "task completed");
        Ok(())
    }

    /// Aggregate pool statistics.
    #[must_use]
    pub fn stats(&self) -> StatsResponse {
        StatsResponse {
            total_workers: self.registry.len(),
            active_workers: self.registry.active_count(),
            total_tasks_processed: self.total_assigned.load(Ordering::Relaxed),
            current_load: self.registry.load_map(),
        }
    }

    /// Returns up to `limit` history entries, newest first.
    #[must_use]
    pub fn recent_history(&self, limit: usize) -> Vec<TaskHistoryEntry> {
        self.history.lock().iter().rev().take(limit).cloned().collect()
    }

    /// Current history length.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }
}
