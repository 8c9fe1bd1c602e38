//! Common test utilities for scheduler integration tests.

pub mod fixtures;

use aegis_scheduler::{
    api::AppState,
    config::{HealthConfig, HistoryConfig, SelectionWeights},
    Selector, TaskLedger, WorkerRegistry,
};
use std::sync::Arc;

/// Complete test scheduler setup with all components wired together.
pub struct TestScheduler {
    pub registry: Arc<WorkerRegistry>,
    pub ledger: Arc<TaskLedger>,
    pub health_config: HealthConfig,
    pub app_state: Arc<AppState>,
}

impl TestScheduler {
    /// Creates a new test scheduler with default configuration.
    pub fn new() -> Self {
        Self::with_config(
            HealthConfig::default(),
            SelectionWeights::default(),
            HistoryConfig::default(),
        )
    }

    /// Creates a new test scheduler with custom health, selection, and history configuration.
    pub fn with_config(
        health_config: HealthConfig,
        weights: SelectionWeights,
        history_config: HistoryConfig,
    ) -> Self {
        let registry = Arc::new(WorkerRegistry::new());
        let ledger = Arc::new(TaskLedger::new(registry.clone(), history_config.max_entries));

        let app_state = Arc::new(AppState {
            registry: registry.clone(),
            ledger: ledger.clone(),
            selector: Selector::new(weights),
            heartbeat_interval: health_config.heartbeat_interval,
        });

        Self {
            registry,
            ledger,
            health_config,
            app_state,
        }
    }

    /// Creates a test scheduler with fast staleness windows for time-sensitive tests.
    pub fn with_fast_staleness() -> Self {
        use std::time::Duration;

        let health_config = HealthConfig {
            heartbeat_interval: Duration::from_millis(50),
            heartbeat_timeout: Duration::from_millis(100),
            evict_after: Duration::from_millis(400),
        };

        Self::with_config(
            health_config,
            SelectionWeights::default(),
            HistoryConfig::default(),
        )
    }

    /// Runs one staleness sweep with this scheduler's configured windows.
    pub fn sweep(&self) -> aegis_scheduler::SweepReport {
        self.registry.sweep_stale(
            self.health_config.heartbeat_timeout,
            self.health_config.evict_after,
        )
    }
}

impl Default for TestScheduler {
    fn default() -> Self {
        Self::new()
    }
}
