//! Aegis scheduler binary.
//!
//! Runs the master service for worker registration, task assignment, and
//! staleness sweeping.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use aegis_scheduler::{
    api, HealthConfig, SchedulerConfig, Selector, TaskLedger, WorkerRegistry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("aegis_scheduler=info".parse()?))
        .init();

    info!("Aegis scheduler starting");

    // Load configuration
    let config = SchedulerConfig::load()?;
    info!(listen_addr = %config.api.listen_addr, "Configuration loaded");

    // Create registry and ledger
    let registry = Arc::new(WorkerRegistry::new());
    let ledger = Arc::new(TaskLedger::new(registry.clone(), config.history.max_entries));
    info!(max_history = config.history.max_entries, "Worker registry initialised");

    // Build application state
    let state = Arc::new(api::AppState {
        registry: registry.clone(),
        ledger,
        selector: Selector::new(config.selection),
        heartbeat_interval: config.health.heartbeat_interval,
    });

    // Start the staleness sweep
    let health = config.health.clone();
    tokio::spawn(async move {
        run_staleness_sweep(registry, health).await;
    });
    info!(
        heartbeat_timeout_secs = config.health.heartbeat_timeout.as_secs(),
        evict_after_secs = config.health.evict_after.as_secs(),
        "Staleness sweep started"
    );

    // Build router and serve
    let app = api::router(state);
    let listener = TcpListener::bind(&config.api.listen_addr).await?;
    info!(addr = %config.api.listen_addr, "Scheduler API listening");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_staleness_sweep(registry: Arc<WorkerRegistry>, health: HealthConfig) {
    let mut ticker = tokio::time::interval(health.heartbeat_interval);

    loop {
        ticker.tick().await;

        let report = registry.sweep_stale(health.heartbeat_timeout, health.evict_after);
        for worker_id in &report.demoted {
            warn!(worker_id = %worker_id, "worker heartbeat overdue, demoted to inactive");
        }
        for worker_id in &report.evicted {
            info!(worker_id = %worker_id, "evicted long-silent worker record");
        }
    }
}
