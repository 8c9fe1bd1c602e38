//! Aegis worker agent binary.
//!
//! Registers this machine with the master, serves the execute listener and
//! keeps heartbeats flowing until the process is told to stop.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use aegis_agent::{api, AgentConfig, EchoHandler, SystemProbe, WorkerAgent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("aegis_agent=info".parse()?))
        .init();

    info!("Aegis agent starting");

    // Load configuration
    let config = AgentConfig::load()?;
    info!(
        master_url = %config.master.url,
        listen_addr = %config.worker.listen_addr,
        "Configuration loaded"
    );

    // Probe the hardware and build the agent
    let probe = Arc::new(SystemProbe::new());
    let mut agent = WorkerAgent::new(&config, probe, Arc::new(EchoHandler))?;

    // Register and start the heartbeat loop
    agent.start().await?;

    // Serve the execute listener until told to stop
    let state = Arc::new(api::ListenerState {
        worker_id: agent.id().to_owned(),
        executor: agent.executor(),
    });
    let app = api::router(state);
    let listener = TcpListener::bind(config.worker.listen_addr).await?;
    info!(addr = %config.worker.listen_addr, "Execute listener ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Leave the pool cleanly
    agent.shutdown().await;
    info!("Aegis agent stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
