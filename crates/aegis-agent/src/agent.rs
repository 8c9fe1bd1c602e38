//! Worker agent lifecycle: registration, heartbeats and shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use aegis_proto::{RegisterRequest, RegisterResponse, StatusReport};

use crate::client::MasterClient;
use crate::config::{AgentConfig, HeartbeatConfig, RegistrationConfig};
use crate::error::{AgentError, Result};
use crate::executor::{TaskExecutor, TaskHandler};
use crate::probe::ResourceProbe;

/// Bound on waiting for the heartbeat loop to acknowledge shutdown.
const LOOP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Worker-side agent.
///
/// Owns the worker identity, registers it with the master, keeps the
/// heartbeat loop alive in the background and notifies the master when the
/// process leaves the pool. Task execution is delegated to the embedded
/// [`TaskExecutor`].
#[derive(Debug)]
pub struct WorkerAgent {
    id: String,
    advertise_address: String,
    probe: Arc<dyn ResourceProbe>,
    client: MasterClient,
    executor: Arc<TaskExecutor>,
    registration: RegistrationConfig,
    heartbeat: HeartbeatConfig,
    heartbeat_handle: Option<HeartbeatHandle>,
}

impl WorkerAgent {
    /// Creates an agent from configuration, a resource probe and the task
    /// handler to run workloads with.
    ///
    /// A worker id is generated when the configuration does not pin one.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Http` if the master client cannot be built.
    pub fn new(
        config: &AgentConfig,
        probe: Arc<dyn ResourceProbe>,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<Self> {
        let id = config
            .worker
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let advertise_address = config
            .worker
            .advertise_address
            .clone()
            .unwrap_or_else(|| config.worker.listen_addr.to_string());
        let client = MasterClient::new(&config.master)?;
        let executor = Arc::new(TaskExecutor::new(id.clone(), handler, client.clone()));

        Ok(Self {
            id,
            advertise_address,
            probe,
            client,
            executor,
            registration: config.registration.clone(),
            heartbeat: config.heartbeat.clone(),
            heartbeat_handle: None,
        })
    }

    /// Worker identifier used on the wire.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Executor accepting tasks for this worker.
    #[must_use]
    pub fn executor(&self) -> Arc<TaskExecutor> {
        Arc::clone(&self.executor)
    }

    /// Whether the heartbeat loop is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.heartbeat_handle.is_some()
    }

    /// Registers with the master and starts the heartbeat loop on the
    /// cadence the master returned.
    ///
    /// # Errors
    ///
    /// Returns the last registration error once all attempts are spent.
    pub async fn start(&mut self) -> Result<()> {
        if self.heartbeat_handle.is_some() {
            debug!(worker_id = %self.id, "agent already started");
            return Ok(());
        }

        let response = self.register_with_retries().await?;
        // A zero cadence from the master would spin; fall back to the
        // configured interval.
        let interval = if response.heartbeat_interval_secs == 0 {
            self.heartbeat.interval
        } else {
            Duration::from_secs(response.heartbeat_interval_secs)
        };
        info!(
            worker_id = %self.id,
            interval_secs = response.heartbeat_interval_secs,
            "registered with master"
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join_handle = tokio::spawn(run_heartbeat_loop(
            self.id.clone(),
            interval,
            self.heartbeat.clone(),
            Arc::clone(&self.probe),
            Arc::clone(&self.executor),
            self.client.clone(),
            shutdown_rx,
        ));
        self.heartbeat_handle = Some(HeartbeatHandle {
            shutdown_tx: Some(shutdown_tx),
            join_handle,
        });
        Ok(())
    }

    /// Stops the heartbeat loop and tells the master this worker is gone.
    ///
    /// Safe to call more than once; only the first call does any work.
    pub async fn shutdown(&mut self) {
        let Some(handle) = self.heartbeat_handle.take() else {
            return;
        };

        info!(worker_id = %self.id, "shutting down");
        handle.shutdown(LOOP_SHUTDOWN_TIMEOUT).await;

        if let Err(error) = self.client.shutdown(&self.id).await {
            warn!(worker_id = %self.id, error = %error, "shutdown notice failed");
        }
    }

    async fn register_with_retries(&self) -> Result<RegisterResponse> {
        let request = RegisterRequest::new(&self.id, self.probe.capabilities())
            .with_address(&self.advertise_address);
        request.validate().map_err(AgentError::from)?;

        let mut attempt: u32 = 1;
        loop {
            match self.client.register(&request).await {
                Ok(response) => return Ok(response),
                Err(error) if attempt < self.registration.max_attempts => {
                    warn!(
                        worker_id = %self.id,
                        attempt,
                        max_attempts = self.registration.max_attempts,
                        error = %error,
                        "registration failed, retrying"
                    );
                    sleep(self.registration.retry_delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    error!(
                        worker_id = %self.id,
                        attempts = attempt,
                        error = %error,
                        "registration failed, giving up"
                    );
                    return Err(error);
                }
            }
        }
    }
}

/// Handle to the background heartbeat loop.
#[derive(Debug)]
struct HeartbeatHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Signals the loop to stop and waits for it, bounded by `timeout`.
    async fn shutdown(mut self, timeout: Duration) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if tokio::time::timeout(timeout, &mut self.join_handle)
            .await
            .is_err()
        {
            warn!("heartbeat loop did not stop in time, aborting it");
            self.join_handle.abort();
        }
    }
}

async fn run_heartbeat_loop(
    worker_id: String,
    interval: Duration,
    config: HeartbeatConfig,
    probe: Arc<dyn ResourceProbe>,
    executor: Arc<TaskExecutor>,
    client: MasterClient,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut failures: u32 = 0;
    let mut delay = interval;

    loop {
        tokio::select! {
            () = sleep(delay) => {}
            _ = &mut shutdown_rx => {
                debug!(worker_id = %worker_id, "heartbeat loop stopping");
                break;
            }
        }

        let snapshot = probe.snapshot();
        if snapshot.is_under_pressure(config.pressure_threshold) {
            warn!(
                worker_id = %worker_id,
                cpu_usage = snapshot.cpu_usage,
                memory_usage = snapshot.memory_usage,
                "resource pressure above threshold"
            );
        }

        let mut report = StatusReport::idle()
            .with_load(executor.in_flight())
            .with_usage(snapshot.cpu_usage, snapshot.memory_usage);
        if let Some(gpu_memory) = snapshot.gpu_memory {
            report = report.with_gpu_memory(gpu_memory);
        }

        match client.heartbeat(&worker_id, report).await {
            Ok(()) => {
                failures = 0;
                delay = interval;
            }
            Err(AgentError::UnknownWorker(_)) => {
                // A definitive answer from a live master, not a transport
                // failure; keep the normal cadence and leave re-registration
                // to the operator.
                warn!(worker_id = %worker_id, "master does not recognise this worker");
                failures = 0;
                delay = interval;
            }
            Err(error) => {
                failures += 1;
                delay = backoff_delay(failures - 1, config.backoff_initial, config.backoff_max);
                warn!(
                    worker_id = %worker_id,
                    failures,
                    retry_in = ?delay,
                    error = %error,
                    "heartbeat failed"
                );
            }
        }
    }
}

/// Delay before the next heartbeat attempt after `attempt` consecutive
/// failures, doubling from the initial delay up to the configured cap.
fn backoff_delay(attempt: u32, initial_delay: Duration, max_delay: Duration) -> Duration {
    // Clamp the exponent so the multiplier cannot wrap.
    let multiplier = 2u32.saturating_pow(attempt.min(16));
    initial_delay.saturating_mul(multiplier).min(max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::EchoHandler;
    use crate::probe::StaticProbe;

    use aegis_proto::WorkerCapabilities;

    fn test_agent(config: &AgentConfig) -> WorkerAgent {
        let probe = Arc::new(StaticProbe::new(WorkerCapabilities::new(4, 8_000_000_000)));
        WorkerAgent::new(config, probe, Arc::new(EchoHandler)).unwrap()
    }

    #[test]
    fn backoff_delay_calculation() {
        let initial = Duration::from_millis(100);
        let max = Duration::from_secs(10);

        assert_eq!(backoff_delay(0, initial, max), Duration::from_millis(100));
        assert_eq!(backoff_delay(1, initial, max), Duration::from_millis(200));
        assert_eq!(backoff_delay(2, initial, max), Duration::from_millis(400));
        assert_eq!(backoff_delay(3, initial, max), Duration::from_millis(800));
        assert_eq!(backoff_delay(20, initial, max), max);
    }

    #[test]
    fn generated_worker_id_is_a_uuid() {
        let agent = test_agent(&AgentConfig::default());
        assert!(Uuid::parse_str(agent.id()).is_ok());
    }

    #[test]
    fn configured_worker_id_is_kept() {
        let mut config = AgentConfig::default();
        config.worker.id = Some("worker-7".to_owned());

        let agent = test_agent(&config);
        assert_eq!(agent.id(), "worker-7");
    }

    #[tokio::test]
    async fn shutdown_before_start_is_a_noop() {
        let mut agent = test_agent(&AgentConfig::default());
        assert!(!agent.is_running());

        agent.shutdown().await;
        agent.shutdown().await;
        assert!(!agent.is_running());
    }

    #[tokio::test]
    async fn registration_gives_up_after_max_attempts() {
        let mut config = AgentConfig::default();
        // Nothing listens here; every attempt fails fast.
        config.master.url = "http://127.0.0.1:9".to_owned();
        config.registration.max_attempts = 2;
        config.registration.retry_delay = Duration::from_millis(1);

        let mut agent = test_agent(&config);
        let result = agent.start().await;

        assert!(matches!(result, Err(AgentError::Http(_))));
        assert!(!agent.is_running());
    }
}
