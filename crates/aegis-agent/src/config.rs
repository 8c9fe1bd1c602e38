//! Configuration types for the agent.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::{AgentError, Result};

/// Agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Master endpoint configuration.
    pub master: MasterConfig,
    /// Local worker identity and listener configuration.
    pub worker: WorkerConfig,
    /// Registration retry configuration.
    pub registration: RegistrationConfig,
    /// Heartbeat loop configuration.
    pub heartbeat: HeartbeatConfig,
}

impl AgentConfig {
    /// Loads configuration from `agent.toml` and `AEGIS_AGENT__*` environment
    /// variables, the latter taking precedence.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Config` when extraction fails.
    pub fn load() -> Result<Self> {
        Figment::new()
            .merge(Toml::file("agent.toml"))
            .merge(Env::prefixed("AEGIS_AGENT__").split("__"))
            .extract()
            .map_err(|e| AgentError::Config(e.to_string()))
    }
}

/// Master endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    /// Base URL of the master scheduler.
    pub url: String,
    /// Per-request timeout.
    #[serde(with = "serde_duration_secs")]
    pub request_timeout: Duration,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".to_owned(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Local worker identity and listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker id; generated at startup when unset.
    pub id: Option<String>,
    /// Address the execute listener binds to.
    pub listen_addr: SocketAddr,
    /// Dispatch address advertised to the master, when reachable from it.
    pub advertise_address: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: None,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 9100),
            advertise_address: None,
        }
    }
}

/// Registration retry configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Attempts before giving up.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    #[serde(with = "serde_duration_secs")]
    pub retry_delay: Duration,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Heartbeat loop configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Interval between heartbeats until the master supplies one.
    #[serde(with = "serde_duration_secs")]
    pub interval: Duration,
    /// Backoff after the first consecutive send failure.
    #[serde(with = "serde_duration_secs")]
    pub backoff_initial: Duration,
    /// Backoff ceiling.
    #[serde(with = "serde_duration_secs")]
    pub backoff_max: Duration,
    /// Usage fraction above which a pressure warning is logged.
    pub pressure_threshold: f64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            backoff_initial: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
            pressure_threshold: 0.9,
        }
    }
}

/// Serde helper for Duration as seconds.
mod serde_duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.master.url, "http://127.0.0.1:8080");
        assert_eq!(config.worker.listen_addr.port(), 9100);
        assert!(config.worker.id.is_none());
        assert_eq!(config.registration.max_attempts, 5);
        assert_eq!(config.heartbeat.interval, Duration::from_secs(10));
        assert_eq!(config.heartbeat.backoff_max, Duration::from_secs(60));
        assert!((config.heartbeat.pressure_threshold - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let config: AgentConfig = Figment::new()
            .merge(Toml::string(
                r#"
                [master]
                url = "http://10.0.0.5:8080"
                request_timeout = 3

                [worker]
                id = "fixed-worker"
                listen_addr = "127.0.0.1:9200"
                advertise_address = "10.0.0.9:9200"

                [registration]
                max_attempts = 2
                retry_delay = 1

                [heartbeat]
                interval = 5
                backoff_initial = 2
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(config.master.url, "http://10.0.0.5:8080");
        assert_eq!(config.master.request_timeout, Duration::from_secs(3));
        assert_eq!(config.worker.id.as_deref(), Some("fixed-worker"));
        assert_eq!(config.worker.advertise_address.as_deref(), Some("10.0.0.9:9200"));
        assert_eq!(config.registration.max_attempts, 2);
        assert_eq!(config.heartbeat.interval, Duration::from_secs(5));
        assert_eq!(config.heartbeat.backoff_initial, Duration::from_secs(2));
        assert_eq!(config.heartbeat.backoff_max, Duration::from_secs(60));
    }
}
