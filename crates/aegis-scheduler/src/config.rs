//! Configuration types for the scheduler.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::{Result, SchedulerError};

/// Scheduler configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// HTTP API configuration.
    pub api: ApiConfig,
    /// Heartbeat and staleness configuration.
    pub health: HealthConfig,
    /// Selection scoring weights.
    pub selection: SelectionWeights,
    /// Task history configuration.
    pub history: HistoryConfig,
}

impl SchedulerConfig {
    /// Loads configuration from `scheduler.toml` and `AEGIS_SCHEDULER__*`
    /// environment variables, the latter taking precedence.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Config` when extraction fails.
    pub fn load() -> Result<Self> {
        Figment::new()
            .merge(Toml::file("scheduler.toml"))
            .merge(Env::prefixed("AEGIS_SCHEDULER__").split("__"))
            .extract()
            .map_err(|e| SchedulerError::Config(e.to_string()))
    }
}

/// HTTP API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address to listen on.
    pub listen_addr: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
        }
    }
}

/// Heartbeat and staleness configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Heartbeat interval handed to workers at registration.
    #[serde(with = "serde_duration_secs")]
    pub heartbeat_interval: Duration,
    /// Heartbeat age beyond which a worker is demoted to inactive.
    /// Defaults to three heartbeat intervals.
    #[serde(with = "serde_duration_secs")]
    pub heartbeat_timeout: Duration,
    /// Heartbeat age beyond which a worker record is evicted.
    #[serde(with = "serde_duration_secs")]
    pub evict_after: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(10),
            heartbeat_timeout: Duration::from_secs(30),
            evict_after: Duration::from_secs(300),
        }
    }
}

/// Weights applied by the selection score.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SelectionWeights {
    /// Penalty per in-flight task.
    pub load: f64,
    /// Penalty per unit of CPU utilisation.
    pub cpu: f64,
    /// Penalty per unit of memory utilisation.
    pub memory: f64,
    /// Bonus per unit of free GPU memory on GPU-capable workers.
    pub gpu_headroom: f64,
}

impl Default for SelectionWeights {
    fn default() -> Self {
        Self {
            load: 50.0,
            cpu: 30.0,
            memory: 20.0,
            gpu_headroom: 20.0,
        }
    }
}

/// Task history configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum retained history entries.
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_entries: 1000 }
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
        let config = SchedulerConfig::default();
        assert_eq!(config.api.listen_addr.port(), 8080);
        assert_eq!(config.health.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(config.health.heartbeat_timeout, Duration::from_secs(30));
        assert_eq!(config.history.max_entries, 1000);
        assert!((config.selection.load - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let config: SchedulerConfig = Figment::new()
            .merge(Toml::string(
                r#"
                [api]
                listen_addr = "127.0.0.1:9999"

                [health]
                heartbeat_interval = 2
                heartbeat_timeout = 6
                evict_after = 60

                [selection]
                gpu_headroom = 40.0

                [history]
                max_entries = 16
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(config.api.listen_addr.port(), 9999);
        assert_eq!(config.health.heartbeat_timeout, Duration::from_secs(6));
        assert!((config.selection.gpu_headroom - 40.0).abs() < f64::EPSILON);
        assert!((config.selection.load - 50.0).abs() < f64::EPSILON);
        assert_eq!(config.history.max_entries, 16);
    }
}
