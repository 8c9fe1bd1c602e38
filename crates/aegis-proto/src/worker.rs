//! Worker registration and status report messages.
//!
//! These types flow between the agent and the master:
//!
//! - **Agent → Master**: registration, periodic heartbeats, shutdown notices
//! - **Master → Agent**: registration acknowledgement carrying the heartbeat
//!   interval the agent should use

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Hardware capabilities a worker declares at registration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WorkerCapabilities {
    /// Number of logical CPU cores.
    pub cpu_cores: u32,
    /// Total system memory in bytes.
    pub memory_bytes: u64,
    /// Whether a GPU is present.
    pub has_gpu: bool,
    /// GPU details when present.
    pub gpu_info: Option<GpuInfo>,
}

impl WorkerCapabilities {
    /// Creates CPU-only capabilities.
    #[must_use]
    pub const fn new(cpu_cores: u32, memory_bytes: u64) -> Self {
        Self {
            cpu_cores,
            memory_bytes,
            has_gpu: false,
            gpu_info: None,
        }
    }

    /// Attaches GPU details and marks the worker GPU-capable.
    #[must_use]
    pub fn with_gpu(mut self, gpu_info: GpuInfo) -> Self {
        self.has_gpu = true;
        self.gpu_info = Some(gpu_info);
        self
    }

    /// Checks the declaration for obviously malformed values.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidCapabilities` when cores or memory
    /// are zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cpu_cores == 0 {
            return Err(ValidationError::InvalidCapabilities(
                "cpu_cores must be at least 1".to_owned(),
            ));
        }
        if self.memory_bytes == 0 {
            return Err(ValidationError::InvalidCapabilities(
                "memory_bytes must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

/// GPU details declared at registration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GpuInfo {
    /// Device name as reported by the driver.
    pub name: String,
    /// Number of devices.
    pub count: u32,
    /// Total GPU memory in bytes.
    pub memory_bytes: u64,
}

/// GPU memory snapshot carried in heartbeats.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpuMemory {
    /// Total GPU memory in bytes.
    pub total_bytes: u64,
    /// Memory currently allocated in bytes.
    pub allocated_bytes: u64,
    /// Memory held in the allocator cache in bytes.
    pub cached_bytes: u64,
}

impl GpuMemory {
    /// Fraction of GPU memory currently allocated.
    ///
    /// A snapshot with zero total reports full utilisation so that selection
    /// never awards headroom it cannot verify.
    #[must_use]
    #[allow(clippy::as_conversions, clippy::cast_precision_loss)]
    pub fn utilisation(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        self.allocated_bytes as f64 / self.total_bytes as f64
    }
}

/// Point-in-time status a worker reports about itself.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// Number of tasks currently executing.
    pub current_load: u32,
    /// CPU utilisation as a fraction in 0..=1.
    pub cpu_usage: f64,
    /// Memory utilisation as a fraction in 0..=1.
    pub memory_usage: f64,
    /// GPU memory snapshot when the worker has a GPU.
    pub gpu_memory: Option<GpuMemory>,
}

impl StatusReport {
    /// Creates an idle report with zeroed readings.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            current_load: 0,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            gpu_memory: None,
        }
    }

    /// Sets the in-flight task count.
    #[must_use]
    pub const fn with_load(mut self, current_load: u32) -> Self {
        self.current_load = current_load;
        self
    }

    /// Sets the CPU and memory utilisation fractions.
    #[must_use]
    pub const fn with_usage(mut self, cpu_usage: f64, memory_usage: f64) -> Self {
        self.cpu_usage = cpu_usage;
        self.memory_usage = memory_usage;
        self
    }

    /// Attaches a GPU memory snapshot.
    #[must_use]
    pub const fn with_gpu_memory(mut self, gpu_memory: GpuMemory) -> Self {
        self.gpu_memory = Some(gpu_memory);
        self
    }

    /// Checks that utilisation fractions are finite and within 0..=1.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UsageOutOfRange` naming the offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [("cpu_usage", self.cpu_usage), ("memory_usage", self.memory_usage)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::UsageOutOfRange { field, value });
            }
        }
        Ok(())
    }
}

/// Worker registration request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    /// Unique worker identifier.
    pub worker_id: String,
    /// Address of the worker's execute listener, if it runs one.
    pub address: Option<String>,
    /// Declared hardware capabilities.
    pub capabilities: WorkerCapabilities,
}

impl RegisterRequest {
    /// Creates a registration request.
    #[must_use]
    pub fn new(worker_id: impl Into<String>, capabilities: WorkerCapabilities) -> Self {
        Self {
            worker_id: worker_id.into(),
            address: None,
            capabilities,
        }
    }

    /// Sets the dispatch address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Validates the identifier and capability declaration.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.worker_id.is_empty() {
            return Err(ValidationError::EmptyWorkerId);
        }
        self.capabilities.validate()
    }
}

/// Registration acknowledgement from the master.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisterResponse {
    /// Echo of the registered worker id.
    pub worker_id: String,
    /// Heartbeat interval the worker should use, in seconds.
    pub heartbeat_interval_secs: u64,
}

impl RegisterResponse {
    /// Creates an acknowledgement carrying the interval the worker should use.
    #[must_use]
    pub fn accepted(worker_id: impl Into<String>, heartbeat_interval_secs: u64) -> Self {
        Self {
            worker_id: worker_id.into(),
            heartbeat_interval_secs,
        }
    }
}

/// Periodic heartbeat from a worker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HeartbeatRequest {
    /// Worker identifier.
    pub worker_id: String,
    /// Current status readings.
    pub status: StatusReport,
}

impl HeartbeatRequest {
    /// Creates a heartbeat request.
    #[must_use]
    pub fn new(worker_id: impl Into<String>, status: StatusReport) -> Self {
        Self {
            worker_id: worker_id.into(),
            status,
        }
    }

    /// Validates the identifier and status readings.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.worker_id.is_empty() {
            return Err(ValidationError::EmptyWorkerId);
        }
        self.status.validate()
    }
}

/// Shutdown notice from a worker leaving the pool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ShutdownRequest {
    /// Worker identifier.
    pub worker_id: String,
}

impl ShutdownRequest {
    /// Creates a shutdown notice.
    #[must_use]
    pub fn new(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
        }
    }

    /// Validates the identifier.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyWorkerId` for an empty id.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.worker_id.is_empty() {
            return Err(ValidationError::EmptyWorkerId);
        }
        Ok(())
    }
}

/// Generic acknowledgement body.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Always true; errors travel as status codes with an `ErrorBody`.
    pub ok: bool,
}

impl Ack {
    /// Creates a positive acknowledgement.
    #[must_use]
    pub const fn ok() -> Self {
        Self { ok: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_builder() {
        let caps = WorkerCapabilities::new(8, 16_000_000_000).with_gpu(GpuInfo {
            name: "test-gpu".to_owned(),
            count: 1,
            memory_bytes: 8_000_000_000,
        });
        let req = RegisterRequest::new("worker-1", caps).with_address("127.0.0.1:9100");

        assert_eq!(req.worker_id, "worker-1");
        assert_eq!(req.address.as_deref(), Some("127.0.0.1:9100"));
        assert!(req.capabilities.has_gpu);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn register_request_rejects_empty_id() {
        let req = RegisterRequest::new("", WorkerCapabilities::new(4, 8_000_000_000));
        assert_eq!(req.validate(), Err(ValidationError::EmptyWorkerId));
    }

    #[test]
    fn capabilities_reject_zero_cores() {
        let caps = WorkerCapabilities::new(0, 8_000_000_000);
        assert!(matches!(
            caps.validate(),
            Err(ValidationError::InvalidCapabilities(_))
        ));
    }

    #[test]
    fn heartbeat_rejects_out_of_range_usage() {
        let status = StatusReport::idle().with_usage(0.4, 1.2);
        let req = HeartbeatRequest::new("worker-1", status);
        assert!(matches!(
            req.validate(),
            Err(ValidationError::UsageOutOfRange {
                field: "memory_usage",
                ..
            })
        ));
    }

    #[test]
    fn gpu_memory_utilisation_guards_zero_total() {
        let empty = GpuMemory::default();
        assert!((empty.utilisation() - 1.0).abs() < f64::EPSILON);

        let half = GpuMemory {
            total_bytes: 8_000_000_000,
            allocated_bytes: 4_000_000_000,
            cached_bytes: 0,
        };
        assert!((half.utilisation() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn status_report_serialises_optional_gpu() {
        let report = StatusReport::idle().with_load(2).with_usage(0.25, 0.5);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["current_load"], 2);
        assert_eq!(json["gpu_memory"], serde_json::Value::Null);
    }
}
