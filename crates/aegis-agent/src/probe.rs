//! Resource probing for capability detection and status reporting.
//!
//! A [`ResourceProbe`] supplies the hardware facts the agent declares at
//! registration and the usage readings it reports in every heartbeat. The
//! default [`SystemProbe`] reads the local machine through `sysinfo`;
//! [`StaticProbe`] serves tests and embedders that manage their own telemetry.

use parking_lot::Mutex;
use sysinfo::{Disks, System};

use aegis_proto::{GpuInfo, GpuMemory, WorkerCapabilities};

/// A point-in-time reading of local resource usage.
///
/// All fractions are clamped to 0..=1 so a report built from a snapshot
/// always passes boundary validation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceSnapshot {
    /// CPU utilisation, fraction 0..=1.
    pub cpu_usage: f64,
    /// Memory utilisation, fraction 0..=1.
    pub memory_usage: f64,
    /// Disk utilisation, fraction 0..=1. Logged locally, never sent upstream.
    pub disk_usage: f64,
    /// GPU memory snapshot, when the probe has GPU telemetry.
    pub gpu_memory: Option<GpuMemory>,
}

impl ResourceSnapshot {
    /// Returns true if CPU or memory utilisation exceeds the threshold.
    #[must_use]
    pub fn is_under_pressure(&self, threshold: f64) -> bool {
        self.cpu_usage > threshold || self.memory_usage > threshold
    }
}

/// Source of local hardware facts and usage readings.
pub trait ResourceProbe: Send + Sync + std::fmt::Debug {
    /// Declared hardware capabilities, detected once at startup.
    fn capabilities(&self) -> WorkerCapabilities;

    /// Current usage reading.
    fn snapshot(&self) -> ResourceSnapshot;
}

/// System-backed probe reading the local machine through `sysinfo`.
///
/// `sysinfo` carries no GPU telemetry; GPU-equipped hosts declare their
/// device with [`SystemProbe::with_gpu`] and the GPU memory snapshot stays
/// absent from readings.
pub struct SystemProbe {
    system: Mutex<System>,
    capabilities: WorkerCapabilities,
}

impl SystemProbe {
    /// Creates a probe and detects the host's capabilities.
    #[must_use]
    pub fn new() -> Self {
        let system = System::new_all();
        #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
        let cpu_cores = system.cpus().len() as u32;
        let capabilities = WorkerCapabilities::new(cpu_cores, system.total_memory());

        Self {
            system: Mutex::new(system),
            capabilities,
        }
    }

    /// Declares a GPU the host knows it has.
    #[must_use]
    pub fn with_gpu(mut self, gpu_info: GpuInfo) -> Self {
        self.capabilities = self.capabilities.clone().with_gpu(gpu_info);
        self
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemProbe")
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl ResourceProbe for SystemProbe {
    fn capabilities(&self) -> WorkerCapabilities {
        self.capabilities.clone()
    }

    #[allow(clippy::as_conversions, clippy::cast_precision_loss)]
    fn snapshot(&self) -> ResourceSnapshot {
        let mut system = self.system.lock();
        system.refresh_cpu_usage();
        system.refresh_memory();

        let total = system.total_memory();
        let memory_usage = if total == 0 {
            0.0
        } else {
            system.used_memory() as f64 / total as f64
        };
        let cpu_usage = f64::from(system.global_cpu_usage()) / 100.0;

        ResourceSnapshot {
            cpu_usage: cpu_usage.clamp(0.0, 1.0),
            memory_usage: memory_usage.clamp(0.0, 1.0),
            disk_usage: disk_usage(),
            gpu_memory: None,
        }
    }
}

/// Aggregate disk utilisation across all mounted disks.
#[allow(clippy::as_conversions, clippy::cast_precision_loss)]
fn disk_usage() -> f64 {
    let disks = Disks::new_with_refreshed_list();
    let (total, available) = disks
        .list()
        .iter()
        .fold((0u64, 0u64), |(total, available), disk| {
            (
                total.saturating_add(disk.total_space()),
                available.saturating_add(disk.available_space()),
            )
        });

    if total == 0 {
        0.0
    } else {
        (total - available) as f64 / total as f64
    }
}

/// Fixed-reading probe for tests and embedders with their own telemetry.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    capabilities: WorkerCapabilities,
    snapshot: ResourceSnapshot,
}

impl StaticProbe {
    /// Creates a probe with the given capabilities and idle readings.
    #[must_use]
    pub fn new(capabilities: WorkerCapabilities) -> Self {
        Self {
            capabilities,
            snapshot: ResourceSnapshot::default(),
        }
    }

    /// Sets the fixed usage reading.
    #[must_use]
    pub const fn with_snapshot(mut self, snapshot: ResourceSnapshot) -> Self {
        self.snapshot = snapshot;
        self
    }
}

impl ResourceProbe for StaticProbe {
    fn capabilities(&self) -> WorkerCapabilities {
        self.capabilities.clone()
    }

    fn snapshot(&self) -> ResourceSnapshot {
        self.snapshot
    }
}
