//! Test fixtures for scheduler integration tests.

use aegis_proto::{GpuInfo, GpuMemory, RegisterRequest, StatusReport, WorkerCapabilities};

/// Builder for creating test registration requests.
pub struct WorkerBuilder {
    id: String,
    address: Option<String>,
    cpu_cores: u32,
    memory_bytes: u64,
    gpu: Option<GpuInfo>,
}

impl WorkerBuilder {
    /// Creates a new worker builder with the given ID.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            address: None,
            cpu_cores: 4,
            memory_bytes: 8_000_000_000,
            gpu: None,
        }
    }

    /// Sets the worker's dispatch address.
    pub fn with_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    /// Sets the worker's CPU core count.
    pub fn with_cpu_cores(mut self, cores: u32) -> Self {
        self.cpu_cores = cores;
        self
    }

    /// Sets the worker's total memory in bytes.
    pub fn with_memory(mut self, bytes: u64) -> Self {
        self.memory_bytes = bytes;
        self
    }

    /// Gives the worker a single GPU with the given memory.
    pub fn with_gpu(mut self, memory_bytes: u64) -> Self {
        self.gpu = Some(GpuInfo {
            name: "test-gpu".to_string(),
            count: 1,
            memory_bytes,
        });
        self
    }

    /// Builds the registration request.
    pub fn build(self) -> RegisterRequest {
        let mut capabilities = WorkerCapabilities::new(self.cpu_cores, self.memory_bytes);
        if let Some(gpu) = self.gpu {
            capabilities = capabilities.with_gpu(gpu);
        }

        let mut request = RegisterRequest::new(self.id, capabilities);
        if let Some(address) = self.address {
            request = request.with_address(address);
        }
        request
    }
}

/// Creates a heartbeat report with the given readings.
pub fn report(current_load: u32, cpu_usage: f64, memory_usage: f64) -> StatusReport {
    StatusReport::idle()
        .with_load(current_load)
        .with_usage(cpu_usage, memory_usage)
}

/// Creates a GPU memory snapshot with the given allocation.
pub fn gpu_snapshot(total_bytes: u64, allocated_bytes: u64) -> GpuMemory {
    GpuMemory {
        total_bytes,
        allocated_bytes,
        cached_bytes: 0,
    }
}

/// Creates multiple identical registration requests with incrementing IDs.
pub fn create_workers(prefix: &str, count: usize) -> Vec<RegisterRequest> {
    (0..count)
        .map(|i| WorkerBuilder::new(&format!("{prefix}-{i}")).build())
        .collect()
}
