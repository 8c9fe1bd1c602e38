//! Master-side worker pool scheduling.
//!
//! This crate tracks a pool of heterogeneous compute workers and routes
//! opaque analysis tasks to the best-fit node:
//!
//! - **Registry**: worker registration, heartbeat ingestion, shutdown
//!   notices, staleness demotion and eviction
//! - **Selection**: requirement filtering and capability/load scoring with a
//!   deterministic tie-break
//! - **Ledger**: assignment and completion bookkeeping over a bounded
//!   history ring, plus aggregate statistics
//! - **API**: thin HTTP surface exposing the operation contracts
//!
//! All state is in-memory; a master restart loses the pool and workers must
//! be re-registered by an operator.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use aegis_proto::{RegisterRequest, TaskRequirements, WorkerCapabilities};
//! use aegis_scheduler::{Selector, SelectionWeights, TaskLedger, WorkerRegistry};
//!
//! let registry = Arc::new(WorkerRegistry::new());
//! registry.register(&RegisterRequest::new(
//!     "worker-1",
//!     WorkerCapabilities::new(8, 16_000_000_000),
//! ))?;
//!
//! let selector = Selector::new(SelectionWeights::default());
//! let ledger = TaskLedger::new(registry.clone(), 1000);
//! if let Some(worker_id) = selector.select(&TaskRequirements::none(), &registry.list_all()) {
//!     ledger.assign_task("scan-1", &worker_id)?;
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod selection;

pub use config::{ApiConfig, HealthConfig, HistoryConfig, SchedulerConfig, SelectionWeights};
pub use error::{Result, SchedulerError};
pub use ledger::{TaskHistoryEntry, TaskLedger};
pub use registry::{SweepReport, WorkerId, WorkerNode, WorkerRegistry, WorkerStatus};
pub use selection::Selector;
