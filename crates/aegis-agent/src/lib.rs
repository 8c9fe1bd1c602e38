//! Worker-side agent for the Aegis pool.
//!
//! Detects what the local machine can offer, announces it to the master and
//! keeps the record alive:
//!
//! - **Probe**: capability detection and resource usage snapshots
//! - **Client**: typed access to the master's worker-facing endpoints
//! - **Agent**: registration with retries, the heartbeat loop with failure
//!   backoff, and the shutdown notice
//! - **Executor**: panic-contained task execution behind the
//!   [`TaskHandler`] seam, with completion reporting
//! - **API**: the execute listener the master dispatches tasks to
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use aegis_agent::{AgentConfig, EchoHandler, SystemProbe, WorkerAgent};
//!
//! let config = AgentConfig::load()?;
//! let probe = Arc::new(SystemProbe::new());
//! let mut agent = WorkerAgent::new(&config, probe, Arc::new(EchoHandler))?;
//! agent.start().await?;
//! // ... serve the execute listener ...
//! agent.shutdown().await;
//! ```

pub mod agent;
pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod probe;

pub use agent::WorkerAgent;
pub use client::MasterClient;
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use executor::{EchoHandler, TaskExecutor, TaskHandler};
pub use probe::{ResourceProbe, ResourceSnapshot, StaticProbe, SystemProbe};
