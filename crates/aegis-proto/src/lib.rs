//! Wire types shared by the Aegis master and worker agent.
//!
//! Everything on the wire is JSON over HTTP. This crate holds the request and
//! response bodies for:
//!
//! - Worker lifecycle (register, heartbeat, shutdown)
//! - Task routing (assign, complete, dispatch to an agent)
//! - Pool statistics
//!
//! Requests validate themselves at the boundary; transport layers map
//! [`ValidationError`] to a client-visible response and never panic on bad
//! input.

mod error;
mod task;
mod worker;

pub use error::{ErrorBody, ValidationError};
pub use task::{
    AssignRequest, AssignResponse, CompleteRequest, ExecuteResponse, StatsResponse, TaskPayload,
    TaskRequirements, TaskStatus,
};
pub use worker::{
    Ack, GpuInfo, GpuMemory, HeartbeatRequest, RegisterRequest, RegisterResponse, ShutdownRequest,
    StatusReport, WorkerCapabilities,
};
