//! Job infrastructure for background command execution.
//!
//! This module provides the kernel-level infrastructure for job execution:
//! - [`PostgresJobQueue`] - Database-backed job queue
//! - [`InMemoryJobQueue`] - Same semantics without a database (tests, local runs)
//! - [`JobRunner`] - Long-running service that polls and executes jobs
//! - [`JobDispatcher`] - Enqueue or run-inline entry point for CLIs
//! - [`Job`] - Job model
//!
//! # Architecture
//!
//! ```text
//! CLI builds a typed job (GenerateBestGymsPageJob, ...)
//!     │
//!     ├─► QueueDispatcher.dispatch()  ─► Insert to DB
//!     └─► InlineDispatcher.dispatch() ─► JobRegistry.execute() now
//!
//! JobRunner
//!     │
//!     ├─► Poll DB (claim jobs via JobQueue)
//!     ├─► Deserialize args and run handler (JobRegistry)
//!     └─► Mark succeeded/failed
//! ```
//!
//! # Domain-Specific Jobs
//!
//! Job types and their handlers live in their respective domains.
//! This module only provides the infrastructure.

mod dispatcher;
mod job;
mod memory;
mod queue;
mod registry;
mod runner;

pub use dispatcher::{DispatchOutcome, InlineDispatcher, JobDispatcher, QueueDispatcher};
pub use job::{ErrorKind, Job, JobStatus, RetryDecision};
pub use memory::InMemoryJobQueue;
pub use queue::{
    ClaimedJob, CommandMeta, EnqueueResult, FailureOutcome, JobQueue, PostgresJobQueue, LEASE_EXHAUSTED_ERROR,
};
pub use registry::{JobRegistry, SharedJobRegistry};
pub use runner::{classify_error, JobRunner, JobRunnerConfig};
