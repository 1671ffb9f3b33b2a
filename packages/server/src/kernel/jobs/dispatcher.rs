//! Job dispatch: either enqueue for a worker or run in the current process.
//!
//! CLI entry points choose a dispatcher from `--sync`. Both variants accept
//! the same [`Job`] so callers never branch on the execution mode.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};
use uuid::Uuid;

use super::job::Job;
use super::queue::{EnqueueResult, JobQueue};
use super::registry::SharedJobRegistry;
use crate::kernel::ServerDeps;

/// What happened to a dispatched job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Stored for a worker.
    Enqueued(Uuid),
    /// A live job with the same idempotency key already exists.
    Duplicate(Uuid),
    /// Executed in-process and returned successfully.
    Completed,
    /// Executed in-process and failed; the error was logged.
    Failed(String),
}

impl DispatchOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, DispatchOutcome::Failed(_))
    }
}

#[async_trait]
pub trait JobDispatcher: Send + Sync {
    async fn dispatch(&self, job: Job) -> Result<DispatchOutcome>;
}

/// Enqueues jobs for asynchronous execution by `JobRunner`.
pub struct QueueDispatcher {
    queue: Arc<dyn JobQueue>,
}

impl QueueDispatcher {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl JobDispatcher for QueueDispatcher {
    async fn dispatch(&self, job: Job) -> Result<DispatchOutcome> {
        let job_type = job.job_type.clone();
        let queue = job.queue.clone();

        match self.queue.enqueue(job).await? {
            EnqueueResult::Created(id) => {
                info!(job_id = %id, job_type = %job_type, queue = %queue, "enqueued job");
                Ok(DispatchOutcome::Enqueued(id))
            }
            EnqueueResult::Duplicate(id) => {
                info!(job_id = %id, job_type = %job_type, "job already pending, skipped enqueue");
                Ok(DispatchOutcome::Duplicate(id))
            }
        }
    }
}

/// Runs each job once, immediately, without retries.
///
/// Handler errors are logged and reported as [`DispatchOutcome::Failed`] so a
/// failing unit does not stop the remaining ones.
pub struct InlineDispatcher {
    registry: SharedJobRegistry,
    deps: Arc<ServerDeps>,
}

impl InlineDispatcher {
    pub fn new(registry: SharedJobRegistry, deps: Arc<ServerDeps>) -> Self {
        Self { registry, deps }
    }
}

#[async_trait]
impl JobDispatcher for InlineDispatcher {
    async fn dispatch(&self, job: Job) -> Result<DispatchOutcome> {
        match self
            .registry
            .execute(&job.job_type, job.args.clone(), self.deps.clone())
            .await
        {
            Ok(()) => Ok(DispatchOutcome::Completed),
            Err(e) => {
                error!(job_type = %job.job_type, args = %job.args, error = %e, "inline job failed");
                Ok(DispatchOutcome::Failed(format!("{:#}", e)))
            }
        }
    }
}
