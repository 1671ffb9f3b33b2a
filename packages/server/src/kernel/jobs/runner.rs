//! Job runner service for processing background jobs.
//!
//! The `JobRunner` is a background service that:
//! - Polls the queue for ready jobs on its queues
//! - Deserializes and executes jobs using the registry
//! - Handles status updates (succeeded/failed)
//! - Logs dead-lettered jobs with their arguments
//!
//! # Architecture
//!
//! ```text
//! JobRunner
//!     │
//!     ├─► Poll DB (claim jobs via JobQueue)
//!     ├─► Execute via JobRegistry (deserialize + call handler)
//!     └─► Mark succeeded/failed (JobQueue handles retries)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::queue::{ClaimedJob, FailureOutcome, JobQueue};
use super::registry::SharedJobRegistry;
use super::ErrorKind;
use crate::kernel::ServerDeps;

/// Configuration for the job runner.
#[derive(Debug, Clone)]
pub struct JobRunnerConfig {
    /// Maximum number of jobs to claim at once
    pub batch_size: i64,
    /// How long to wait when no jobs are available
    pub poll_interval: Duration,
    /// Worker ID for this instance
    pub worker_id: String,
    /// Queues this runner consumes
    pub queues: Vec<String>,
}

impl Default for JobRunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval: Duration::from_secs(5),
            worker_id: format!("runner-{}", Uuid::new_v4()),
            queues: vec!["default".to_string()],
        }
    }
}

impl JobRunnerConfig {
    /// Create a new config with a specific worker ID.
    pub fn with_worker_id(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ..Default::default()
        }
    }

    pub fn with_queues(mut self, queues: Vec<String>) -> Self {
        if !queues.is_empty() {
            self.queues = queues;
        }
        self
    }
}

/// Background service that processes jobs from the queue.
///
/// The runner polls for jobs, executes them via the registry,
/// and updates their status. Retries are handled by the job
/// queue's `mark_failed` implementation.
pub struct JobRunner {
    job_queue: Arc<dyn JobQueue>,
    registry: SharedJobRegistry,
    deps: Arc<ServerDeps>,
    config: JobRunnerConfig,
    shutdown: Arc<AtomicBool>,
}

impl JobRunner {
    /// Create a new job runner.
    pub fn new(job_queue: Arc<dyn JobQueue>, registry: SharedJobRegistry, deps: Arc<ServerDeps>) -> Self {
        Self::with_config(job_queue, registry, deps, JobRunnerConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(
        job_queue: Arc<dyn JobQueue>,
        registry: SharedJobRegistry,
        deps: Arc<ServerDeps>,
        config: JobRunnerConfig,
    ) -> Self {
        Self {
            job_queue,
            registry,
            deps,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a shutdown handle for graceful shutdown.
    ///
    /// Call `store(true, Ordering::SeqCst)` on the returned Arc to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Request shutdown of the runner.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Claim one batch of jobs and execute them sequentially.
    ///
    /// Returns the number of jobs processed.
    pub async fn run_once(&self) -> Result<usize> {
        let jobs = self
            .job_queue
            .claim(&self.config.queues, &self.config.worker_id, self.config.batch_size)
            .await?;

        if !jobs.is_empty() {
            debug!(count = jobs.len(), "claimed jobs");
        }

        let mut processed = 0;
        for job in jobs {
            if self.is_shutdown_requested() {
                break;
            }
            self.process(job).await;
            processed += 1;
        }

        Ok(processed)
    }

    async fn process(&self, job: ClaimedJob) {
        let job_id = job.id;
        let job_type = job.command_type().to_string();

        debug!(job_id = %job_id, job_type = %job_type, attempt = job.job.attempt, "executing job");

        let result = self
            .registry
            .execute(&job_type, job.job.args.clone(), self.deps.clone())
            .await;

        match result {
            Ok(()) => {
                info!(job_id = %job_id, job_type = %job_type, "job succeeded");
                if let Err(e) = self.job_queue.mark_succeeded(job_id).await {
                    error!(job_id = %job_id, error = %e, "failed to mark job as succeeded");
                }
            }
            Err(e) => {
                warn!(job_id = %job_id, job_type = %job_type, attempt = job.job.attempt, error = %e, "job failed");

                // Classify error for retry decision
                let error_kind = classify_error(&e);

                match self.job_queue.mark_failed(job_id, &format!("{:#}", e), error_kind).await {
                    Ok(FailureOutcome::DeadLettered) => {
                        error!(
                            job_id = %job_id,
                            job_type = %job_type,
                            attempts = job.job.attempt,
                            args = %job.job.args,
                            error = %e,
                            "job dead-lettered"
                        );
                    }
                    Ok(FailureOutcome::Retrying { attempt }) => {
                        debug!(job_id = %job_id, next_attempt = attempt, "job will be retried");
                    }
                    Err(mark_err) => {
                        error!(job_id = %job_id, error = %mark_err, "failed to mark job as failed");
                    }
                }
            }
        }
    }

    /// Run the job runner until shutdown is requested.
    ///
    /// This is the main loop that polls for jobs and executes them.
    /// Call `request_shutdown()` to stop the runner gracefully.
    pub async fn run(self) -> Result<()> {
        info!(
            worker_id = %self.config.worker_id,
            queues = ?self.config.queues,
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "job runner starting"
        );

        while !self.is_shutdown_requested() {
            match self.run_once().await {
                Ok(0) => tokio::time::sleep(self.config.poll_interval).await,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "failed to claim jobs");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        info!(worker_id = %self.config.worker_id, "job runner stopped");
        Ok(())
    }

    /// Run until a shutdown signal is received.
    ///
    /// Convenience method that listens for Ctrl+C.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown_handle();

        // Spawn signal handler
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
            shutdown.store(true, Ordering::SeqCst);
        });

        self.run().await
    }
}

/// Classify an error to determine retry behavior.
///
/// Returns `Retryable` for transient errors that may succeed on retry,
/// and `NonRetryable` for permanent failures.
pub fn classify_error(error: &anyhow::Error) -> ErrorKind {
    let error_str = format!("{:#}", error).to_lowercase();

    // Non-retryable: unknown job types and malformed payloads
    if error_str.contains("unknown job type")
        || error_str.contains("invalid")
        || error_str.contains("deserialize")
    {
        return ErrorKind::NonRetryable;
    }

    // Everything else is retryable (database errors, timeouts, etc.)
    ErrorKind::Retryable
}
