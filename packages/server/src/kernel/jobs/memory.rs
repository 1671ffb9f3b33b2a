//! In-process job queue with the same claim/retry semantics as the Postgres one.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use super::job::{ErrorKind, Job, JobStatus, RetryDecision};
use super::queue::{ClaimedJob, EnqueueResult, FailureOutcome, JobQueue, LEASE_EXHAUSTED_ERROR};

pub struct InMemoryJobQueue {
    jobs: Mutex<Vec<Job>>,
    lease: Duration,
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            lease: Duration::from_secs(15 * 60),
        }
    }

    /// Snapshot of every stored job, in enqueue order.
    pub fn jobs(&self) -> Vec<Job> {
        self.lock().clone()
    }

    pub fn jobs_with_status(&self, status: JobStatus) -> Vec<Job> {
        self.lock().iter().filter(|j| j.status == status).cloned().collect()
    }

    /// Make every pending job due now (skips backoff in tests).
    pub fn release_delayed(&self) {
        let now = Utc::now();
        for job in self.lock().iter_mut().filter(|j| j.status == JobStatus::Pending) {
            job.run_at = now;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Job>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: Job) -> Result<EnqueueResult> {
        let mut jobs = self.lock();

        if let Some(key) = &job.idempotency_key {
            let live = jobs.iter().find(|j| {
                j.idempotency_key.as_ref() == Some(key)
                    && matches!(j.status, JobStatus::Pending | JobStatus::Running)
            });
            if let Some(existing) = live {
                return Ok(EnqueueResult::Duplicate(existing.id));
            }
        }

        let id = job.id;
        jobs.push(job);
        Ok(EnqueueResult::Created(id))
    }

    async fn claim(&self, queues: &[String], worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>> {
        let now = Utc::now();
        let lease_until = now + chrono::Duration::seconds(self.lease.as_secs() as i64);
        let mut jobs = self.lock();

        for job in jobs.iter_mut().filter(|j| queues.contains(&j.queue) && j.lease_exhausted(now)) {
            warn!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempt = job.attempt,
                args = %job.args,
                "job lease expired on final attempt, moved to dead letter"
            );
            job.status = JobStatus::DeadLetter;
            job.error_message = Some(LEASE_EXHAUSTED_ERROR.to_string());
            job.error_kind = Some(ErrorKind::Retryable);
            job.lease_expires_at = None;
            job.dead_lettered_at = Some(now);
            job.updated_at = now;
        }

        let mut ready: Vec<&mut Job> = jobs.iter_mut().filter(|j| j.is_claimable(queues, now)).collect();
        ready.sort_by_key(|j| (j.run_at, j.created_at));

        let claimed = ready
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|job| {
                if job.status == JobStatus::Running {
                    job.attempt += 1;
                }
                job.status = JobStatus::Running;
                job.worker_id = Some(worker_id.to_string());
                job.lease_expires_at = Some(lease_until);
                job.updated_at = now;
                ClaimedJob {
                    id: job.id,
                    job: job.clone(),
                }
            })
            .collect();

        Ok(claimed)
    }

    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()> {
        let mut jobs = self.lock();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| anyhow!("job {} not found", job_id))?;
        job.status = JobStatus::Succeeded;
        job.lease_expires_at = None;
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: ErrorKind) -> Result<FailureOutcome> {
        let now = Utc::now();
        let mut jobs = self.lock();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| anyhow!("job {} not found", job_id))?;

        job.error_message = Some(error.to_string());
        job.error_kind = Some(kind);
        job.lease_expires_at = None;
        job.updated_at = now;

        match job.retry_decision(kind, now) {
            RetryDecision::RetryAt(run_at) => {
                job.status = JobStatus::Pending;
                job.attempt += 1;
                job.run_at = run_at;
                job.worker_id = None;
                Ok(FailureOutcome::Retrying {
                    attempt: job.attempt,
                })
            }
            RetryDecision::DeadLetter => {
                job.status = JobStatus::DeadLetter;
                job.dead_lettered_at = Some(now);
                Ok(FailureOutcome::DeadLettered)
            }
        }
    }
}
