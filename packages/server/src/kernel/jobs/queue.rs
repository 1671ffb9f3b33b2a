//! PostgreSQL-backed job queue implementation.
//!
//! This module provides the core job queue functionality for storing
//! and retrieving jobs from PostgreSQL.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::job::{ErrorKind, Job, RetryDecision};

/// Error recorded on a job whose worker vanished during its final attempt.
pub const LEASE_EXHAUSTED_ERROR: &str = "lease expired on final attempt";

const JOB_COLUMNS: &str = "id, job_type, queue, args, status, attempt, max_attempts, backoff_secs, \
     idempotency_key, run_at, worker_id, lease_expires_at, error_message, error_kind, \
     dead_lettered_at, created_at, updated_at";

/// Result type for enqueue operations that handles idempotency.
#[derive(Debug, Clone)]
pub enum EnqueueResult {
    /// Command was enqueued, returns new job ID
    Created(Uuid),
    /// Command already exists (idempotency hit), returns existing job ID
    Duplicate(Uuid),
}

impl EnqueueResult {
    /// Get the job ID regardless of whether it was created or duplicate
    pub fn job_id(&self) -> Uuid {
        match self {
            EnqueueResult::Created(id) | EnqueueResult::Duplicate(id) => *id,
        }
    }

    /// Returns true if this was a newly created job
    pub fn is_created(&self) -> bool {
        matches!(self, EnqueueResult::Created(_))
    }
}

/// What `mark_failed` did with the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
    Retrying { attempt: i32 },
    DeadLettered,
}

/// A claimed job ready for execution.
#[derive(Debug)]
pub struct ClaimedJob {
    /// The job ID
    pub id: Uuid,
    /// The raw job record
    pub job: Job,
}

impl ClaimedJob {
    /// Get the command type (job_type)
    pub fn command_type(&self) -> &str {
        &self.job.job_type
    }
}

/// Metadata for command serialization.
///
/// Commands implement this trait to provide type information, retry policy
/// and optional idempotency keys.
pub trait CommandMeta {
    /// The command type name (used as job_type).
    fn command_type(&self) -> &'static str;

    /// Optional idempotency key.
    ///
    /// If provided, ensures only one pending/running job exists with this key.
    fn idempotency_key(&self) -> Option<String> {
        None
    }

    /// Total attempts before the job is dead-lettered.
    fn max_attempts(&self) -> i32 {
        3
    }

    /// Fixed delay between attempts.
    fn backoff(&self) -> Duration {
        Duration::from_secs(60)
    }
}

/// Trait for job queue operations.
///
/// Implementations provide the storage and retrieval of serialized commands
/// for background execution.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job for immediate execution.
    ///
    /// If the job carries an idempotency key and a matching pending/running
    /// job exists, returns `EnqueueResult::Duplicate` with the existing job ID.
    async fn enqueue(&self, job: Job) -> Result<EnqueueResult>;

    /// Claim up to `limit` ready jobs from the given queues.
    ///
    /// Running jobs whose lease expired are claimed again while attempts
    /// remain; on the final attempt they are dead-lettered instead.
    async fn claim(&self, queues: &[String], worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>>;

    /// Mark a job as successfully completed.
    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()>;

    /// Mark a job as failed with an error.
    ///
    /// If attempts remain, the job is re-queued after its backoff.
    /// Otherwise, it is moved to dead letter.
    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: ErrorKind) -> Result<FailureOutcome>;
}

/// PostgreSQL-backed job queue implementation.
pub struct PostgresJobQueue {
    pool: PgPool,
    lease: Duration,
}

impl PostgresJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lease: Duration::from_secs(15 * 60),
        }
    }

    /// Check if a live job with the given idempotency key already exists.
    pub async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs
            WHERE idempotency_key = $1
              AND status IN ('pending', 'running')
            LIMIT 1
            "#
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Dead-letter running jobs whose lease expired on their final attempt.
    async fn dead_letter_exhausted(&self, queues: &[String]) -> Result<()> {
        let exhausted = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'dead_letter',
                lease_expires_at = NULL,
                error_message = $1,
                error_kind = $2,
                dead_lettered_at = NOW(),
                updated_at = NOW()
            WHERE queue = ANY($3)
              AND status = 'running'
              AND lease_expires_at < NOW()
              AND attempt >= max_attempts
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(LEASE_EXHAUSTED_ERROR)
        .bind(ErrorKind::Retryable)
        .bind(queues)
        .fetch_all(&self.pool)
        .await
        .context("Failed to dead-letter expired jobs")?;

        for job in exhausted {
            warn!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempt = job.attempt,
                args = %job.args,
                "job lease expired on final attempt, moved to dead letter"
            );
        }

        Ok(())
    }

    pub async fn find_by_id(&self, job_id: Uuid) -> Result<Job> {
        sqlx::query_as::<_, Job>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| anyhow!("job {} not found", job_id))
    }
}

#[async_trait]
impl JobQueue for PostgresJobQueue {
    async fn enqueue(&self, job: Job) -> Result<EnqueueResult> {
        // Check idempotency first
        if let Some(key) = &job.idempotency_key {
            if let Some(existing) = self.find_by_idempotency_key(key).await? {
                return Ok(EnqueueResult::Duplicate(existing.id));
            }
        }

        // The partial unique index still guards against a concurrent insert
        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO jobs (
                id, job_type, queue, args, status, attempt, max_attempts, backoff_secs,
                idempotency_key, run_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $9, NOW(), NOW())
            ON CONFLICT (idempotency_key)
                WHERE idempotency_key IS NOT NULL AND status IN ('pending', 'running')
                DO NOTHING
            RETURNING id
            "#,
        )
        .bind(job.id)
        .bind(&job.job_type)
        .bind(&job.queue)
        .bind(&job.args)
        .bind(job.attempt)
        .bind(job.max_attempts)
        .bind(job.backoff_secs)
        .bind(&job.idempotency_key)
        .bind(job.run_at)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to insert job")?;

        match (inserted, &job.idempotency_key) {
            (Some(id), _) => Ok(EnqueueResult::Created(id)),
            (None, Some(key)) => {
                let existing = self
                    .find_by_idempotency_key(key)
                    .await?
                    .ok_or_else(|| anyhow!("job with idempotency key {} vanished", key))?;
                Ok(EnqueueResult::Duplicate(existing.id))
            }
            (None, None) => Err(anyhow!("job {} was not inserted", job.id)),
        }
    }

    async fn claim(&self, queues: &[String], worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>> {
        self.dead_letter_exhausted(queues).await?;

        let jobs = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'running',
                attempt = CASE WHEN status = 'running' THEN attempt + 1 ELSE attempt END,
                worker_id = $1,
                lease_expires_at = NOW() + ($2 * INTERVAL '1 second'),
                updated_at = NOW()
            WHERE id IN (
                SELECT id
                FROM jobs
                WHERE queue = ANY($3)
                  AND (
                      (status = 'pending' AND run_at <= NOW())
                      OR (status = 'running' AND lease_expires_at < NOW() AND attempt < max_attempts)
                  )
                ORDER BY run_at, created_at
                LIMIT $4
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(worker_id)
        .bind(self.lease.as_secs() as f64)
        .bind(queues)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to claim jobs")?;

        Ok(jobs
            .into_iter()
            .map(|job| ClaimedJob { id: job.id, job })
            .collect())
    }

    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'succeeded',
                lease_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: ErrorKind) -> Result<FailureOutcome> {
        // Fetch current job state
        let job = self.find_by_id(job_id).await?;

        match job.retry_decision(kind, Utc::now()) {
            RetryDecision::RetryAt(run_at) => {
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET status = 'pending',
                        attempt = attempt + 1,
                        run_at = $1,
                        worker_id = NULL,
                        lease_expires_at = NULL,
                        error_message = $2,
                        error_kind = $3,
                        updated_at = NOW()
                    WHERE id = $4
                    "#,
                )
                .bind(run_at)
                .bind(error)
                .bind(kind)
                .bind(job_id)
                .execute(&self.pool)
                .await?;

                info!(job_id = %job_id, next_attempt = job.attempt + 1, run_at = %run_at, "scheduled job retry");
                Ok(FailureOutcome::Retrying {
                    attempt: job.attempt + 1,
                })
            }
            RetryDecision::DeadLetter => {
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET status = 'dead_letter',
                        lease_expires_at = NULL,
                        error_message = $1,
                        error_kind = $2,
                        dead_lettered_at = NOW(),
                        updated_at = NOW()
                    WHERE id = $3
                    "#,
                )
                .bind(error)
                .bind(kind)
                .bind(job_id)
                .execute(&self.pool)
                .await?;

                Ok(FailureOutcome::DeadLettered)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_result_helpers() {
        let created = EnqueueResult::Created(Uuid::new_v4());
        assert!(created.is_created());

        let duplicate = EnqueueResult::Duplicate(Uuid::new_v4());
        assert!(!duplicate.is_created());
    }
}
