//! Job model for background command execution.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use super::queue::CommandMeta;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    DeadLetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "error_kind", rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transient error - will retry if attempts remain
    #[default]
    Retryable,
    /// Permanent error - will not retry
    NonRetryable,
}

impl ErrorKind {
    /// Whether this error kind should trigger a retry
    pub fn should_retry(&self) -> bool {
        matches!(self, ErrorKind::Retryable)
    }
}

// ============================================================================
// Job Model
// ============================================================================

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Job {
    #[builder(default = Uuid::now_v7())]
    pub id: Uuid,

    pub job_type: String,
    #[builder(default = "default".to_string())]
    pub queue: String,
    pub args: serde_json::Value,

    #[builder(default)]
    pub status: JobStatus,
    #[builder(default = 1)]
    pub attempt: i32,
    #[builder(default = 3)]
    pub max_attempts: i32,
    #[builder(default = 60)]
    pub backoff_secs: i64,

    #[builder(default, setter(strip_option))]
    pub idempotency_key: Option<String>,
    #[builder(default = Utc::now())]
    pub run_at: DateTime<Utc>,

    // Lease management
    #[builder(default, setter(strip_option))]
    pub worker_id: Option<String>,
    #[builder(default, setter(strip_option))]
    pub lease_expires_at: Option<DateTime<Utc>>,

    // Error tracking
    #[builder(default, setter(strip_option))]
    pub error_message: Option<String>,
    #[builder(default, setter(strip_option))]
    pub error_kind: Option<ErrorKind>,
    #[builder(default, setter(strip_option))]
    pub dead_lettered_at: Option<DateTime<Utc>>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

/// What happens to a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAt(DateTime<Utc>),
    DeadLetter,
}

impl Job {
    /// Build a pending job for a command on the given queue.
    pub fn for_command<C>(command: &C, queue: &str) -> Result<Self>
    where
        C: Serialize + CommandMeta,
    {
        let args = serde_json::to_value(command)?;
        let job = match command.idempotency_key() {
            Some(key) => Self::builder()
                .job_type(command.command_type())
                .queue(queue)
                .args(args)
                .max_attempts(command.max_attempts())
                .backoff_secs(command.backoff().as_secs() as i64)
                .idempotency_key(key)
                .build(),
            None => Self::builder()
                .job_type(command.command_type())
                .queue(queue)
                .args(args)
                .max_attempts(command.max_attempts())
                .backoff_secs(command.backoff().as_secs() as i64)
                .build(),
        };
        Ok(job)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs.max(0) as u64)
    }

    /// Fixed backoff while attempts remain, dead letter otherwise.
    pub fn retry_decision(&self, kind: ErrorKind, now: DateTime<Utc>) -> RetryDecision {
        if kind.should_retry() && self.attempt < self.max_attempts {
            RetryDecision::RetryAt(now + chrono::Duration::seconds(self.backoff_secs.max(0)))
        } else {
            RetryDecision::DeadLetter
        }
    }

    /// A running job whose lease ran out on its final attempt.
    pub fn lease_exhausted(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Running
            && self.attempt >= self.max_attempts
            && self.lease_expires_at.map_or(false, |lease| lease < now)
    }

    pub fn is_claimable(&self, queues: &[String], now: DateTime<Utc>) -> bool {
        if !queues.iter().any(|q| q == &self.queue) {
            return false;
        }
        match self.status {
            JobStatus::Pending => self.run_at <= now,
            JobStatus::Running => {
                self.attempt < self.max_attempts && self.lease_expires_at.map_or(false, |lease| lease < now)
            }
            JobStatus::Succeeded | JobStatus::DeadLetter => false,
        }
    }
}
