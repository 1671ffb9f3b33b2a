//! Job registry for deserializing and executing jobs.
//!
//! The registry maps job type strings (e.g., "generate_best_gyms_page") to
//! handlers that reconstruct the typed job from JSON and run it.
//!
//! This allows the JobRunner and the inline dispatcher to execute jobs
//! without knowing the concrete types.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;

use super::queue::CommandMeta;
use crate::kernel::ServerDeps;

/// Type alias for the async handler function.
///
/// Handlers take the raw JSON args and ServerDeps and return a Result.
type BoxedHandler = Box<
    dyn Fn(serde_json::Value, Arc<ServerDeps>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

/// Registry that maps job type strings to handlers.
///
/// Each domain registers its job types at startup.
///
/// # Example
///
/// ```ignore
/// let mut registry = JobRegistry::new();
///
/// registry.register::<GenerateBestGymsPageJob, _, _>(
///     GenerateBestGymsPageJob::JOB_TYPE,
///     |job, deps| async move { job.run(&deps).await },
/// );
///
/// // Later, in JobRunner
/// registry.execute(claimed.command_type(), claimed.job.args.clone(), deps.clone()).await?;
/// ```
#[derive(Default)]
pub struct JobRegistry {
    handlers: HashMap<&'static str, BoxedHandler>,
}

impl JobRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a job type with its handler.
    pub fn register<J, F, Fut>(&mut self, job_type: &'static str, handler: F)
    where
        J: CommandMeta + DeserializeOwned + Send + Sync + 'static,
        F: Fn(J, Arc<ServerDeps>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let boxed_handler: BoxedHandler = Box::new(move |value, deps| {
            let handler = handler.clone();
            Box::pin(async move {
                let job: J = serde_json::from_value(value)
                    .map_err(|e| anyhow!("Failed to deserialize {}: {}", job_type, e))?;
                handler(job, deps).await
            })
        });

        self.handlers.insert(job_type, boxed_handler);
    }

    /// Execute a job's args with its registered handler.
    ///
    /// Returns an error if:
    /// - The job type is not registered
    /// - The JSON payload cannot be deserialized
    /// - The handler returns an error
    pub async fn execute(&self, job_type: &str, args: serde_json::Value, deps: Arc<ServerDeps>) -> Result<()> {
        let handler = self
            .handlers
            .get(job_type)
            .ok_or_else(|| anyhow!("Unknown job type: {}", job_type))?;

        handler(args, deps).await
    }

    /// Check if a job type is registered.
    pub fn is_registered(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Get all registered job types.
    pub fn registered_types(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }
}

/// Thread-safe registry wrapped in Arc.
pub type SharedJobRegistry = Arc<JobRegistry>;
