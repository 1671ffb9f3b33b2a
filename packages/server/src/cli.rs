//! Shared plumbing for the page-generation command line tools.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::domains::best_gyms::{
    dispatch_batches, dispatch_per_location, register_best_gyms_jobs, DispatchSummary, GenerationRequest,
};
use crate::domains::directory::LocationFilter;
use crate::kernel::jobs::{InlineDispatcher, JobDispatcher, JobRegistry, PostgresJobQueue, QueueDispatcher};
use crate::kernel::ServerDeps;

/// Options every generation command accepts.
#[derive(Debug, Clone, Default, Args)]
pub struct GenerationArgs {
    /// Only generate pages for this city
    #[arg(long)]
    pub city: Option<String>,

    /// Only generate pages inside this state
    #[arg(long)]
    pub state: Option<String>,

    /// Regenerate pages that already exist
    #[arg(long)]
    pub force: bool,

    /// Run each unit now, in this process, instead of queueing it
    #[arg(long)]
    pub sync: bool,

    /// Job queue to dispatch to (defaults to JOB_QUEUE_NAME)
    #[arg(long)]
    pub queue_name: Option<String>,
}

impl GenerationArgs {
    pub fn request(&self, default_queue: &str) -> GenerationRequest {
        let queue_name = self
            .queue_name
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(default_queue);

        GenerationRequest::new(LocationFilter::new(self.state.as_deref(), self.city.as_deref()), queue_name)
            .with_force(self.force)
    }
}

/// How resolved locations become units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    PerLocation,
    Batched {
        batch_size: usize,
        location_limit: Option<usize>,
    },
}

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gymdir_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build a dispatcher: inline execution for `--sync`, the Postgres queue otherwise.
pub fn dispatcher_for(sync: bool, deps: Arc<ServerDeps>, pool: sqlx::PgPool) -> Box<dyn JobDispatcher> {
    if sync {
        let mut registry = JobRegistry::new();
        register_best_gyms_jobs(&mut registry);
        Box::new(InlineDispatcher::new(Arc::new(registry), deps))
    } else {
        Box::new(QueueDispatcher::new(Arc::new(PostgresJobQueue::new(pool))))
    }
}

/// Load configuration, connect, resolve locations and dispatch.
pub async fn run_generation(args: &GenerationArgs, mode: GenerationMode) -> Result<DispatchSummary> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let deps = Arc::new(ServerDeps::from_config(&config, pool.clone()));
    let dispatcher = dispatcher_for(args.sync, deps.clone(), pool);
    let request = args.request(&config.job_queue_name);

    match mode {
        GenerationMode::PerLocation => dispatch_per_location(&request, &deps, dispatcher.as_ref()).await,
        GenerationMode::Batched {
            batch_size,
            location_limit,
        } => {
            let request = request
                .with_batch_size(batch_size)
                .with_location_limit(location_limit);
            dispatch_batches(&request, &deps, dispatcher.as_ref()).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_default_queue_and_trims_filters() {
        let args = GenerationArgs {
            city: Some(" Austin ".to_string()),
            state: Some("".to_string()),
            force: true,
            sync: false,
            queue_name: Some("  ".to_string()),
        };

        let request = args.request("default");
        assert_eq!(request.queue_name, "default");
        assert!(request.force);
        assert_eq!(request.filter.city.as_deref(), Some("Austin"));
        assert_eq!(request.filter.state, None);
    }

    #[test]
    fn test_request_honors_queue_name() {
        let args = GenerationArgs {
            queue_name: Some("pages".to_string()),
            ..Default::default()
        };
        assert_eq!(args.request("default").queue_name, "pages");
    }
}
