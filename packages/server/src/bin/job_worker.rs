//! Long-running worker that executes queued best-gyms jobs.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gymdir_core::cli::init_tracing;
use gymdir_core::domains::best_gyms::register_best_gyms_jobs;
use gymdir_core::kernel::jobs::{JobRegistry, JobRunner, JobRunnerConfig, PostgresJobQueue};
use gymdir_core::kernel::ServerDeps;
use gymdir_core::Config;
use sqlx::postgres::PgPoolOptions;

#[derive(Parser)]
#[command(name = "job_worker")]
#[command(about = "Process queued page generation jobs")]
struct Cli {
    /// Queues to consume (repeat or comma-separate; defaults to JOB_QUEUE_NAME)
    #[arg(long = "queue", value_delimiter = ',')]
    queues: Vec<String>,

    /// Jobs claimed per poll
    #[arg(long, default_value_t = 10)]
    batch_size: i64,

    /// Seconds to wait when the queue is empty
    #[arg(long, default_value_t = 5)]
    poll_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let deps = Arc::new(ServerDeps::from_config(&config, pool.clone()));

    let mut registry = JobRegistry::new();
    register_best_gyms_jobs(&mut registry);

    let queues: Vec<String> = if cli.queues.is_empty() {
        vec![config.job_queue_name.clone()]
    } else {
        cli.queues
    };

    let runner_config = JobRunnerConfig {
        batch_size: cli.batch_size.max(1),
        poll_interval: Duration::from_secs(cli.poll_interval_secs.max(1)),
        ..JobRunnerConfig::default()
    }
    .with_queues(queues);

    JobRunner::with_config(
        Arc::new(PostgresJobQueue::new(pool)),
        Arc::new(registry),
        deps,
        runner_config,
    )
    .run_until_shutdown()
    .await
}
