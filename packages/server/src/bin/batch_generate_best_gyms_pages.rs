//! Dispatch best-gyms page generation in batches, one ranking call per batch.
//!
//! Always exits 0; failures are logged.

use clap::Parser;
use gymdir_core::cli::{init_tracing, run_generation, GenerationArgs, GenerationMode};
use gymdir_core::domains::best_gyms::activities::DEFAULT_BATCH_SIZE;

#[derive(Parser)]
#[command(name = "batch_generate_best_gyms_pages")]
#[command(about = "Generate best-gyms pages, one job per batch of locations")]
struct Cli {
    #[command(flatten)]
    args: GenerationArgs,

    /// Locations per batch job
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Stop after this many locations (at least 1)
    #[arg(long)]
    locations: Option<usize>,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return;
        }
    };

    init_tracing();

    let mode = GenerationMode::Batched {
        batch_size: cli.batch_size,
        location_limit: cli.locations,
    };

    match run_generation(&cli.args, mode).await {
        Ok(summary) => tracing::info!(
            locations = summary.locations,
            batches = summary.units,
            failed = summary.failed,
            sync = cli.args.sync,
            "best gyms batch generation dispatched"
        ),
        Err(e) => tracing::error!(error = %format!("{:#}", e), "best gyms batch generation failed"),
    }
}
