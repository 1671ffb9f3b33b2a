//! Dispatch one best-gyms page generation job per location.
//!
//! Always exits 0; failures are logged.

use clap::Parser;
use gymdir_core::cli::{init_tracing, run_generation, GenerationArgs, GenerationMode};

#[derive(Parser)]
#[command(name = "generate_best_gyms_pages")]
#[command(about = "Generate best-gyms pages, one job per location")]
struct Cli {
    #[command(flatten)]
    args: GenerationArgs,
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

    match run_generation(&cli.args, GenerationMode::PerLocation).await {
        Ok(summary) => tracing::info!(
            locations = summary.locations,
            jobs = summary.units,
            failed = summary.failed,
            sync = cli.args.sync,
            "best gyms page generation dispatched"
        ),
        Err(e) => tracing::error!(error = %format!("{:#}", e), "best gyms page generation failed"),
    }
}
