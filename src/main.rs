use anyhow::Result;
use bucket_sync::cli::{run, Cli};
use bucket_sync::logging::{init_cli_logging, init_logging};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if cli.is_replay() {
        init_cli_logging();
    } else {
        init_logging();
    }
    tracing::info!("Startup: tracing initialised, environment loaded");

    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("bucket-sync completed successfully"),
        Err(e) => tracing::error!(error = %e, "bucket-sync exited with error"),
    }
    result
}
