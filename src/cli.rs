//! Command-line surface for bucket-sync.
//!
//! - `serve` (also the default with no subcommand): run as a Lambda function
//!   handling bucket notifications.
//! - `replay --event <file>`: run the same pipeline once, locally, for a
//!   notification saved to disk. Prints the invocation result to stdout and
//!   fails if the invocation failed.
//!
//! Business logic lives in [`crate::synchronise`]; this module only wires
//! configuration and clients together.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lambda_runtime::{service_fn, LambdaEvent};

use aws_lambda_events::event::s3::S3Event;

use crate::download::S3ObjectStore;
use crate::event::change_events;
use crate::load_config::load_config;
use crate::synchronise::{handle_batch, InvocationResult};
use crate::upload::KnowledgeClient;

/// CLI for bucket-sync: mirror a storage bucket into a knowledge-base dataset.
#[derive(Parser)]
#[clap(
    name = "bucket-sync",
    version,
    about = "Mirror storage bucket changes into a knowledge-base dataset"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as a Lambda function (default)
    Serve,
    /// Process a saved bucket notification once and print the result
    Replay {
        /// Path to the notification JSON file
        #[clap(long)]
        event: PathBuf,
    },
}

impl Cli {
    pub fn is_replay(&self) -> bool {
        matches!(self.command, Some(Commands::Replay { .. }))
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Replay { event } => replay(&event).await,
    }
}

async fn serve() -> Result<()> {
    let config = load_config()?;
    let store = KnowledgeClient::new(&config)?;
    let objects = S3ObjectStore::from_env().await;
    tracing::info!(command = "serve", "Starting Lambda runtime");

    let (config, store, objects) = (&config, &store, &objects);
    lambda_runtime::run(service_fn(move |event: LambdaEvent<S3Event>| async move {
        let events = change_events(&event.payload);
        tracing::info!(
            request_id = %event.context.request_id,
            record_count = events.len(),
            "Received bucket notification"
        );
        let (result, _) = handle_batch(config, store, objects, &events).await;
        Ok::<InvocationResult, lambda_runtime::Error>(result)
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}

fn read_notification(path: &Path) -> Result<S3Event> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read notification file {}", path.display()))?;
    let event: S3Event = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse notification file {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        record_count = event.records.len(),
        "Loaded notification"
    );
    Ok(event)
}

async fn replay(path: &Path) -> Result<()> {
    let notification = read_notification(path)?;
    let config = load_config()?;
    let store = KnowledgeClient::new(&config)?;
    let objects = S3ObjectStore::from_env().await;

    let (result, report) =
        handle_batch(&config, &store, &objects, &change_events(&notification)).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if let Some(report) = report {
        tracing::info!(command = "replay", ?report, "Replay complete");
        println!("{:#?}", report.outcomes);
    }

    if !result.is_success() {
        anyhow::bail!(result.message());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::parse_from(["bucket-sync"]);
        assert!(cli.command.is_none());
        assert!(!cli.is_replay());
    }

    #[test]
    fn replay_takes_an_event_path() {
        let cli = Cli::parse_from(["bucket-sync", "replay", "--event", "batch.json"]);
        assert!(cli.is_replay());
        match cli.command {
            Some(Commands::Replay { event }) => assert_eq!(event, PathBuf::from("batch.json")),
            _ => panic!("expected replay"),
        }
    }

    #[test]
    fn reads_notification_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"Records":[{}]}}"#,
            crate::event::record_json("ObjectCreated:Put", "a+b.txt")
        )
        .unwrap();

        let event = read_notification(file.path()).unwrap();
        assert_eq!(change_events(&event)[0].encoded_key, "a+b.txt");
    }

    #[test]
    fn malformed_notification_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = read_notification(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse notification file"));
    }
}
