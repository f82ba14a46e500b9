use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use rastro::{
    config::Config,
    fetcher::BatchFetcher,
    split_codes,
    RequestOptions,
    ResultFilter,
    TrackingClient,
};

#[derive(Parser)]
#[command(name = "rastro", about = "Query the parcel tracking API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Track one or more comma separated object codes
    Track {
        codes: String,
        /// T (all events), U (last event) or P (first event)
        #[arg(long)]
        filter: Option<ResultFilter>,
    },
    /// Track a single object using the path form of the endpoint
    TrackOne { code: String },
    /// Register every code in a file for asynchronous tracking
    Register {
        file: PathBuf,
        /// Fetch the results for each receipt right after registering
        #[arg(long)]
        fetch: bool,
    },
    /// Fetch the result of an earlier registration
    Receipt { receipt: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    if config.accept_invalid_certs {
        tracing::warn!("TLS certificate verification is disabled");
    }

    let client = TrackingClient::with_options(config.base_url.clone(), config.client_options())?;
    let options = RequestOptions::default();

    match cli.command {
        Command::Track { codes, filter } => {
            let codes = split_codes(&codes);
            let filter = filter.unwrap_or(config.result_filter);
            let result = client
                .track(&codes, filter, &options)
                .await
                .context("Tracking request failed")?;
            print_json(&result)?;
        }
        Command::TrackOne { code } => {
            let result = client
                .track_one(&code, &options)
                .await
                .context("Tracking request failed")?;
            print_json(&result)?;
        }
        Command::Register { file, fetch } => {
            let fetcher = BatchFetcher::new(Arc::new(client));
            let outcome = fetcher.register_file(&file).await?;
            let registrations = outcome.registrations();
            if fetch {
                print_json(&fetcher.collect(&registrations).await?)?;
            } else {
                print_json(&registrations)?;
            }

            for (chunk, error) in &outcome.failed {
                tracing::error!("Chunk {} was not registered: {}", chunk, error);
            }
            if !outcome.is_complete() {
                anyhow::bail!("{} of {} chunks failed to register", outcome.failed.len(), outcome.failed.len() + outcome.accepted.len());
            }
        }
        Command::Receipt { receipt } => {
            let result = client
                .fetch_receipt(&receipt, &options)
                .await
                .context("Receipt lookup failed")?;
            print_json(&result)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
