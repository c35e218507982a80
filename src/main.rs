mod api;
mod config;
mod db;
mod error;
mod ingest;
mod models;
mod normalize;
mod ratelimit;

use anyhow::{Context, Result};
use api::MuseClient;
use clap::{Parser, Subcommand};
use config::Config;
use db::{Store, COMPANIES_TABLE, JOBS_TABLE};
use ingest::{Ingestor, StopReason};
use ratelimit::RateLimitGovernor;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "muse-ingest")]
#[command(about = "Load job listings from The Muse public API into a local database")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch listings and replace the jobs and companies tables
    Load {
        /// Number of pages to query, starting at page 0. Omit to query
        /// until all available pages are exhausted
        #[arg(short, long)]
        pages: Option<u32>,

        /// Database file (defaults to the user data directory)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Abort when a listing has no seniority level
        #[arg(long)]
        require_level: bool,
    },

    /// Show row counts of the loaded tables
    Stats {
        /// Database file (defaults to the user data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

/// Sets the logging level using RUST_LOG, falling back to the supplied default.
fn setup_logging(default_log_settings: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_settings.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init()
}

fn main() -> Result<()> {
    setup_logging("muse_ingest=info");
    let cli = Cli::parse();

    match cli.command {
        Commands::Load {
            pages,
            db,
            require_level,
        } => {
            let config = Config::from_env(db, require_level);
            if config.api_key.is_none() {
                tracing::warn!(
                    "{} not set, querying without a credential (reduced rate limit)",
                    config::API_KEY_VAR
                );
            }

            // Take the store lock before spending any API quota.
            let mut store = Store::connect(&config.db_path)?;

            let client = MuseClient::new(
                config.base_url.clone(),
                config.api_key.clone(),
                config.request_timeout,
            )
            .context("Failed to set up the API client")?;
            let ingestor = Ingestor::new(client, RateLimitGovernor::new(), config.level_policy);

            let outcome = ingestor.run(pages).context("Ingestion aborted, nothing was written")?;
            let (jobs, companies) = ingest::persist(&mut store, &outcome)
                .with_context(|| format!("Failed to write to {}", store.path().display()))?;

            println!("Loaded into {}", store.path().display());
            println!("  Pages fetched: {}", outcome.pages_fetched);
            println!("  Jobs:          {}", jobs);
            println!("  Companies:     {}", companies);
            if !outcome.diagnostics.is_empty() {
                println!("  Warnings:      {}", outcome.diagnostics.len());
            }
            match outcome.stop_reason {
                StopReason::Exhausted => println!("  Stopped:       all pages fetched"),
                StopReason::PageLimit => println!("  Stopped:       page limit reached"),
                StopReason::UpstreamStatus(status) => {
                    println!("  Stopped:       API returned status {} (partial load)", status)
                }
            }
        }

        Commands::Stats { db } => {
            let path = db.unwrap_or_else(Store::default_path);
            let store = Store::connect(&path)?;

            println!("{:<12} {:>10}", "TABLE", "ROWS");
            println!("{}", "-".repeat(23));
            for table in [JOBS_TABLE, COMPANIES_TABLE] {
                let rows = match store.row_count(table)? {
                    Some(count) => count.to_string(),
                    None => "-".to_string(),
                };
                println!("{:<12} {:>10}", table, rows);
            }
        }
    }

    Ok(())
}
