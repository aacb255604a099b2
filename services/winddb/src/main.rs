//! WindDB aggregation service.
//!
//! Reads recent samples for every registered weather station from its
//! source database and publishes them as static JSON documents:
//! - `batch` processes all (or selected) stations once and rewrites the index
//! - `serve` processes stations as acquisition daemons announce new samples

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use aggregator::unix_now;
use winddb::{App, BatchOptions, WindDbConfig};
use winddb_common::StationId;

#[derive(Parser, Debug)]
#[command(name = "winddb")]
#[command(about = "Weather station sample aggregator")]
struct Args {
    /// Configuration file
    #[arg(long, env = "WINDDB_CONFIG", default_value = "config/winddb.yaml", global = true)]
    config: PathBuf,

    /// Registry database URL, overriding the configuration file
    #[arg(long, env = "WINDDB_REGISTRY_URL", global = true)]
    registry_url: Option<String>,

    /// Output directory, overriding the configuration file
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Maximum sample age in minutes, overriding the configuration file
    #[arg(long, global = true)]
    max_age: Option<u64>,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process stations once and exit
    Batch {
        /// Only process this station (repeatable); skips the index
        #[arg(long = "station")]
        stations: Vec<StationId>,

        /// Build documents without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the notification listener until Ctrl+C
    Serve {
        /// Also run a full batch at this interval
        #[arg(long)]
        batch_interval_secs: Option<u64>,
    },
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;

    let mut config = WindDbConfig::from_yaml_file(&args.config)?;
    config.override_registry_url(args.registry_url.clone());
    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(max_age) = args.max_age {
        config.pipeline.max_age_minutes = max_age;
    }

    info!(
        config = %args.config.display(),
        sources = config.sources.len(),
        "Starting winddb"
    );

    let app = App::connect(config).await?;

    match args.command {
        Command::Batch { stations, dry_run } => {
            let options = BatchOptions { stations, dry_run };
            let report = app.run_batch(&options, unix_now()).await?;

            info!(
                written = report.written,
                empty = report.empty,
                failed = report.failed,
                timed_out = report.timed_out,
                "Batch finished"
            );
            if report.failed + report.timed_out > 0 {
                warn!("Some stations were not processed");
            }
        }
        Command::Serve {
            batch_interval_secs,
        } => {
            let (shutdown_tx, _) = broadcast::channel::<()>(1);

            // Handle Ctrl+C
            let shutdown_tx_clone = shutdown_tx.clone();
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Received shutdown signal");
                shutdown_tx_clone.send(()).ok();
            });

            let interval = batch_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs);
            let stats = app
                .serve(interval, shutdown_tx)
                .await
                .context("Notification listener failed")?;

            info!(
                received = stats.received,
                processed = stats.processed,
                ignored = stats.ignored,
                "Shutdown complete"
            );
        }
    }

    Ok(())
}
