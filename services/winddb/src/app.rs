//! Batch and serve modes.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use aggregator::{
    unix_now, BatchReport, FileWriter, Listener, ListenerStats, MemoryWriter, OutputWriter,
    Pipeline, Registry, Station,
};
use sources::SourceSet;
use winddb_common::StationId;

use crate::config::WindDbConfig;

/// Options for a single batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Process only these stations. The index is not rewritten for a subset.
    pub stations: Vec<StationId>,
    /// Render documents in memory without touching the output directory
    pub dry_run: bool,
}

/// Connected sources and registry for one service process.
pub struct App {
    config: WindDbConfig,
    sources: SourceSet,
    registry: Registry,
}

impl App {
    /// Connect every configured source and the station registry.
    ///
    /// Sources that fail to connect are logged and left out; the registry
    /// is required.
    pub async fn connect(config: WindDbConfig) -> Result<Self> {
        let sources = SourceSet::connect(&config.sources).await;
        if sources.is_empty() {
            warn!("No source adapters available, every station will be skipped");
        }

        let registry = Registry::connect(&config.registry.url)
            .await
            .context("Failed to connect station registry")?;

        Ok(Self {
            config,
            sources,
            registry,
        })
    }

    pub fn config(&self) -> &WindDbConfig {
        &self.config
    }

    pub async fn load_stations(&self, filter: &[StationId]) -> Result<Vec<Station>> {
        self.registry
            .load(&self.sources, filter)
            .await
            .context("Failed to load stations")
    }

    async fn pipeline(&self, dry_run: bool) -> Result<Pipeline> {
        let writer: Arc<dyn OutputWriter> = if dry_run {
            Arc::new(MemoryWriter::new())
        } else {
            let dir = &self.config.output.dir;
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
            Arc::new(FileWriter::new(dir, self.config.output_format()?))
        };

        Ok(Pipeline::new(self.config.pipeline_settings(), writer))
    }

    /// Run one batch as of `now` and rewrite the index for full runs.
    pub async fn run_batch(&self, options: &BatchOptions, now: i64) -> Result<BatchReport> {
        let stations = self.load_stations(&options.stations).await?;
        let pipeline = self.pipeline(options.dry_run).await?;

        info!(
            stations = stations.len(),
            dry_run = options.dry_run,
            "Running batch"
        );
        let report = pipeline.run_batch(&stations, now).await;

        if options.stations.is_empty() {
            pipeline
                .write_index(&stations, &report)
                .await
                .context("Failed to write station index")?;
        }

        Ok(report)
    }

    /// Listen for notifications until `shutdown` fires, optionally running
    /// a full batch every `batch_interval`.
    ///
    /// The listener serves the stations registered at start-up. Each periodic
    /// batch reloads the registry, so the index follows station changes.
    pub async fn serve(
        &self,
        batch_interval: Option<Duration>,
        shutdown: broadcast::Sender<()>,
    ) -> Result<ListenerStats> {
        let stations = self.load_stations(&[]).await?;
        let pipeline = Arc::new(self.pipeline(false).await?);

        let listener = Listener::bind(self.config.listener.bind, stations, pipeline.clone())
            .await
            .context("Failed to start notification listener")?;

        let batch_shutdown = shutdown.subscribe();
        let batches = async {
            if let Some(interval) = batch_interval {
                self.run_periodic_batches(&pipeline, interval, batch_shutdown)
                    .await;
            }
        };
        let (stats, ()) = tokio::join!(listener.run(shutdown.subscribe()), batches);

        Ok(stats?)
    }

    /// One scheduled batch over the current registry contents.
    async fn run_scheduled_batch(&self, pipeline: &Pipeline, now: i64) -> Result<BatchReport> {
        let stations = self.load_stations(&[]).await?;
        let report = pipeline.run_batch(&stations, now).await;
        pipeline
            .write_index(&stations, &report)
            .await
            .context("Failed to write station index")?;
        Ok(report)
    }

    async fn run_periodic_batches(
        &self,
        pipeline: &Pipeline,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!(interval_secs = interval.as_secs(), "Starting periodic batches");

        loop {
            if let Err(e) = self.run_scheduled_batch(pipeline, unix_now()).await {
                error!(error = %e, "Scheduled batch failed");
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Stopping periodic batches");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}
