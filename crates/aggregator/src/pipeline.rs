//! Snapshot generation for stations.
//!
//! For each station the pipeline fetches every sample newer than
//! `now - max_age`, then writes one `latest` and one `samples` document per
//! capability present plus the station's `info` document. A batch run does
//! this for many stations and finishes with the station index.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use winddb_common::{SampleSeries, StationId, WindDbError, WindDbResult};

use crate::output::{
    Document, DocumentAddress, DocumentKind, IndexDocument, IndexEntry, InfoDocument,
    LatestDocument, OutputWriter, SamplesDocument,
};
use crate::station::Station;

/// Current time as Unix seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Tunables for a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Samples older than this are not fetched
    pub max_age_minutes: u64,
    /// Keep at most this many samples per `samples` document
    pub sample_limit: Option<usize>,
    /// Stations processed at once during a batch
    pub concurrency: usize,
    /// Upper bound on one station run
    pub station_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_age_minutes: 1440,
            sample_limit: None,
            concurrency: 1,
            station_timeout: Duration::from_secs(60),
        }
    }
}

/// Result of one station run.
#[derive(Debug, Clone, PartialEq)]
pub enum StationOutcome {
    Written {
        capabilities: usize,
        samples: usize,
        last_update: i64,
    },
    /// No samples in the window; earlier documents were left in place.
    Empty,
    Failed(String),
    TimedOut,
}

/// Tally of a batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub written: usize,
    pub empty: usize,
    pub failed: usize,
    pub timed_out: usize,
    /// Newest sample timestamp per station that produced documents
    pub last_updates: BTreeMap<StationId, i64>,
}

impl BatchReport {
    pub fn record(&mut self, station: &StationId, outcome: &StationOutcome) {
        match outcome {
            StationOutcome::Written { last_update, .. } => {
                self.written += 1;
                self.last_updates.insert(station.clone(), *last_update);
            }
            StationOutcome::Empty => self.empty += 1,
            StationOutcome::Failed(_) => self.failed += 1,
            StationOutcome::TimedOut => self.timed_out += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.written + self.empty + self.failed + self.timed_out
    }
}

/// Documents for one station's series, in address order.
pub fn build_documents(station: &Station, series: &SampleSeries) -> Vec<(DocumentAddress, Document)> {
    let id = station.id();
    let mut documents = Vec::with_capacity(series.len() * 2 + 1);

    for (capability, samples) in series.iter() {
        let Some(latest) = series.latest(&capability) else {
            continue;
        };

        documents.push((
            DocumentAddress::Capability {
                station: id.clone(),
                capability,
                kind: DocumentKind::Latest,
            },
            Document::Latest(LatestDocument {
                station: id.clone(),
                quantity: capability.quantity,
                statistic: capability.statistic,
                sample: *latest,
            }),
        ));
        documents.push((
            DocumentAddress::Capability {
                station: id.clone(),
                capability,
                kind: DocumentKind::Samples,
            },
            Document::Samples(SamplesDocument {
                station: id.clone(),
                quantity: capability.quantity,
                statistic: capability.statistic,
                samples: samples.to_vec(),
            }),
        ));
    }

    documents.push((
        DocumentAddress::Info {
            station: id.clone(),
        },
        Document::Info(InfoDocument::new(station.info(), station.capabilities())),
    ));

    documents
}

/// The station index: every station given, in id order.
pub fn build_index(stations: &[Station], last_updates: &BTreeMap<StationId, i64>) -> IndexDocument {
    let mut entries: Vec<IndexEntry> = stations
        .iter()
        .map(|station| IndexEntry {
            station: InfoDocument::new(station.info(), station.capabilities()),
            last_update: last_updates.get(station.id()).copied(),
        })
        .collect();
    entries.sort_by(|a, b| a.station.id.cmp(&b.station.id));

    IndexDocument { stations: entries }
}

/// Runs stations through fetch, render and write.
pub struct Pipeline {
    settings: PipelineSettings,
    writer: Arc<dyn OutputWriter>,
    /// One lock per station so runs for the same station never overlap.
    locks: Mutex<HashMap<StationId, Arc<Mutex<()>>>>,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings, writer: Arc<dyn OutputWriter>) -> Self {
        Self {
            settings,
            writer,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Oldest sample timestamp included for a run at `now`.
    pub fn since(&self, now: i64) -> i64 {
        let max_age_secs = i64::try_from(self.settings.max_age_minutes.saturating_mul(60))
            .unwrap_or(i64::MAX);
        now.saturating_sub(max_age_secs)
    }

    async fn station_lock(&self, id: &StationId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id.clone()).or_default().clone()
    }

    /// Process one station. Failures are logged and reported, never returned.
    ///
    /// The timeout bounds fetching. The station's documents are then written
    /// as a set, so a failed run leaves the previous documents in place.
    #[instrument(skip(self, station), fields(station = %station.id(), handler = station.handler()))]
    pub async fn run_station(&self, station: &Station, now: i64) -> StationOutcome {
        let lock = self.station_lock(station.id()).await;
        let _guard = lock.lock().await;

        let since = self.since(now);
        let timeout = self.settings.station_timeout;
        let series = match tokio::time::timeout(timeout, self.fetch(station, since)).await {
            Ok(Ok(series)) => series,
            Ok(Err(e)) => {
                warn!(error = %e, "Station run failed");
                return StationOutcome::Failed(e.to_string());
            }
            Err(_) => {
                let e = WindDbError::Timeout(timeout);
                warn!(error = %e, "Station run timed out");
                return StationOutcome::TimedOut;
            }
        };

        if series.is_empty() {
            info!(since, "No samples in window, leaving documents unchanged");
            return StationOutcome::Empty;
        }

        let last_update = series.last_update().unwrap_or(since);
        let documents = build_documents(station, &series);
        if let Err(e) = self.writer.write_all(&documents).await {
            warn!(error = %e, "Failed to write station documents");
            return StationOutcome::Failed(e.to_string());
        }

        debug!(
            capabilities = series.len(),
            samples = series.sample_count(),
            documents = documents.len(),
            last_update,
            "Station documents written"
        );

        StationOutcome::Written {
            capabilities: series.len(),
            samples: series.sample_count(),
            last_update,
        }
    }

    async fn fetch(&self, station: &Station, since: i64) -> WindDbResult<SampleSeries> {
        let mut series = station.get_samples(since).await?;
        if let Some(limit) = self.settings.sample_limit {
            series.truncate(limit);
        }
        Ok(series)
    }

    /// Process `stations`, up to `concurrency` at a time.
    #[instrument(skip(self, stations), fields(stations = stations.len()))]
    pub async fn run_batch(&self, stations: &[Station], now: i64) -> BatchReport {
        let concurrency = self.settings.concurrency.max(1);

        let results: Vec<(StationId, StationOutcome)> = stream::iter(stations)
            .map(|station| async move { (station.id().clone(), self.run_station(station, now).await) })
            .buffer_unordered(concurrency)
            .boxed()
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (id, outcome) in &results {
            report.record(id, outcome);
        }

        info!(
            written = report.written,
            empty = report.empty,
            failed = report.failed,
            timed_out = report.timed_out,
            "Batch complete"
        );
        report
    }

    /// Write the index document for `stations`.
    pub async fn write_index(&self, stations: &[Station], report: &BatchReport) -> WindDbResult<()> {
        let index = build_index(stations, &report.last_updates);
        info!(stations = index.stations.len(), "Writing station index");
        self.writer
            .write(&DocumentAddress::Index, &Document::Index(index))
            .await
    }
}
