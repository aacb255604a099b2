//! Shared helpers for aggregator integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use aggregator::Station;
use sources::SourceAdapter;
use winddb_common::{
    Capability, CapabilitySet, Sample, SampleSeries, StationId, StationInfo, WindDbError,
    WindDbResult,
};

/// In-memory adapter. Returns stored samples unfiltered so callers'
/// filtering is exercised.
pub struct FakeSource {
    name: String,
    capabilities: CapabilitySet,
    samples: Mutex<HashMap<String, SampleSeries>>,
    failing: Mutex<HashSet<String>>,
    failing_capabilities: HashSet<String>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub sample_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(name: &str, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            name: name.to_string(),
            capabilities: capabilities.into_iter().collect(),
            samples: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            failing_capabilities: HashSet::new(),
            delay: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            sample_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_failing_capabilities(mut self, station: &str) -> Self {
        self.failing_capabilities.insert(station.to_string());
        self
    }

    pub async fn set_samples(&self, station: &str, series: SampleSeries) {
        self.samples.lock().await.insert(station.to_string(), series);
    }

    pub async fn fail(&self, station: &str) {
        self.failing.lock().await.insert(station.to_string());
    }
}

#[async_trait]
impl SourceAdapter for FakeSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_capabilities(&self, station: &StationId) -> WindDbResult<CapabilitySet> {
        if self.failing_capabilities.contains(station.as_str()) {
            return Err(WindDbError::query(station.as_str(), "capability lookup refused"));
        }
        Ok(self.capabilities.clone())
    }

    async fn get_samples(
        &self,
        station: &StationId,
        _since: i64,
        _requested: &CapabilitySet,
    ) -> WindDbResult<SampleSeries> {
        self.sample_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.failing.lock().await.contains(station.as_str()) {
            Err(WindDbError::query(station.as_str(), "connection refused"))
        } else {
            Ok(self
                .samples
                .lock()
                .await
                .get(station.as_str())
                .cloned()
                .unwrap_or_default())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub fn station_id(id: &str) -> StationId {
    StationId::new(id).unwrap()
}

pub async fn station(id: &str, source: Arc<FakeSource>) -> Station {
    let handler = source.name().to_string();
    Station::resolve(StationInfo::new(station_id(id), handler), source)
        .await
        .unwrap()
}

/// Series from `(capability, timestamp, value)` triples.
pub fn series(samples: &[(Capability, i64, f64)]) -> SampleSeries {
    samples
        .iter()
        .map(|(capability, t, v)| (*capability, Sample::new(*t, *v)))
        .collect()
}

pub fn read_json(path: &Path) -> serde_json::Value {
    let bytes = std::fs::read(path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e));
    serde_json::from_slice(&bytes).unwrap()
}

/// Every file under `root` with its contents, sorted by path.
pub fn snapshot_tree(root: &Path) -> Vec<(String, Vec<u8>)> {
    fn walk(dir: &Path, root: &Path, out: &mut Vec<(String, Vec<u8>)>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(&path, root, out);
            } else {
                let relative = path.strip_prefix(root).unwrap().display().to_string();
                out.push((relative, std::fs::read(&path).unwrap()));
            }
        }
    }

    let mut files = Vec::new();
    walk(root, root, &mut files);
    files.sort();
    files
}
