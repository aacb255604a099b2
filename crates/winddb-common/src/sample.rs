//! Samples and capability-keyed sample series.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capability::{Capability, CapabilitySet};

/// One measurement: a UTC Unix timestamp (seconds) and a value.
///
/// Serialized with the `tstamp`/`svalue` keys the web front end reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "tstamp")]
    pub timestamp: i64,
    #[serde(rename = "svalue")]
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Samples for one station and one time window, grouped by capability.
///
/// Each series is kept newest first. Capabilities never map to an empty
/// series: an entry exists only once a sample has been pushed for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSeries {
    series: BTreeMap<Capability, Vec<Sample>>,
}

impl SampleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample to the series for `capability`.
    pub fn push(&mut self, capability: Capability, sample: Sample) {
        self.series.entry(capability).or_default().push(sample);
    }

    /// Replace the series for `capability`. Empty input removes the entry.
    pub fn insert(&mut self, capability: Capability, samples: Vec<Sample>) {
        if samples.is_empty() {
            self.series.remove(&capability);
        } else {
            self.series.insert(capability, samples);
        }
    }

    /// Sort every series by timestamp, newest first.
    pub fn sort_descending(&mut self) {
        for samples in self.series.values_mut() {
            samples.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        }
    }

    /// Drop every capability not in `allowed`.
    pub fn retain_capabilities(&mut self, allowed: &CapabilitySet) {
        self.series.retain(|capability, _| allowed.contains(capability));
    }

    /// Drop samples older than `since`, and any series left empty.
    pub fn retain_since(&mut self, since: i64) {
        for samples in self.series.values_mut() {
            samples.retain(|s| s.timestamp >= since);
        }
        self.series.retain(|_, samples| !samples.is_empty());
    }

    /// Keep at most `limit` samples per series (the newest, once sorted).
    pub fn truncate(&mut self, limit: usize) {
        for samples in self.series.values_mut() {
            samples.truncate(limit);
        }
        self.series.retain(|_, samples| !samples.is_empty());
    }

    pub fn get(&self, capability: &Capability) -> Option<&[Sample]> {
        self.series.get(capability).map(Vec::as_slice)
    }

    /// Most recent sample for `capability`.
    pub fn latest(&self, capability: &Capability) -> Option<&Sample> {
        self.series
            .get(capability)
            .and_then(|samples| samples.iter().max_by_key(|s| s.timestamp))
    }

    pub fn contains(&self, capability: &Capability) -> bool {
        self.series.contains_key(capability)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.series.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Capability, &[Sample])> {
        self.series.iter().map(|(cap, samples)| (*cap, samples.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(Vec::is_empty)
    }

    /// Number of capabilities present.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Total number of samples across all capabilities.
    pub fn sample_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    /// Newest timestamp across all capabilities.
    pub fn last_update(&self) -> Option<i64> {
        self.series
            .values()
            .flat_map(|samples| samples.iter().map(|s| s.timestamp))
            .max()
    }
}

impl FromIterator<(Capability, Sample)> for SampleSeries {
    fn from_iter<T: IntoIterator<Item = (Capability, Sample)>>(iter: T) -> Self {
        let mut series = SampleSeries::new();
        for (capability, sample) in iter {
            series.push(capability, sample);
        }
        series
    }
}
