//! Sample periods built by bucketing raw awsxd rows.
//!
//! Rows are grouped into fixed windows of `pollrate * period_count` seconds
//! aligned to the Unix epoch, using the station's registry poll rate and
//! falling back to the configured `poll_rate_secs`. Each window becomes one
//! [`SamplePeriod`] with min/max/mean statistics.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::Serialize;
use sqlx::AnyPool;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use winddb_common::capability::{
    AIR_PRESSURE_AVG, AIR_TEMPERATURE_AVG, HUMIDITY_AVG, WIND_DIRECTION_AVG,
    WIND_DIRECTION_STDDEV, WIND_SPEED_AVG, WIND_SPEED_MAX, WIND_SPEED_MIN,
};
use winddb_common::{
    Capability, CapabilitySet, Sample, SampleSeries, StationId, StationInfo, WindDbError,
    WindDbResult,
};

use crate::adapter::SourceAdapter;
use crate::awsxd::{fetch_records, AwsxRecord, CAPABILITIES};
use crate::config::WindSpeedUnit;
use crate::db::{connect_any, redact_url, SqlDialect};

/// Aggregated statistics for one bucket of raw samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplePeriod {
    pub num_samples: u32,
    pub first_sample: i64,
    pub last_sample: i64,
    pub windspeed_max: Option<f64>,
    pub windspeed_min: Option<f64>,
    pub windspeed_avg: Option<f64>,
    pub winddir_avg: Option<f64>,
    /// Always 0.0; the circular standard deviation is not computed.
    pub winddir_stability: f64,
    pub airtemp_avg: Option<f64>,
    pub humidity: Option<f64>,
    pub airpressure: Option<f64>,
}

impl SamplePeriod {
    pub fn value(&self, capability: &Capability) -> Option<f64> {
        match *capability {
            WIND_SPEED_MAX => self.windspeed_max,
            WIND_SPEED_MIN => self.windspeed_min,
            WIND_SPEED_AVG => self.windspeed_avg,
            WIND_DIRECTION_AVG => self.winddir_avg,
            WIND_DIRECTION_STDDEV => Some(self.winddir_stability),
            AIR_TEMPERATURE_AVG => self.airtemp_avg,
            HUMIDITY_AVG => self.humidity,
            AIR_PRESSURE_AVG => self.airpressure,
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn get(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Debug)]
struct PeriodAccumulator {
    num_samples: u32,
    first_sample: i64,
    last_sample: i64,
    windspeed_max: Option<f64>,
    windspeed_min: Option<f64>,
    windspeed_avg: Mean,
    winddir_avg: Mean,
    airtemp_avg: Mean,
    humidity: Mean,
    airpressure: Mean,
}

impl PeriodAccumulator {
    fn new(timestamp: i64) -> Self {
        Self {
            num_samples: 0,
            first_sample: timestamp,
            last_sample: timestamp,
            windspeed_max: None,
            windspeed_min: None,
            windspeed_avg: Mean::default(),
            winddir_avg: Mean::default(),
            airtemp_avg: Mean::default(),
            humidity: Mean::default(),
            airpressure: Mean::default(),
        }
    }

    fn add(&mut self, record: &AwsxRecord) {
        self.num_samples += 1;
        self.first_sample = self.first_sample.min(record.timestamp);
        self.last_sample = self.last_sample.max(record.timestamp);

        if let Some(v) = record.wind_max {
            self.windspeed_max = Some(self.windspeed_max.map_or(v, |m| m.max(v)));
        }
        if let Some(v) = record.wind_min {
            self.windspeed_min = Some(self.windspeed_min.map_or(v, |m| m.min(v)));
        }
        self.windspeed_avg.add(record.wind_avg);
        self.winddir_avg.add(record.wind_dir);
        self.airtemp_avg.add(record.temp_avg);
        self.humidity.add(record.humidity);
        self.airpressure.add(record.air_pressure);
    }

    fn finish(self) -> SamplePeriod {
        SamplePeriod {
            num_samples: self.num_samples,
            first_sample: self.first_sample,
            last_sample: self.last_sample,
            windspeed_max: self.windspeed_max,
            windspeed_min: self.windspeed_min,
            windspeed_avg: self.windspeed_avg.get(),
            winddir_avg: self.winddir_avg.get(),
            winddir_stability: 0.0,
            airtemp_avg: self.airtemp_avg.get(),
            humidity: self.humidity.get(),
            airpressure: self.airpressure.get(),
        }
    }
}

/// Group raw records into periods of `period_secs`, newest first.
pub fn bucket_records(records: &[AwsxRecord], period_secs: i64) -> Vec<SamplePeriod> {
    let mut buckets: BTreeMap<i64, PeriodAccumulator> = BTreeMap::new();
    for record in records {
        buckets
            .entry(record.timestamp.div_euclid(period_secs))
            .or_insert_with(|| PeriodAccumulator::new(record.timestamp))
            .add(record);
    }

    buckets
        .into_values()
        .rev()
        .map(PeriodAccumulator::finish)
        .collect()
}

/// Serves awsx data as fixed-length sample periods.
pub struct PeriodicSource {
    name: String,
    pool: AnyPool,
    dialect: SqlDialect,
    unit: WindSpeedUnit,
    default_poll_rate: u32,
    period_count: u32,
    /// Registry poll rates by station.
    poll_rates: RwLock<HashMap<StationId, u32>>,
}

impl PeriodicSource {
    pub async fn connect(
        name: &str,
        url: &str,
        poll_rate_secs: u32,
        period_count: u32,
        unit: WindSpeedUnit,
    ) -> WindDbResult<Self> {
        let dialect = SqlDialect::from_url(url)?;
        let pool = connect_any(url).await?;

        info!(
            handler = name,
            url = %redact_url(url),
            poll_rate_secs,
            period_count,
            "Connected periodic source"
        );
        Self::with_pool(name, pool, dialect, poll_rate_secs, period_count, unit)
    }

    pub fn with_pool(
        name: &str,
        pool: AnyPool,
        dialect: SqlDialect,
        poll_rate_secs: u32,
        period_count: u32,
        unit: WindSpeedUnit,
    ) -> WindDbResult<Self> {
        if poll_rate_secs == 0 || period_count == 0 {
            return Err(WindDbError::Config(format!(
                "Source '{}': poll_rate_secs and period_count must be non-zero",
                name
            )));
        }

        Ok(Self {
            name: name.to_string(),
            pool,
            dialect,
            unit,
            default_poll_rate: poll_rate_secs,
            period_count,
            poll_rates: RwLock::new(HashMap::new()),
        })
    }

    /// Bucket length for `station`.
    pub async fn period_secs(&self, station: &StationId) -> i64 {
        let poll_rate = self
            .poll_rates
            .read()
            .await
            .get(station)
            .copied()
            .unwrap_or(self.default_poll_rate);
        i64::from(poll_rate) * i64::from(self.period_count)
    }

    /// Periods holding samples at or after `since`, newest first.
    ///
    /// The oldest period may be partial when `since` falls inside it.
    pub async fn periods(&self, station: &StationId, since: i64) -> WindDbResult<Vec<SamplePeriod>> {
        let period_secs = self.period_secs(station).await;
        let records = fetch_records(&self.pool, self.dialect, self.unit, station, since).await?;
        Ok(bucket_records(&records, period_secs))
    }
}

#[async_trait]
impl SourceAdapter for PeriodicSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn register_station(&self, info: &StationInfo) {
        let mut poll_rates = self.poll_rates.write().await;
        if info.poll_rate == 0 {
            // Unset in the registry.
            poll_rates.remove(&info.id);
        } else {
            poll_rates.insert(info.id.clone(), info.poll_rate);
        }
    }

    async fn get_capabilities(&self, _station: &StationId) -> WindDbResult<CapabilitySet> {
        Ok(CAPABILITIES.into_iter().collect())
    }

    #[instrument(skip(self, requested), fields(handler = %self.name, station = %station))]
    async fn get_samples(
        &self,
        station: &StationId,
        since: i64,
        requested: &CapabilitySet,
    ) -> WindDbResult<SampleSeries> {
        let fields: Vec<Capability> = CAPABILITIES
            .into_iter()
            .filter(|c| requested.contains(c))
            .collect();
        if fields.is_empty() {
            return Ok(SampleSeries::new());
        }

        let periods = self.periods(station, since).await?;

        let mut series = SampleSeries::new();
        for period in &periods {
            for capability in &fields {
                if let Some(value) = period.value(capability) {
                    series.push(*capability, Sample::new(period.last_sample, value));
                }
            }
        }

        debug!(periods = periods.len(), since, "get_samples");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp: i64, wind_max: f64) -> AwsxRecord {
        AwsxRecord {
            timestamp,
            wind_max: Some(wind_max),
            wind_min: Some(wind_max - 2.0),
            wind_avg: Some(wind_max - 1.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_bucket_boundaries() {
        // 300-second buckets: [0, 300), [300, 600)
        let records = vec![record(599, 4.0), record(300, 2.0), record(299, 9.0)];
        let periods = bucket_records(&records, 300);

        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].num_samples, 2);
        assert_eq!(periods[0].first_sample, 300);
        assert_eq!(periods[0].last_sample, 599);
        assert_eq!(periods[0].windspeed_max, Some(4.0));
        assert_eq!(periods[0].windspeed_min, Some(0.0));
        assert_eq!(periods[0].windspeed_avg, Some(2.0));
        assert_eq!(periods[1].num_samples, 1);
    }

    #[test]
    fn test_missing_values_do_not_count() {
        let mut partial = record(10, 3.0);
        partial.humidity = Some(50.0);
        let records = vec![partial, record(20, 5.0)];
        let periods = bucket_records(&records, 300);

        assert_eq!(periods[0].num_samples, 2);
        assert_eq!(periods[0].humidity, Some(50.0));
        assert_eq!(periods[0].airtemp_avg, None);
        assert_eq!(periods[0].winddir_stability, 0.0);
    }

    #[test]
    fn test_negative_timestamps_floor() {
        let periods = bucket_records(&[record(-1, 1.0), record(0, 1.0)], 300);
        assert_eq!(periods.len(), 2);
    }
}
