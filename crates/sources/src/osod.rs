//! Adapter for the osod SQLite database.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use tracing::{debug, info, instrument};

use winddb_common::capability::{
    AIR_PRESSURE_AVG, AIR_TEMPERATURE_AVG, HUMIDITY_AVG, WIND_DIRECTION_AVG, WIND_SPEED_AVG,
    WIND_SPEED_MAX, WIND_SPEED_MIN,
};
use winddb_common::{
    Capability, CapabilitySet, Sample, SampleSeries, StationId, WindDbError, WindDbResult,
};

use crate::adapter::SourceAdapter;
use crate::coerce::{coerce_f64, coerce_i64};
use crate::config::WindSpeedUnit;
use crate::db::open_sqlite;

/// Capabilities every osod station provides.
pub const CAPABILITIES: [Capability; 7] = [
    AIR_TEMPERATURE_AVG,
    AIR_PRESSURE_AVG,
    HUMIDITY_AVG,
    WIND_SPEED_MAX,
    WIND_SPEED_AVG,
    WIND_SPEED_MIN,
    WIND_DIRECTION_AVG,
];

fn column(capability: &Capability) -> Option<&'static str> {
    match *capability {
        AIR_TEMPERATURE_AVG => Some("airtemp_avg"),
        AIR_PRESSURE_AVG => Some("airpressure"),
        HUMIDITY_AVG => Some("humidity"),
        WIND_SPEED_MAX => Some("windspeed_max"),
        WIND_SPEED_AVG => Some("windspeed_avg"),
        WIND_SPEED_MIN => Some("windspeed_min"),
        WIND_DIRECTION_AVG => Some("wind_dir"),
        _ => None,
    }
}

const SAMPLES_SQL: &str = "SELECT sample_tstamp AS tstamp, airtemp_avg, airpressure, humidity, \
     windspeed_max, windspeed_avg, windspeed_min, wind_dir \
     FROM osod WHERE instance = ? AND sample_tstamp >= ? \
     ORDER BY sample_tstamp DESC";

/// Reads the wide `osod` table, keyed by `instance`.
pub struct OsodSource {
    name: String,
    pool: SqlitePool,
    unit: WindSpeedUnit,
}

impl OsodSource {
    /// Open the database file at `path`.
    pub async fn open(name: &str, path: &Path, unit: WindSpeedUnit) -> WindDbResult<Self> {
        let pool = open_sqlite(path).await?;

        info!(handler = name, path = %path.display(), "Opened osod source");
        Ok(Self::with_pool(name, pool, unit))
    }

    pub fn with_pool(name: &str, pool: SqlitePool, unit: WindSpeedUnit) -> Self {
        Self {
            name: name.to_string(),
            pool,
            unit,
        }
    }
}

#[async_trait]
impl SourceAdapter for OsodSource {
    fn name(&self) -> &str {
        &self.name
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
        let fields: Vec<(Capability, &'static str)> = CAPABILITIES
            .into_iter()
            .filter(|c| requested.contains(c))
            .filter_map(|c| column(&c).map(|col| (c, col)))
            .collect();
        if fields.is_empty() {
            return Ok(SampleSeries::new());
        }

        let rows = sqlx::query(SAMPLES_SQL)
            .bind(station.as_str())
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| WindDbError::query(station.as_str(), e))?;

        let mut series = SampleSeries::new();
        for row in &rows {
            let Some(timestamp) =
                coerce_i64(row, "tstamp").map_err(|e| WindDbError::query(station.as_str(), e))?
            else {
                continue;
            };

            for (capability, col) in &fields {
                let value =
                    coerce_f64(row, *col).map_err(|e| WindDbError::query(station.as_str(), e))?;
                if let Some(mut value) = value {
                    if capability.is_wind_speed() {
                        value = self.unit.to_mps(value);
                    }
                    series.push(*capability, Sample::new(timestamp, value));
                }
            }
        }

        debug!(rows = rows.len(), since, "get_samples");
        Ok(series)
    }
}
