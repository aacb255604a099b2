//! Adapter for the `awsx` table written by the awsxd daemon.

use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::AnyPool;
use tracing::{debug, info, instrument};

use winddb_common::capability::{
    AIR_PRESSURE_AVG, AIR_TEMPERATURE_AVG, HUMIDITY_AVG, WIND_DIRECTION_AVG,
    WIND_DIRECTION_STDDEV, WIND_SPEED_AVG, WIND_SPEED_MAX, WIND_SPEED_MIN,
};
use winddb_common::{
    Capability, CapabilitySet, Sample, SampleSeries, StationId, WindDbError, WindDbResult,
};

use crate::adapter::SourceAdapter;
use crate::coerce::{coerce_f64, coerce_i64};
use crate::config::WindSpeedUnit;
use crate::db::{connect_any, redact_url, SqlDialect};

/// Capabilities every awsx station provides.
pub const CAPABILITIES: [Capability; 8] = [
    WIND_SPEED_MAX,
    WIND_SPEED_AVG,
    WIND_SPEED_MIN,
    WIND_DIRECTION_AVG,
    WIND_DIRECTION_STDDEV,
    AIR_TEMPERATURE_AVG,
    HUMIDITY_AVG,
    AIR_PRESSURE_AVG,
];

/// One decoded `awsx` row. Wind speeds are in m/s.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AwsxRecord {
    pub timestamp: i64,
    pub wind_max: Option<f64>,
    pub wind_avg: Option<f64>,
    pub wind_min: Option<f64>,
    pub wind_dir: Option<f64>,
    pub wind_stability: Option<f64>,
    pub temp_avg: Option<f64>,
    pub humidity: Option<f64>,
    pub air_pressure: Option<f64>,
}

impl AwsxRecord {
    fn from_row(row: &AnyRow, unit: WindSpeedUnit) -> WindDbResult<Option<Self>> {
        let Some(timestamp) = coerce_i64(row, "tstamp")? else {
            return Ok(None);
        };
        let speed = |column: &str| -> WindDbResult<Option<f64>> {
            Ok(coerce_f64(row, column)?.map(|v| unit.to_mps(v)))
        };

        Ok(Some(Self {
            timestamp,
            wind_max: speed("wind_max")?,
            wind_avg: speed("wind_avg")?,
            wind_min: speed("wind_min")?,
            wind_dir: coerce_f64(row, "wind_dir")?,
            wind_stability: coerce_f64(row, "wind_stability")?,
            temp_avg: coerce_f64(row, "temp_avg")?,
            humidity: coerce_f64(row, "humidity")?,
            air_pressure: coerce_f64(row, "air_pressure")?,
        }))
    }

    /// The column backing `capability`, if any.
    pub fn value(&self, capability: &Capability) -> Option<f64> {
        match *capability {
            WIND_SPEED_MAX => self.wind_max,
            WIND_SPEED_AVG => self.wind_avg,
            WIND_SPEED_MIN => self.wind_min,
            WIND_DIRECTION_AVG => self.wind_dir,
            WIND_DIRECTION_STDDEV => self.wind_stability,
            AIR_TEMPERATURE_AVG => self.temp_avg,
            HUMIDITY_AVG => self.humidity,
            AIR_PRESSURE_AVG => self.air_pressure,
            _ => None,
        }
    }
}

const VALUE_COLUMNS: [&str; 8] = [
    "wind_max",
    "wind_avg",
    "wind_min",
    "wind_dir",
    "wind_stability",
    "temp_avg",
    "humidity",
    "air_pressure",
];

/// Query for one station's rows at or after a cutoff, binding station then cutoff.
fn records_sql(dialect: SqlDialect) -> String {
    let tstamp = dialect.unix_timestamp("create_stamp");
    let values: Vec<String> = VALUE_COLUMNS.iter().map(|c| dialect.real(c)).collect();

    format!(
        "SELECT {tstamp} AS tstamp, {} FROM awsx \
         WHERE station = ? AND {tstamp} >= ? \
         ORDER BY tstamp DESC",
        values.join(", ")
    )
}

/// Read `awsx` rows for `station` at or after `since`, newest first.
pub(crate) async fn fetch_records(
    pool: &AnyPool,
    dialect: SqlDialect,
    unit: WindSpeedUnit,
    station: &StationId,
    since: i64,
) -> WindDbResult<Vec<AwsxRecord>> {
    let sql = records_sql(dialect);

    let rows = sqlx::query(&sql)
        .bind(station.as_str())
        .bind(since)
        .fetch_all(pool)
        .await
        .map_err(|e| WindDbError::query(station.as_str(), e))?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        if let Some(record) =
            AwsxRecord::from_row(row, unit).map_err(|e| WindDbError::query(station.as_str(), e))?
        {
            records.push(record);
        }
    }

    Ok(records)
}

/// Reads the wide `awsx` table: one row per sample, one column per capability.
pub struct AwsxdSource {
    name: String,
    pool: AnyPool,
    dialect: SqlDialect,
    unit: WindSpeedUnit,
}

impl AwsxdSource {
    /// Connect to the store at `url` (`mysql://...` or `sqlite:...`).
    pub async fn connect(name: &str, url: &str, unit: WindSpeedUnit) -> WindDbResult<Self> {
        let dialect = SqlDialect::from_url(url)?;
        let pool = connect_any(url).await?;

        info!(handler = name, url = %redact_url(url), "Connected awsxd source");
        Ok(Self::with_pool(name, pool, dialect, unit))
    }

    pub fn with_pool(name: &str, pool: AnyPool, dialect: SqlDialect, unit: WindSpeedUnit) -> Self {
        Self {
            name: name.to_string(),
            pool,
            dialect,
            unit,
        }
    }
}

#[async_trait]
impl SourceAdapter for AwsxdSource {
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
        let fields: Vec<Capability> = CAPABILITIES
            .into_iter()
            .filter(|c| requested.contains(c))
            .collect();
        if fields.is_empty() {
            return Ok(SampleSeries::new());
        }

        let records = fetch_records(&self.pool, self.dialect, self.unit, station, since).await?;

        let mut series = SampleSeries::new();
        for record in &records {
            for capability in &fields {
                if let Some(value) = record.value(capability) {
                    series.push(*capability, Sample::new(record.timestamp, value));
                }
            }
        }

        debug!(rows = records.len(), since, "get_samples");
        Ok(series)
    }
}
