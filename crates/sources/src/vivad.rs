//! Adapter for the vivad SQLite database.
//!
//! vivad stores one row per `(station, sample type, timestamp)`. Which sample
//! types a station reports is discovered from the data and cached for the
//! adapter's lifetime.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument};

use winddb_common::capability::{
    AIR_PRESSURE_AVG, AIR_TEMPERATURE_AVG, HUMIDITY_AVG, VISIBILITY_AVG, WIND_DIRECTION_AVG,
    WIND_SPEED_AVG, WIND_SPEED_MAX,
};
use winddb_common::{
    Capability, CapabilitySet, Sample, SampleSeries, StationId, WindDbError, WindDbResult,
};

use crate::adapter::SourceAdapter;
use crate::coerce::{coerce_f64, coerce_i64};
use crate::config::WindSpeedUnit;
use crate::db::{open_sqlite, placeholders};

/// Stored sample type names and the capability each one carries.
const SAMPLE_TYPES: [(&str, Capability); 7] = [
    ("AVG_WIND", WIND_SPEED_AVG),
    ("GUST_WIND", WIND_SPEED_MAX),
    ("WIND_DIRECTION", WIND_DIRECTION_AVG),
    ("VISIBILITY", VISIBILITY_AVG),
    ("AIR_TEMP", AIR_TEMPERATURE_AVG),
    ("AIR_HUMIDITY", HUMIDITY_AVG),
    ("AIR_PRESSURE", AIR_PRESSURE_AVG),
];

fn type_to_capability(sample_type: &str) -> Option<Capability> {
    SAMPLE_TYPES
        .iter()
        .find(|(name, _)| *name == sample_type)
        .map(|(_, capability)| *capability)
}

fn capability_to_type(capability: &Capability) -> Option<&'static str> {
    SAMPLE_TYPES
        .iter()
        .find(|(_, c)| c == capability)
        .map(|(name, _)| *name)
}

/// Reads the long-format `vivad_samples` table.
pub struct VivadSource {
    name: String,
    pool: SqlitePool,
    unit: WindSpeedUnit,
    /// One cell per station. The map lock is only held to find the cell, so
    /// discovery for one station does not wait on another.
    capabilities: Mutex<HashMap<StationId, Arc<OnceCell<CapabilitySet>>>>,
    discoveries: AtomicUsize,
}

impl VivadSource {
    /// Open the database file at `path`.
    pub async fn open(name: &str, path: &Path, unit: WindSpeedUnit) -> WindDbResult<Self> {
        let pool = open_sqlite(path).await?;

        info!(handler = name, path = %path.display(), "Opened vivad source");
        Ok(Self::with_pool(name, pool, unit))
    }

    pub fn with_pool(name: &str, pool: SqlitePool, unit: WindSpeedUnit) -> Self {
        Self {
            name: name.to_string(),
            pool,
            unit,
            capabilities: Mutex::new(HashMap::new()),
            discoveries: AtomicUsize::new(0),
        }
    }

    /// Number of discovery queries issued so far.
    pub fn discovery_count(&self) -> usize {
        self.discoveries.load(Ordering::Relaxed)
    }

    async fn discover(&self, station: &StationId) -> WindDbResult<CapabilitySet> {
        self.discoveries.fetch_add(1, Ordering::Relaxed);

        let rows = sqlx::query(
            "SELECT DISTINCT sample_type FROM vivad_samples WHERE station_name = ?",
        )
        .bind(station.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WindDbError::query(station.as_str(), e))?;

        let mut capabilities = CapabilitySet::new();
        for row in &rows {
            let sample_type: String = row
                .try_get("sample_type")
                .map_err(|e| WindDbError::query(station.as_str(), e))?;
            match type_to_capability(&sample_type) {
                Some(capability) => {
                    capabilities.insert(capability);
                }
                None => debug!(
                    station = %station,
                    sample_type = %sample_type,
                    "Ignoring unknown sample type"
                ),
            }
        }

        Ok(capabilities)
    }
}

#[async_trait]
impl SourceAdapter for VivadSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_capabilities(&self, station: &StationId) -> WindDbResult<CapabilitySet> {
        let cell = self
            .capabilities
            .lock()
            .await
            .entry(station.clone())
            .or_default()
            .clone();

        // A failed discovery leaves the cell empty for the next caller.
        let capabilities = cell
            .get_or_try_init(|| async {
                let capabilities = self.discover(station).await?;
                debug!(
                    station = %station,
                    count = capabilities.len(),
                    "Discovered capabilities"
                );
                Ok::<_, WindDbError>(capabilities)
            })
            .await?;

        Ok(capabilities.clone())
    }

    #[instrument(skip(self, requested), fields(handler = %self.name, station = %station))]
    async fn get_samples(
        &self,
        station: &StationId,
        since: i64,
        requested: &CapabilitySet,
    ) -> WindDbResult<SampleSeries> {
        let supported = self.get_capabilities(station).await?;
        let types: Vec<&'static str> = supported
            .intersection(requested)
            .filter_map(capability_to_type)
            .collect();
        if types.is_empty() {
            return Ok(SampleSeries::new());
        }

        let sql = format!(
            "SELECT sample_type, sample_value, sample_tstamp FROM vivad_samples \
             WHERE station_name = ? AND sample_tstamp >= ? AND sample_type IN ({}) \
             ORDER BY sample_tstamp DESC",
            placeholders(types.len())
        );

        let mut query = sqlx::query(&sql).bind(station.as_str()).bind(since);
        for sample_type in &types {
            query = query.bind(*sample_type);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| WindDbError::query(station.as_str(), e))?;

        let mut series = SampleSeries::new();
        for row in &rows {
            let sample_type: String = row
                .try_get("sample_type")
                .map_err(|e| WindDbError::query(station.as_str(), e))?;
            let Some(capability) = type_to_capability(&sample_type) else {
                continue;
            };

            let timestamp = coerce_i64(row, "sample_tstamp")
                .map_err(|e| WindDbError::query(station.as_str(), e))?;
            let value = coerce_f64(row, "sample_value")
                .map_err(|e| WindDbError::query(station.as_str(), e))?;

            if let (Some(timestamp), Some(mut value)) = (timestamp, value) {
                if capability.is_wind_speed() {
                    value = self.unit.to_mps(value);
                }
                series.push(capability, Sample::new(timestamp, value));
            }
        }

        debug!(rows = rows.len(), types = types.len(), since, "get_samples");
        Ok(series)
    }
}
