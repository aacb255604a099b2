//! Station registry backed by the `winddb_stations` table.

use sqlx::any::AnyRow;
use sqlx::AnyPool;
use sqlx::Row;
use tracing::{debug, info, instrument, warn};

use sources::coerce::{coerce_f64, coerce_i64};
use sources::db::{connect_any, placeholders, redact_url, SqlDialect};
use sources::SourceSet;
use winddb_common::{StationId, StationInfo, WindDbError, WindDbResult};

use crate::station::Station;

/// Station query, restricted to `filter_len` bound ids when non-zero.
fn stations_sql(dialect: SqlDialect, filter_len: usize) -> String {
    let columns = [
        "id".to_string(),
        "friendlyname".to_string(),
        dialect.integer("pollrate"),
        dialect.real("position_lat"),
        dialect.real("position_lon"),
        "description".to_string(),
        "handler".to_string(),
    ]
    .join(", ");

    if filter_len == 0 {
        format!("SELECT {columns} FROM winddb_stations ORDER BY id")
    } else {
        format!(
            "SELECT {columns} FROM winddb_stations WHERE id IN ({}) ORDER BY id",
            placeholders(filter_len)
        )
    }
}

/// Reads station definitions and binds them to source adapters.
pub struct Registry {
    pool: AnyPool,
    dialect: SqlDialect,
}

impl Registry {
    /// Connect to the registry database (`mysql://...` or `sqlite:...`).
    pub async fn connect(url: &str) -> WindDbResult<Self> {
        let dialect = SqlDialect::from_url(url)?;
        let pool = connect_any(url).await?;
        info!(url = %redact_url(url), "Connected station registry");
        Ok(Self::with_pool(pool, dialect))
    }

    pub fn with_pool(pool: AnyPool, dialect: SqlDialect) -> Self {
        Self { pool, dialect }
    }

    /// Station rows ordered by id; only the ids in `filter` when non-empty.
    ///
    /// Rows whose id is not a valid station identifier are skipped.
    pub async fn load_rows(&self, filter: &[StationId]) -> WindDbResult<Vec<StationInfo>> {
        let sql = stations_sql(self.dialect, filter.len());
        let mut query = sqlx::query(&sql);
        for id in filter {
            query = query.bind(id.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| WindDbError::Database(format!("Failed to read station registry: {}", e)))?;

        let mut stations = Vec::with_capacity(rows.len());
        for row in &rows {
            match decode_row(row) {
                Ok(info) => stations.push(info),
                Err(e) => warn!(error = %e, "Skipping malformed registry row"),
            }
        }

        Ok(stations)
    }

    /// Load stations and bind each to its adapter in `sources`.
    ///
    /// Rows naming an unknown handler, or whose capabilities cannot be
    /// resolved, are logged and skipped.
    #[instrument(skip(self, sources), fields(filter = filter.len()))]
    pub async fn load(&self, sources: &SourceSet, filter: &[StationId]) -> WindDbResult<Vec<Station>> {
        let rows = self.load_rows(filter).await?;
        let total = rows.len();

        let mut stations = Vec::with_capacity(total);
        for info in rows {
            let Some(adapter) = sources.get(&info.handler) else {
                let e = WindDbError::UnknownHandler(info.handler.clone());
                warn!(station = %info.id, error = %e, "Skipping station");
                continue;
            };

            let id = info.id.clone();
            match Station::resolve(info, adapter).await {
                Ok(station) => {
                    debug!(
                        station = %id,
                        handler = station.handler(),
                        capabilities = station.capabilities().len(),
                        "Station loaded"
                    );
                    stations.push(station);
                }
                Err(e) => warn!(station = %id, error = %e, "Capability lookup failed, skipping station"),
            }
        }

        info!(loaded = stations.len(), rows = total, "Station registry loaded");
        Ok(stations)
    }
}

fn decode_row(row: &AnyRow) -> WindDbResult<StationInfo> {
    let text = |column: &str| -> WindDbResult<Option<String>> {
        row.try_get::<Option<String>, _>(column)
            .map_err(|e| WindDbError::Database(format!("Column {}: {}", column, e)))
    };

    let id = text("id")?.unwrap_or_default();
    let id = StationId::new(id)?;
    let handler = text("handler")?.unwrap_or_default();
    let poll_rate = coerce_i64(row, "pollrate")?.unwrap_or(0);

    Ok(StationInfo {
        friendly_name: text("friendlyname")?.unwrap_or_else(|| id.to_string()),
        poll_rate: u32::try_from(poll_rate).unwrap_or(0),
        position_lat: coerce_f64(row, "position_lat")?,
        position_lon: coerce_f64(row, "position_lon")?,
        description: text("description")?,
        handler,
        id,
    })
}
