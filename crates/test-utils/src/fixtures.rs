//! Common test fixtures for winddb tests.
//!
//! Schemas mirror the production stores closely enough for the adapters'
//! queries. Value columns are declared without a type so a fixture can
//! store integers, reals or text unchanged.

use std::path::{Path, PathBuf};

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tempfile::TempDir;

use crate::generators::format_create_stamp;

/// Table written by the awsxd acquisition daemon.
pub const AWSX_SCHEMA: &str = r#"
CREATE TABLE awsx (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    station TEXT NOT NULL,
    create_stamp TEXT NOT NULL,
    wind_max,
    wind_avg,
    wind_min,
    wind_dir,
    wind_stability,
    temp_avg,
    humidity,
    air_pressure
);
CREATE INDEX idx_awsx_station ON awsx(station, create_stamp)
"#;

/// Table written by the osod acquisition daemon.
pub const OSOD_SCHEMA: &str = r#"
CREATE TABLE osod (
    instance TEXT NOT NULL,
    sample_tstamp INTEGER NOT NULL,
    airtemp_avg,
    airpressure,
    humidity,
    windspeed_max,
    windspeed_avg,
    windspeed_min,
    wind_dir
)
"#;

/// Long-format table written by the vivad acquisition daemon.
pub const VIVAD_SCHEMA: &str = r#"
CREATE TABLE vivad_samples (
    station_name TEXT NOT NULL,
    sample_type TEXT NOT NULL,
    sample_value,
    sample_tstamp INTEGER NOT NULL
)
"#;

/// Station registry table.
pub const STATIONS_SCHEMA: &str = r#"
CREATE TABLE winddb_stations (
    id TEXT PRIMARY KEY,
    friendlyname TEXT NOT NULL,
    pollrate INTEGER NOT NULL,
    position_lat REAL,
    position_lon REAL,
    description TEXT,
    handler TEXT NOT NULL
)
"#;

/// Open an in-memory SQLite database through the runtime-selected driver.
///
/// The pool holds a single connection that never expires, so the database
/// lives as long as the pool.
pub async fn memory_any_pool() -> AnyPool {
    sqlx::any::install_default_drivers();

    AnyPoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database")
}

/// Open an in-memory SQLite database (for testing).
pub async fn memory_sqlite_pool() -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(":memory:")
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory database")
}

/// Open (creating if needed) a SQLite file database.
pub async fn sqlite_file_pool(path: &Path) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to open SQLite file")
}

/// Create a SQLite file in a fresh temporary directory and apply `schema`.
///
/// Keep the returned `TempDir` alive for as long as the file is used.
pub async fn temp_sqlite_db(name: &str, schema: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join(name);

    let pool = sqlite_file_pool(&path).await;
    execute_sqlite(&pool, schema).await;
    pool.close().await;

    (dir, path)
}

/// Run each `;`-separated statement of `script`.
pub async fn execute_any(pool: &AnyPool, script: &str) {
    for statement in script.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed)
                .execute(pool)
                .await
                .unwrap_or_else(|e| panic!("Statement failed: {}\n{}", e, trimmed));
        }
    }
}

/// Run each `;`-separated statement of `script`.
pub async fn execute_sqlite(pool: &SqlitePool, script: &str) {
    for statement in script.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed)
                .execute(pool)
                .await
                .unwrap_or_else(|e| panic!("Statement failed: {}\n{}", e, trimmed));
        }
    }
}

/// One row of the `awsx` table. `timestamp` is stored as a UTC datetime.
#[derive(Debug, Clone, Default)]
pub struct AwsxRow {
    pub station: String,
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

pub async fn insert_awsx(pool: &AnyPool, row: &AwsxRow) {
    sqlx::query(
        "INSERT INTO awsx (station, create_stamp, wind_max, wind_avg, wind_min, \
         wind_dir, wind_stability, temp_avg, humidity, air_pressure) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&row.station)
    .bind(format_create_stamp(row.timestamp))
    .bind(row.wind_max)
    .bind(row.wind_avg)
    .bind(row.wind_min)
    .bind(row.wind_dir)
    .bind(row.wind_stability)
    .bind(row.temp_avg)
    .bind(row.humidity)
    .bind(row.air_pressure)
    .execute(pool)
    .await
    .expect("Failed to insert awsx row");
}

/// One row of the `osod` table.
#[derive(Debug, Clone, Default)]
pub struct OsodRow {
    pub instance: String,
    pub timestamp: i64,
    pub airtemp_avg: Option<f64>,
    pub airpressure: Option<f64>,
    pub humidity: Option<f64>,
    pub windspeed_max: Option<f64>,
    pub windspeed_avg: Option<f64>,
    pub windspeed_min: Option<f64>,
    pub wind_dir: Option<f64>,
}

pub async fn insert_osod(pool: &SqlitePool, row: &OsodRow) {
    sqlx::query(
        "INSERT INTO osod (instance, sample_tstamp, airtemp_avg, airpressure, humidity, \
         windspeed_max, windspeed_avg, windspeed_min, wind_dir) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&row.instance)
    .bind(row.timestamp)
    .bind(row.airtemp_avg)
    .bind(row.airpressure)
    .bind(row.humidity)
    .bind(row.windspeed_max)
    .bind(row.windspeed_avg)
    .bind(row.windspeed_min)
    .bind(row.wind_dir)
    .execute(pool)
    .await
    .expect("Failed to insert osod row");
}

/// Insert one `vivad_samples` row.
pub async fn insert_vivad(
    pool: &SqlitePool,
    station: &str,
    sample_type: &str,
    value: f64,
    timestamp: i64,
) {
    sqlx::query(
        "INSERT INTO vivad_samples (station_name, sample_type, sample_value, sample_tstamp) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(station)
    .bind(sample_type)
    .bind(value)
    .bind(timestamp)
    .execute(pool)
    .await
    .expect("Failed to insert vivad row");
}

/// One row of the station registry.
#[derive(Debug, Clone)]
pub struct StationRow {
    pub id: String,
    pub friendly_name: String,
    pub poll_rate: i64,
    pub position_lat: Option<f64>,
    pub position_lon: Option<f64>,
    pub description: Option<String>,
    pub handler: String,
}

impl StationRow {
    pub fn new(id: &str, handler: &str) -> Self {
        Self {
            id: id.to_string(),
            friendly_name: format!("Station {}", id),
            poll_rate: 60,
            position_lat: None,
            position_lon: None,
            description: None,
            handler: handler.to_string(),
        }
    }
}

pub async fn insert_station(pool: &AnyPool, row: &StationRow) {
    sqlx::query(
        "INSERT INTO winddb_stations \
         (id, friendlyname, pollrate, position_lat, position_lon, description, handler) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&row.id)
    .bind(&row.friendly_name)
    .bind(row.poll_rate)
    .bind(row.position_lat)
    .bind(row.position_lon)
    .bind(row.description.clone())
    .bind(&row.handler)
    .execute(pool)
    .await
    .expect("Failed to insert station row");
}

/// Common time values for testing.
pub mod time {
    /// 2023-11-14T22:13:20Z, a round Unix timestamp.
    pub const BASE: i64 = 1_700_000_000;

    /// Aligned to a 300-second bucket boundary.
    pub const BUCKET_ALIGNED: i64 = 1_700_000_100;
}
