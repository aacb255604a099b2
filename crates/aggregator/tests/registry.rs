mod common;

use std::sync::Arc;

use aggregator::{FileWriter, OutputFormat, Pipeline, PipelineSettings, Registry};
use common::{read_json, series, station_id, FakeSource};
use sources::{SourceSet, SqlDialect};
use tempfile::TempDir;
use test_utils::time::BASE;
use test_utils::{execute_any, insert_station, memory_any_pool, StationRow, STATIONS_SCHEMA};
use winddb_common::capability::{HUMIDITY_AVG, WIND_SPEED_MAX};

async fn registry(rows: &[StationRow]) -> Registry {
    let pool = memory_any_pool().await;
    execute_any(&pool, STATIONS_SCHEMA).await;
    for row in rows {
        insert_station(&pool, row).await;
    }
    Registry::with_pool(pool, SqlDialect::Sqlite)
}

fn foo_sources(source: Arc<FakeSource>) -> SourceSet {
    let mut set = SourceSet::new();
    set.insert("foo", source);
    set
}

#[tokio::test]
async fn test_load_rows_ordered_with_metadata() {
    let mut b = StationRow::new("B", "foo");
    b.position_lat = Some(59.33);
    b.position_lon = Some(18.07);
    b.description = Some("Harbour mast".to_string());
    b.poll_rate = 30;
    let registry = registry(&[b, StationRow::new("A", "foo")]).await;

    let rows = registry.load_rows(&[]).await.unwrap();

    let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert_eq!(rows[1].poll_rate, 30);
    assert_eq!(rows[1].position_lat, Some(59.33));
    assert_eq!(rows[1].description.as_deref(), Some("Harbour mast"));
    assert_eq!(rows[0].friendly_name, "Station A");
    assert_eq!(rows[0].position_lon, None);
}

#[tokio::test]
async fn test_load_rows_filter() {
    let registry = registry(&[
        StationRow::new("A", "foo"),
        StationRow::new("B", "foo"),
        StationRow::new("C", "foo"),
    ])
    .await;

    let rows = registry
        .load_rows(&[station_id("C"), station_id("A"), station_id("missing")])
        .await
        .unwrap();

    let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "C"]);
}

#[tokio::test]
async fn test_invalid_station_id_rows_skipped() {
    let registry = registry(&[
        StationRow::new("A", "foo"),
        StationRow::new("bad id", "foo"),
    ])
    .await;

    let rows = registry.load_rows(&[]).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id.as_str(), "A");
}

#[tokio::test]
async fn test_unknown_handler_dropped() {
    let registry = registry(&[StationRow::new("A", "foo"), StationRow::new("B", "bar")]).await;
    let source = Arc::new(FakeSource::new("foo", [WIND_SPEED_MAX]));

    let stations = registry.load(&foo_sources(source), &[]).await.unwrap();

    assert_eq!(stations.len(), 1);
    assert_eq!(stations[0].id().as_str(), "A");
    assert_eq!(stations[0].handler(), "foo");
    assert!(stations[0].capabilities().contains(&WIND_SPEED_MAX));
}

#[tokio::test]
async fn test_capability_failure_dropped() {
    let registry = registry(&[StationRow::new("A", "foo"), StationRow::new("B", "foo")]).await;
    let source = Arc::new(FakeSource::new("foo", [HUMIDITY_AVG]).with_failing_capabilities("B"));

    let stations = registry.load(&foo_sources(source), &[]).await.unwrap();

    let ids: Vec<_> = stations.iter().map(|s| s.id().as_str()).collect();
    assert_eq!(ids, vec!["A"]);
}

#[tokio::test]
async fn test_missing_table_is_error() {
    let pool = memory_any_pool().await;
    let registry = Registry::with_pool(pool, SqlDialect::Sqlite);

    assert!(registry.load(&SourceSet::new(), &[]).await.is_err());
}

#[tokio::test]
async fn test_index_lists_only_loaded_stations() {
    let registry = registry(&[StationRow::new("A", "foo"), StationRow::new("B", "bar")]).await;
    let source = Arc::new(FakeSource::new("foo", [WIND_SPEED_MAX]));
    let now = BASE + 3600;
    source
        .set_samples("A", series(&[(WIND_SPEED_MAX, now - 60, 4.0)]))
        .await;
    let stations = registry.load(&foo_sources(source), &[]).await.unwrap();

    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(
        PipelineSettings::default(),
        Arc::new(FileWriter::new(dir.path(), OutputFormat::Json)),
    );
    let report = pipeline.run_batch(&stations, now).await;
    pipeline.write_index(&stations, &report).await.unwrap();

    let index = read_json(&dir.path().join("index.json"));
    let entries = index["stations"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], "A");
    assert_eq!(entries[0]["friendlyname"], "Station A");
    assert_eq!(entries[0]["lastupdate"], now - 60);
    assert!(dir.path().join("A/info.json").exists());
    assert!(!dir.path().join("B").exists());
}

#[tokio::test]
async fn test_index_last_update_null_without_samples() {
    let registry = registry(&[StationRow::new("A", "foo")]).await;
    let source = Arc::new(FakeSource::new("foo", [WIND_SPEED_MAX]));
    let stations = registry.load(&foo_sources(source), &[]).await.unwrap();

    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(
        PipelineSettings::default(),
        Arc::new(FileWriter::new(dir.path(), OutputFormat::Json)),
    );
    let report = pipeline.run_batch(&stations, BASE).await;
    pipeline.write_index(&stations, &report).await.unwrap();

    let index = read_json(&dir.path().join("index.json"));
    assert!(index["stations"][0]["lastupdate"].is_null());
    assert_eq!(report.empty, 1);
}
