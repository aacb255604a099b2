//! Shared helpers for service integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use sources::db::connect_any;
use test_utils::time::BASE;
use test_utils::{
    awsx_minute_rows, execute_any, insert_awsx, insert_station, temp_sqlite_db, StationRow,
    AWSX_SCHEMA, STATIONS_SCHEMA,
};
use winddb::WindDbConfig;

pub const NOW: i64 = BASE + 3600;

/// A database holding the station registry and five minutes of awsx rows
/// for `kmso` and `lowa`.
pub async fn seeded_database() -> (TempDir, PathBuf) {
    let (dir, path) = temp_sqlite_db("winddb.db", AWSX_SCHEMA).await;
    let pool = connect_any(&sqlite_url(&path)).await.unwrap();
    execute_any(&pool, STATIONS_SCHEMA).await;

    insert_station(&pool, &StationRow::new("kmso", "awsxd")).await;
    insert_station(&pool, &StationRow::new("lowa", "awsxd")).await;
    insert_station(&pool, &StationRow::new("ghost", "missing-handler")).await;
    for station in ["kmso", "lowa"] {
        for row in awsx_minute_rows(station, BASE + 3000, 5) {
            insert_awsx(&pool, &row).await;
        }
    }
    pool.close().await;

    (dir, path)
}

pub fn sqlite_url(path: &Path) -> String {
    format!("sqlite:{}", path.display())
}

pub fn config(db: &Path, output: &Path, extra: &str) -> WindDbConfig {
    let yaml = format!(
        r#"
registry:
  url: "{url}"
output:
  dir: "{output}"
{extra}
sources:
  awsxd:
    type: awsxd
    url: "{url}"
"#,
        url = sqlite_url(db),
        output = output.display(),
        extra = extra,
    );
    WindDbConfig::from_yaml_str(&yaml).unwrap()
}

pub fn read_json(path: &Path) -> serde_json::Value {
    let bytes = std::fs::read(path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e));
    serde_json::from_slice(&bytes).unwrap()
}

/// Ids listed in the index under `root`, or `None` before it exists.
pub fn index_ids(root: &Path) -> Option<Vec<String>> {
    let path = root.join("index.json");
    if !path.exists() {
        return None;
    }
    let index = read_json(&path);
    Some(
        index["stations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["id"].as_str().unwrap().to_string())
            .collect(),
    )
}
