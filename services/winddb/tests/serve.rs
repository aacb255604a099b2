//! Serve mode with periodic batches.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;

use common::{config, index_ids, seeded_database, sqlite_url};
use sources::db::connect_any;
use test_utils::{insert_station, StationRow};
use winddb::App;

/// Poll the index until `done` accepts its ids.
async fn wait_for_index(root: &Path, done: impl Fn(&[String]) -> bool) -> Vec<String> {
    for _ in 0..100 {
        if let Some(ids) = index_ids(root) {
            if done(&ids) {
                return ids;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("index never matched, last: {:?}", index_ids(root));
}

/// Signal shutdown until the serve task has finished, then return its result.
async fn stop<T>(serve: tokio::task::JoinHandle<T>, shutdown: &broadcast::Sender<()>) -> T {
    while !serve.is_finished() {
        shutdown.send(()).ok();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    serve.await.unwrap()
}

#[tokio::test]
async fn test_periodic_batches_pick_up_new_stations() {
    let (_db_dir, db) = seeded_database().await;
    let out = TempDir::new().unwrap();
    let extra = "listener:\n  bind: 127.0.0.1:0\n";
    let app = Arc::new(App::connect(config(&db, out.path(), extra)).await.unwrap());

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let serve = {
        let app = app.clone();
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            app.serve(Some(Duration::from_millis(100)), shutdown_tx)
                .await
        })
    };

    let ids = wait_for_index(out.path(), |ids| !ids.is_empty()).await;
    assert_eq!(ids, vec!["kmso", "lowa"]);

    let pool = connect_any(&sqlite_url(&db)).await.unwrap();
    insert_station(&pool, &StationRow::new("mesa", "awsxd")).await;
    pool.close().await;

    let ids = wait_for_index(out.path(), |ids| ids.iter().any(|id| id == "mesa")).await;
    assert_eq!(ids, vec!["kmso", "lowa", "mesa"]);

    let stats = stop(serve, &shutdown_tx).await.unwrap();
    assert_eq!(stats.received, 0);
}

#[tokio::test]
async fn test_serve_without_interval_writes_no_index() {
    let (_db_dir, db) = seeded_database().await;
    let out = TempDir::new().unwrap();
    let extra = "listener:\n  bind: 127.0.0.1:0\n";
    let app = Arc::new(App::connect(config(&db, out.path(), extra)).await.unwrap());

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let serve = {
        let app = app.clone();
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move { app.serve(None, shutdown_tx).await })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    stop(serve, &shutdown_tx).await.unwrap();

    assert!(index_ids(out.path()).is_none());
}
