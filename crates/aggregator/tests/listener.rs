mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use aggregator::{
    unix_now, DocumentAddress, DocumentKind, Listener, ListenerStats, MemoryWriter, Pipeline,
    PipelineSettings,
};
use common::{series, station, station_id, FakeSource};
use winddb_common::capability::WIND_SPEED_MAX;

/// Send one notification and wait for the listener to close the connection.
///
/// Oversized payloads may be reset by the listener, so errors after the
/// write are not fatal.
async fn notify(addr: SocketAddr, payload: &[u8]) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(payload).await.unwrap();
    stream.shutdown().await.ok();
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.ok();
}

async fn start() -> (
    SocketAddr,
    Arc<MemoryWriter>,
    Arc<FakeSource>,
    broadcast::Sender<()>,
    tokio::task::JoinHandle<ListenerStats>,
) {
    let source = Arc::new(FakeSource::new("awsxd", [WIND_SPEED_MAX]));
    source
        .set_samples("kmso", series(&[(WIND_SPEED_MAX, unix_now() - 60, 5.0)]))
        .await;
    let kmso = station("kmso", source.clone()).await;

    let writer = Arc::new(MemoryWriter::new());
    let pipeline = Arc::new(Pipeline::new(PipelineSettings::default(), writer.clone()));
    let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), vec![kmso], pipeline)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move { listener.run(shutdown_rx).await.unwrap() });

    (addr, writer, source, shutdown_tx, handle)
}

#[tokio::test]
async fn test_known_station_processed() {
    let (addr, writer, _source, shutdown, handle) = start().await;

    notify(addr, b"kmso\n").await;
    shutdown.send(()).unwrap();
    let stats = handle.await.unwrap();

    assert_eq!(
        stats,
        ListenerStats {
            received: 1,
            processed: 1,
            ignored: 0,
        }
    );
    let address = DocumentAddress::Capability {
        station: station_id("kmso"),
        capability: WIND_SPEED_MAX,
        kind: DocumentKind::Latest,
    };
    assert!(writer.get(&address).await.is_some());
}

#[tokio::test]
async fn test_unknown_station_ignored_and_listener_keeps_accepting() {
    let (addr, writer, source, shutdown, handle) = start().await;

    notify(addr, b"ZZZ\n").await;
    assert!(writer.is_empty().await);
    assert_eq!(source.sample_calls.load(std::sync::atomic::Ordering::SeqCst), 0);

    notify(addr, b"kmso").await;
    shutdown.send(()).unwrap();
    let stats = handle.await.unwrap();

    assert_eq!(stats.received, 2);
    assert_eq!(stats.ignored, 1);
    assert_eq!(stats.processed, 1);
    assert_eq!(source.sample_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_notifications_ignored() {
    let (addr, writer, _source, shutdown, handle) = start().await;

    notify(addr, b"kmso'; DROP TABLE awsx; --\n").await;
    notify(addr, b"\n").await;
    notify(addr, &[b'a'; 1024]).await;
    shutdown.send(()).unwrap();
    let stats = handle.await.unwrap();

    assert_eq!(stats.received, 3);
    assert_eq!(stats.ignored, 3);
    assert!(writer.is_empty().await);
}

#[tokio::test]
async fn test_shutdown_releases_socket() {
    let (addr, _writer, _source, shutdown, handle) = start().await;

    shutdown.send(()).unwrap();
    handle.await.unwrap();

    // The port can be bound again once the listener has stopped.
    let rebound = tokio::net::TcpListener::bind(addr).await;
    assert!(rebound.is_ok());
}
