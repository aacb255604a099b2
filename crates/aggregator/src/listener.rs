//! TCP notification listener.
//!
//! Acquisition daemons announce fresh samples by connecting, sending one
//! line with the station id, and closing. Each known station is processed to
//! completion before the next connection is accepted.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use winddb_common::{StationId, WindDbError, WindDbResult};

use crate::pipeline::{unix_now, Pipeline, StationOutcome};
use crate::station::Station;

/// Longest notification line accepted, in bytes.
pub const MAX_LINE_LEN: u64 = 256;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Station id carried by a notification line, if well formed.
pub fn parse_notification(line: &str) -> Option<StationId> {
    let trimmed = line.trim();
    match StationId::new(trimmed) {
        Ok(id) => Some(id),
        Err(e) => {
            debug!(error = %e, "Ignoring malformed notification");
            None
        }
    }
}

/// Counters for a listener session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub received: u64,
    pub processed: u64,
    pub ignored: u64,
}

pub struct Listener {
    listener: TcpListener,
    stations: BTreeMap<StationId, Station>,
    pipeline: Arc<Pipeline>,
    read_timeout: Duration,
}

impl Listener {
    /// Bind `addr` and serve notifications for `stations`.
    pub async fn bind(
        addr: SocketAddr,
        stations: Vec<Station>,
        pipeline: Arc<Pipeline>,
    ) -> WindDbResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| WindDbError::Io(format!("Failed to bind {}: {}", addr, e)))?;

        let stations = stations
            .into_iter()
            .map(|station| (station.id().clone(), station))
            .collect();

        Ok(Self {
            listener,
            stations,
            pipeline,
            read_timeout: READ_TIMEOUT,
        })
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> WindDbResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept notifications until `shutdown` fires. The socket is released
    /// when this returns.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> WindDbResult<ListenerStats> {
        let mut stats = ListenerStats::default();
        info!(
            addr = %self.local_addr()?,
            stations = self.stations.len(),
            "Notification listener started"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down notification listener");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        stats.received += 1;
                        if self.handle(stream, peer).await {
                            stats.processed += 1;
                        } else {
                            stats.ignored += 1;
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to accept connection"),
                }
            }
        }

        info!(
            received = stats.received,
            processed = stats.processed,
            ignored = stats.ignored,
            "Notification listener stopped"
        );
        Ok(stats)
    }

    /// Returns true when a pipeline run was started for the notification.
    async fn handle(&self, stream: TcpStream, peer: SocketAddr) -> bool {
        let mut line = String::new();
        let mut reader = BufReader::new(stream).take(MAX_LINE_LEN);

        match tokio::time::timeout(self.read_timeout, reader.read_line(&mut line)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                debug!(peer = %peer, error = %e, "Failed to read notification");
                return false;
            }
            Err(_) => {
                debug!(peer = %peer, "Notification read timed out");
                return false;
            }
        }
        // Close the connection before running the pipeline.
        drop(reader);

        let Some(id) = parse_notification(&line) else {
            return false;
        };
        let Some(station) = self.stations.get(&id) else {
            debug!(peer = %peer, station = %id, "Notification for unknown station");
            return false;
        };

        info!(peer = %peer, station = %id, "Notification received");
        match self.pipeline.run_station(station, unix_now()).await {
            StationOutcome::Written { samples, .. } => {
                debug!(station = %id, samples, "Notification processed");
            }
            outcome => debug!(station = %id, ?outcome, "Notification produced no documents"),
        }
        true
    }
}
