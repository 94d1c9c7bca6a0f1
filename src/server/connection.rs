//! Per-connection writer task
//!
//! Each accepted socket is owned by exactly one writer task. The task drains the
//! connection's queue into the socket and, on the first failed or timed-out
//! write, closes the queue and prunes the connection from the registry. Bytes
//! sent by the client are never read.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::stats::ServerStats;

pub(crate) struct ConnectionWriter {
    id: ConnectionId,
    peer_addr: SocketAddr,
    socket: TcpStream,
    rx: mpsc::Receiver<Bytes>,
    registry: Arc<ConnectionRegistry>,
    stats: Arc<ServerStats>,
    write_timeout: Duration,
}

impl ConnectionWriter {
    pub(crate) fn new(
        id: ConnectionId,
        peer_addr: SocketAddr,
        socket: TcpStream,
        rx: mpsc::Receiver<Bytes>,
        registry: Arc<ConnectionRegistry>,
        stats: Arc<ServerStats>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            id,
            peer_addr,
            socket,
            rx,
            registry,
            stats,
            write_timeout,
        }
    }

    /// Write queued messages until the queue closes or a write fails
    pub(crate) async fn run(mut self) {
        let failure = loop {
            let Some(message) = self.rx.recv().await else {
                // Every handle is gone: the registry let go of this connection.
                break None;
            };

            match tokio::time::timeout(self.write_timeout, self.socket.write_all(&message)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => break Some(e.to_string()),
                Err(_) => break Some("write timed out".to_string()),
            }
        };

        // Close before removing so a stale handle can never be re-registered.
        self.rx.close();

        match failure {
            Some(reason) => {
                tracing::debug!(
                    connection = %self.id,
                    peer = %self.peer_addr,
                    error = %reason,
                    "Write failed, dropping connection"
                );
                if self.registry.remove(self.id) {
                    self.stats.record_prune();
                }
            }
            None => {
                tracing::debug!(connection = %self.id, peer = %self.peer_addr, "Connection closed");
            }
        }
    }
}
