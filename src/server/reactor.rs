//! Network reactor
//!
//! Owns the listening socket and a single-threaded Tokio runtime on a dedicated
//! thread. The runtime drives the accept loop and one writer task per client.
//!
//! ```text
//!  Listening ──accept ok──► Listening        (one outstanding accept at a time)
//!  Listening ──accept err / stop──► Stopped  (terminal)
//! ```
//!
//! Writes are submitted from other threads through a [`ReactorHandle`]. A write
//! is a non-blocking hand-off to the connection's queue; its failure is handled
//! here, not by the caller.

use std::io;
use std::net::SocketAddr;
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::registry::{Connection, ConnectionId, ConnectionRegistry, SendOutcome};
use crate::server::config::ServerConfig;
use crate::server::connection::ConnectionWriter;
use crate::stats::ServerStats;

/// Running network reactor
pub struct Reactor {
    local_addr: SocketAddr,
    handle: ReactorHandle,
    stop_tx: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Reactor {
    /// Start the reactor on an already bound listener
    ///
    /// The listener is bound and the reactor thread is running when this returns.
    pub fn start(
        listener: std::net::TcpListener,
        config: &ServerConfig,
        registry: Arc<ConnectionRegistry>,
        stats: Arc<ServerStats>,
    ) -> Result<Self> {
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let acceptor = Acceptor {
            registry: Arc::clone(&registry),
            stats: Arc::clone(&stats),
            max_connections: config.max_connections,
            tcp_nodelay: config.tcp_nodelay,
            send_queue_capacity: config.send_queue_capacity.max(1),
            write_timeout: config.write_timeout,
            next_connection_id: 1,
        };

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<io::Result<()>>(1);

        // The runtime lives and dies on the reactor thread, never inside the caller's.
        let thread = thread::Builder::new()
            .name("status-reactor".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Registering the socket needs the runtime's I/O driver in scope.
                let listener = {
                    let _guard = runtime.enter();
                    TcpListener::from_std(listener)
                };
                let listener = match listener {
                    Ok(listener) => listener,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                runtime.block_on(async move {
                    let accept_task = tokio::spawn(acceptor.run(listener));
                    // A dropped sender means the owner is gone; stop as well.
                    let _ = stop_rx.await;
                    accept_task.abort();
                });
                // Dropping the runtime abandons every writer task and closes its socket.
                drop(runtime);
                tracing::debug!("Reactor thread exiting");
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e.into());
            }
            Err(_) => {
                let _ = thread.join();
                return Err(Error::Runtime("reactor thread exited during startup".to_string()));
            }
        }

        tracing::debug!(addr = %local_addr, "Reactor started");

        Ok(Self {
            local_addr,
            handle: ReactorHandle::new(registry, stats),
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for submitting writes from other threads
    pub fn handle(&self) -> ReactorHandle {
        self.handle.clone()
    }

    /// Whether `stop` has not been called yet
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Halt the runtime and wait for its thread
    ///
    /// Outstanding accepts and writes are abandoned. Call only once nothing will
    /// submit further writes. Calling it again is a no-op.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Reactor thread panicked");
            }
            tracing::debug!(addr = %self.local_addr, "Reactor stopped");
        }
    }
}

impl Drop for Reactor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cloneable write-submission side of the reactor
#[derive(Clone)]
pub struct ReactorHandle {
    registry: Arc<ConnectionRegistry>,
    stats: Arc<ServerStats>,
}

impl ReactorHandle {
    pub(crate) fn new(registry: Arc<ConnectionRegistry>, stats: Arc<ServerStats>) -> Self {
        Self { registry, stats }
    }

    /// Queue `message` for `connection` without blocking
    ///
    /// A connection whose writer has already gone is removed from the registry.
    /// A full queue skips this message for that connection only.
    pub fn write(&self, connection: &Connection, message: Bytes) -> SendOutcome {
        let outcome = connection.try_send(message);

        match outcome {
            SendOutcome::Queued => {}
            SendOutcome::Dropped => {
                self.stats.record_dropped();
                tracing::trace!(connection = %connection.id(), "Send queue full, message skipped");
            }
            SendOutcome::Closed => {
                if self.registry.remove(connection.id()) {
                    self.stats.record_prune();
                }
            }
        }

        outcome
    }
}

struct Acceptor {
    registry: Arc<ConnectionRegistry>,
    stats: Arc<ServerStats>,
    max_connections: usize,
    tcp_nodelay: bool,
    send_queue_capacity: usize,
    write_timeout: Duration,
    next_connection_id: u64,
}

impl Acceptor {
    async fn run(mut self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => self.admit(socket, peer_addr),
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed, no longer admitting clients");
                    return;
                }
            }
        }
    }

    fn admit(&mut self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        if self.max_connections > 0 && self.registry.len() >= self.max_connections {
            tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
            self.stats.record_reject();
            return;
        }

        if self.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(peer = %peer_addr, error = %e, "Failed to configure socket");
                return;
            }
        }

        let id = ConnectionId::new(self.next_connection_id);
        self.next_connection_id += 1;

        let (tx, rx) = mpsc::channel(self.send_queue_capacity);
        let writer = ConnectionWriter::new(
            id,
            peer_addr,
            socket,
            rx,
            Arc::clone(&self.registry),
            Arc::clone(&self.stats),
            self.write_timeout,
        );
        tokio::spawn(writer.run());

        self.registry.add(Connection::new(id, peer_addr, tx));
        self.stats.record_accept();

        tracing::debug!(connection = %id, peer = %peer_addr, "New connection");
    }
}
