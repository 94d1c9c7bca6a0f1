//! Status server orchestration
//!
//! Wires the store, registry, reactor and broadcaster together and owns their
//! lifecycles. Shutdown order matters: the broadcaster is joined before the
//! reactor is stopped, so no write is ever submitted to a halted reactor.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::Result;
use crate::registry::ConnectionRegistry;
use crate::server::broadcaster::{Broadcaster, ShutdownSignal};
use crate::server::config::ServerConfig;
use crate::server::reactor::Reactor;
use crate::stats::{ServerStats, StatsSnapshot};
use crate::status::{Status, StatusStore};

/// Push-only telemetry status server
///
/// # Example
/// ```no_run
/// use status_stream::{ServerConfig, Status, StatusServer};
///
/// # fn main() -> status_stream::error::Result<()> {
/// let mut server = StatusServer::start(ServerConfig::default())?;
///
/// // From the application's update loop
/// server.update_status(Status::new(1523.6, 24.9384, 60.1699));
///
/// server.stop();
/// # Ok(())
/// # }
/// ```
pub struct StatusServer {
    config: ServerConfig,
    local_addr: SocketAddr,
    store: Arc<StatusStore>,
    registry: Arc<ConnectionRegistry>,
    stats: Arc<ServerStats>,
    shutdown: Arc<ShutdownSignal>,
    broadcaster: Broadcaster,
    reactor: Reactor,
}

impl StatusServer {
    /// Bind, then start the reactor and the broadcaster
    ///
    /// Both are running when this returns.
    pub fn start(config: ServerConfig) -> Result<Self> {
        let listener = std::net::TcpListener::bind(config.bind_addr)?;

        let store = Arc::new(StatusStore::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let stats = Arc::new(ServerStats::new());

        let reactor = Reactor::start(listener, &config, Arc::clone(&registry), Arc::clone(&stats))?;
        let local_addr = reactor.local_addr();

        let shutdown = Arc::new(ShutdownSignal::new());
        // On failure the reactor is stopped by its Drop impl.
        let broadcaster = Broadcaster::start(
            &config,
            Arc::clone(&store),
            Arc::clone(&registry),
            reactor.handle(),
            Arc::clone(&stats),
            Arc::clone(&shutdown),
        )?;

        tracing::info!(addr = %local_addr, "Status server listening");

        Ok(Self {
            config,
            local_addr,
            store,
            registry,
            stats,
            shutdown,
            broadcaster,
            reactor,
        })
    }

    /// Start with default settings on `port`
    pub fn bind(port: u16) -> Result<Self> {
        Self::start(ServerConfig::default().port(port))
    }

    /// Submit a fresh status; never blocks beyond a short lock
    pub fn update_status(&self, status: Status) {
        self.store.update(status);
    }

    /// Cloneable producer handle for other threads
    pub fn updater(&self) -> StatusUpdater {
        StatusUpdater {
            store: Arc::clone(&self.store),
        }
    }

    /// Latest submitted status
    pub fn current_status(&self) -> Status {
        self.store.current()
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of registered client connections
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Counter snapshot
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Configuration the server was started with
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Whether `stop` has not run yet
    pub fn is_running(&self) -> bool {
        self.reactor.is_running()
    }

    /// Shut down and wait for both threads
    ///
    /// Remaining connections are closed. Calling it again is a no-op.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }

        // Returns only once no fan-out is in flight
        self.shutdown.trigger();
        self.broadcaster.join();
        self.reactor.stop();

        let abandoned = self.registry.clear();
        tracing::info!(
            addr = %self.local_addr,
            abandoned_connections = abandoned,
            "Status server stopped"
        );
    }
}

impl Drop for StatusServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Producer-side handle that only submits status updates
#[derive(Debug, Clone)]
pub struct StatusUpdater {
    store: Arc<StatusStore>,
}

impl StatusUpdater {
    /// Submit a fresh status
    pub fn update(&self, status: Status) {
        self.store.update(status);
    }
}
