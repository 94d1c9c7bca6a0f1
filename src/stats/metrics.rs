//! Statistics and metrics for the status server

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Why a broadcast went out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastKind {
    /// Status changed beyond the thresholds
    Change,
    /// Forced by the idle-tick limit
    Heartbeat,
}

/// Server-wide counters
///
/// Shared by the reactor and the broadcaster; every counter is a relaxed atomic.
#[derive(Debug)]
pub struct ServerStats {
    started_at: Instant,
    connections_accepted: AtomicU64,
    connections_rejected: AtomicU64,
    connections_pruned: AtomicU64,
    broadcasts: AtomicU64,
    heartbeats: AtomicU64,
    messages_dropped: AtomicU64,
}

impl ServerStats {
    /// Create zeroed counters, starting the uptime clock now
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connections_accepted: AtomicU64::new(0),
            connections_rejected: AtomicU64::new(0),
            connections_pruned: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            heartbeats: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
        }
    }

    /// Count an admitted connection
    pub fn record_accept(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a connection closed at the limit
    pub fn record_reject(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a connection removed after a failed write
    pub fn record_prune(&self) {
        self.connections_pruned.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a message skipped on a full queue
    pub fn record_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one broadcast cycle
    pub fn record_broadcast(&self, kind: BroadcastKind) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        if kind == BroadcastKind::Heartbeat {
            self.heartbeats.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Copy the counters out
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            connections_pruned: self.connections_pruned.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            heartbeats: self.heartbeats.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`ServerStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    /// Total connections ever admitted
    pub connections_accepted: u64,
    /// Connections closed immediately because of the connection limit
    pub connections_rejected: u64,
    /// Connections removed after a failed write
    pub connections_pruned: u64,
    /// Broadcast cycles, heartbeats included
    pub broadcasts: u64,
    /// Broadcast cycles forced by the idle-tick limit
    pub heartbeats: u64,
    /// Per-connection messages skipped because the peer's queue was full
    pub messages_dropped: u64,
    /// Time since the server started
    pub uptime: Duration,
}

impl StatsSnapshot {
    /// Broadcasts triggered by a status change
    pub fn change_broadcasts(&self) -> u64 {
        self.broadcasts.saturating_sub(self.heartbeats)
    }
}
