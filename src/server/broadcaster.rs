//! Periodic status broadcaster
//!
//! Runs on its own thread. Every tick it consumes the status store and, when
//! the store is dirty or the idle limit is exceeded, formats one line and
//! hands it to the reactor for every registered connection.
//!
//! The tick timer and the shutdown channel race in a `select!`, so shutdown
//! wakes the loop immediately instead of waiting out the tick.

use std::io;
use std::sync::{mpsc as std_mpsc, Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::error::{Error, Result};
use crate::protocol::StatusLine;
use crate::registry::ConnectionRegistry;
use crate::server::config::{ServerConfig, MIN_TICK_INTERVAL};
use crate::server::reactor::ReactorHandle;
use crate::stats::{BroadcastKind, ServerStats};
use crate::status::StatusStore;

/// Change-or-heartbeat decision, one call per tick
#[derive(Debug, Clone)]
pub struct BroadcastPolicy {
    heartbeat_ticks: u32,
    idle_ticks: u32,
}

impl BroadcastPolicy {
    /// A heartbeat fires on the tick where idle ticks exceed `heartbeat_ticks`
    pub fn new(heartbeat_ticks: u32) -> Self {
        Self {
            heartbeat_ticks,
            idle_ticks: 0,
        }
    }

    /// Advance one tick, returning the broadcast due on it, if any
    pub fn tick(&mut self, dirty: bool) -> Option<BroadcastKind> {
        self.idle_ticks = self.idle_ticks.saturating_add(1);

        let kind = if dirty {
            BroadcastKind::Change
        } else if self.idle_ticks > self.heartbeat_ticks {
            BroadcastKind::Heartbeat
        } else {
            return None;
        };

        self.idle_ticks = 0;
        Some(kind)
    }

    /// Ticks since the last broadcast
    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks
    }
}

/// One-way shutdown flag shared by the server and the broadcaster
///
/// The flag is set under the same lock a fan-out holds, so once
/// [`trigger`](Self::trigger) returns no further write is submitted.
#[derive(Debug)]
pub struct ShutdownSignal {
    stopped: Mutex<bool>,
    wake: watch::Sender<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (wake, _) = watch::channel(false);
        Self {
            stopped: Mutex::new(false),
            wake,
        }
    }

    /// Set the flag, waiting for an in-flight fan-out, and wake the broadcaster
    pub fn trigger(&self) {
        *self.lock() = true;
        self.wake.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.lock()
    }

    /// Hold off `trigger` for the guard's lifetime; `None` once triggered
    fn fanout_guard(&self) -> Option<MutexGuard<'_, bool>> {
        let guard = self.lock();
        if *guard {
            None
        } else {
            Some(guard)
        }
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.wake.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.stopped.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Running broadcaster thread
pub struct Broadcaster {
    thread: Option<JoinHandle<()>>,
}

impl Broadcaster {
    /// Spawn the broadcaster; it runs until `shutdown` is triggered
    ///
    /// The runtime is built on the new thread, which has signalled readiness
    /// by the time this returns.
    pub fn start(
        config: &ServerConfig,
        store: Arc<StatusStore>,
        registry: Arc<ConnectionRegistry>,
        reactor: ReactorHandle,
        stats: Arc<ServerStats>,
        shutdown: Arc<ShutdownSignal>,
    ) -> Result<Self> {
        let broadcast_loop = BroadcastLoop {
            store,
            registry,
            reactor,
            stats,
            shutdown,
            policy: BroadcastPolicy::new(config.heartbeat_ticks),
            tick_interval: config.tick_interval.max(MIN_TICK_INTERVAL),
        };

        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<io::Result<()>>(1);

        let thread = thread::Builder::new()
            .name("status-broadcaster".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                runtime.block_on(broadcast_loop.run());
                tracing::debug!("Broadcaster thread exiting");
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e.into())
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::Runtime("broadcaster thread exited during startup".to_string()))
            }
        }
    }

    /// Whether the thread has not been joined yet
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Wait for the thread to exit
    ///
    /// The caller must have signalled shutdown first, or this waits forever.
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Broadcaster thread panicked");
            }
        }
    }
}

struct BroadcastLoop {
    store: Arc<StatusStore>,
    registry: Arc<ConnectionRegistry>,
    reactor: ReactorHandle,
    stats: Arc<ServerStats>,
    shutdown: Arc<ShutdownSignal>,
    policy: BroadcastPolicy,
    tick_interval: Duration,
}

impl BroadcastLoop {
    async fn run(mut self) {
        let mut wake = self.shutdown.subscribe();
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let stop = tokio::select! {
                biased;
                changed = wake.changed() => changed.is_err() || *wake.borrow(),
                _ = ticker.tick() => self.shutdown.is_triggered(),
            };
            if stop {
                break;
            }

            self.on_tick();
        }

        tracing::debug!(idle_ticks = self.policy.idle_ticks(), "Broadcaster stopped");
    }

    fn on_tick(&mut self) {
        let (status, dirty) = self.store.consume();
        let Some(kind) = self.policy.tick(dirty) else {
            return;
        };

        let line = StatusLine::now(&status);
        let message = line.encode();
        let connections = self.registry.snapshot();

        // Writes are non-blocking hand-offs, so holding the guard across them is cheap.
        let Some(_fanout) = self.shutdown.fanout_guard() else {
            return;
        };

        tracing::trace!(
            kind = ?kind,
            connections = connections.len(),
            line = %line,
            "Broadcasting status"
        );

        for connection in &connections {
            self.reactor.write(connection, message.clone());
        }

        self.stats.record_broadcast(kind);
    }
}
