//! Connection registry implementation

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::entry::{Connection, ConnectionId};

/// Thread-safe set of live client connections
///
/// The reactor adds on accept and removes on write failure; the broadcaster only
/// takes snapshots. All network work happens on a snapshot, never under the lock.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection
    ///
    /// No-op if the identity is already present, or if the connection's writer
    /// has already terminated. The latter is what keeps a removed connection from
    /// coming back through a stale handle. Returns whether it was inserted.
    pub fn add(&self, connection: Connection) -> bool {
        if connection.is_closed() {
            tracing::debug!(connection = %connection.id(), "Ignoring add of closed connection");
            return false;
        }

        let id = connection.id();
        let peer = connection.peer_addr();
        let total = {
            let mut connections = self.lock();
            if connections.contains_key(&id) {
                return false;
            }
            connections.insert(id, connection);
            connections.len()
        };

        tracing::debug!(connection = %id, peer = %peer, total = total, "Connection registered");
        true
    }

    /// Remove a connection by identity
    ///
    /// Removing an absent identity is a no-op. Returns whether anything was removed.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let (removed, total) = {
            let mut connections = self.lock();
            let removed = connections.remove(&id);
            (removed, connections.len())
        };

        match removed {
            Some(_) => {
                tracing::debug!(connection = %id, total = total, "Connection removed");
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of the member set
    pub fn snapshot(&self) -> Vec<Connection> {
        self.lock().values().cloned().collect()
    }

    /// Whether `id` is currently registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no connections are registered
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every connection, returning how many were registered
    pub fn clear(&self) -> usize {
        let drained: Vec<Connection> = self.lock().drain().map(|(_, c)| c).collect();
        drained.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Connection>> {
        // Map operations do not panic midway, so a poisoned map is still consistent.
        self.connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    use bytes::Bytes;
    use tokio::sync::mpsc;

    use super::*;

    fn make_connection(id: u64) -> (Connection, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(4);
        let peer = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 50000 + id as u16);
        (Connection::new(ConnectionId::new(id), peer, tx), rx)
    }

    #[test]
    fn test_add_and_snapshot() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = make_connection(1);
        let (b, _rx_b) = make_connection(2);

        assert!(registry.add(a.clone()));
        assert!(registry.add(b.clone()));

        let mut ids: Vec<_> = registry.snapshot().iter().map(|c| c.id()).collect();
        ids.sort();
        assert_eq!(ids, vec![a.id(), b.id()]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_add_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (a, _rx) = make_connection(1);

        assert!(registry.add(a.clone()));
        assert!(!registry.add(a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (a, _rx) = make_connection(1);
        registry.add(a.clone());

        assert!(registry.remove(a.id()));
        assert!(!registry.remove(a.id()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let registry = ConnectionRegistry::new();
        let (a, _rx) = make_connection(1);
        registry.add(a);

        assert!(!registry.remove(ConnectionId::new(99)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_removed_connection_cannot_reappear() {
        let registry = ConnectionRegistry::new();
        let (a, rx) = make_connection(1);
        registry.add(a.clone());

        // Writer goes away first, then prunes itself
        drop(rx);
        registry.remove(a.id());

        assert!(!registry.add(a.clone()));
        assert!(!registry.contains(a.id()));
    }

    #[test]
    fn test_snapshot_is_independent() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = make_connection(1);
        let (b, _rx_b) = make_connection(2);
        registry.add(a.clone());

        let snapshot = registry.snapshot();
        registry.add(b);
        registry.remove(a.id());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id(), a.id());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clear() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = make_connection(1);
        let (b, _rx_b) = make_connection(2);
        registry.add(a);
        registry.add(b);

        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_add_remove() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (conn, _rx) = make_connection(1);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let conn = conn.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        if i % 2 == 0 {
                            registry.add(conn.clone());
                        } else {
                            registry.remove(conn.id());
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // Whatever the interleaving, the identity is present at most once
        assert!(registry.len() <= 1);
        assert_eq!(
            registry.snapshot().iter().filter(|c| c.id() == conn.id()).count(),
            registry.len()
        );
    }
}
