//! Connection handle stored in the registry
//!
//! A [`Connection`] is not the socket. The socket lives inside the connection's
//! writer task on the reactor; this handle is the sending end of that task's
//! queue plus an identity. Equality and hashing use the identity only.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Opaque connection identity, allocated once per accepted socket and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Numeric value, for logging
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of handing a message to a connection's writer queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Message queued for writing
    Queued,
    /// Queue full; this message is skipped for this connection
    Dropped,
    /// Writer has terminated; the connection is dead
    Closed,
}

/// Handle to one live client connection
#[derive(Clone)]
pub struct Connection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    tx: mpsc::Sender<Bytes>,
}

impl Connection {
    pub(crate) fn new(id: ConnectionId, peer_addr: SocketAddr, tx: mpsc::Sender<Bytes>) -> Self {
        Self { id, peer_addr, tx }
    }

    /// Connection identity
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote address of the client
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Whether the writer task behind this handle has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queue a message without waiting
    pub(crate) fn try_send(&self, message: Bytes) -> SendOutcome {
        match self.tx.try_send(message) {
            Ok(()) => SendOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => SendOutcome::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Connection {}

impl Hash for Connection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    fn peer() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000)
    }

    #[test]
    fn test_identity_equality() {
        let (tx_a, _rx_a) = mpsc::channel(1);
        let (tx_b, _rx_b) = mpsc::channel(1);

        let a = Connection::new(ConnectionId::new(1), peer(), tx_a.clone());
        let a_again = Connection::new(ConnectionId::new(1), peer(), tx_b);
        let b = Connection::new(ConnectionId::new(2), peer(), tx_a);

        assert_eq!(a, a_again);
        assert_ne!(a, b);
    }

    #[test]
    fn test_try_send_outcomes() {
        let (tx, mut rx) = mpsc::channel(1);
        let conn = Connection::new(ConnectionId::new(7), peer(), tx);

        assert_eq!(conn.try_send(Bytes::from_static(b"a")), SendOutcome::Queued);
        assert_eq!(conn.try_send(Bytes::from_static(b"b")), SendOutcome::Dropped);

        assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"a"));
        drop(rx);

        assert!(conn.is_closed());
        assert_eq!(conn.try_send(Bytes::from_static(b"c")), SendOutcome::Closed);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ConnectionId::new(42).to_string(), "#42");
        assert_eq!(ConnectionId::new(42).as_u64(), 42);
    }
}
