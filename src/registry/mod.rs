//! Registry of live client connections
//!
//! The registry is the only owner of connection handles. The reactor adds a
//! handle when it accepts a socket and removes it when a write fails; the
//! broadcaster works from snapshots.
//!
//! ```text
//!                    Arc<ConnectionRegistry>
//!               ┌─────────────────────────────┐
//!               │ Mutex<HashMap<ConnectionId, │
//!               │   Connection { tx }>>       │
//!               └──────┬───────────────┬──────┘
//!          add/remove  │               │  snapshot()
//!                      │               ▼
//!                 [Reactor]       [Broadcaster]
//!                      ▲               │
//!                      │               │ try_send(Bytes)
//!                      │               ▼
//!               writer task ◄──── mpsc queue ──► TCP
//! ```
//!
//! The broadcast line is a `bytes::Bytes`, so every queue shares one allocation.

pub mod entry;
pub mod store;

pub use entry::{Connection, ConnectionId, SendOutcome};
pub use store::ConnectionRegistry;
