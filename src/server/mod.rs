//! Status server implementation
//!
//! ```text
//!  producer ──update_status──► StatusStore
//!                                  │ consume() every tick
//!                                  ▼
//!                             Broadcaster ──snapshot()──► ConnectionRegistry
//!                                  │                          ▲      ▲
//!                                  │ write(conn, line) ×N     │ add  │ remove
//!                                  ▼                          │      │
//!                              Reactor ──── accept loop ──────┘      │
//!                                  └──── writer tasks ───────────────┘
//! ```

pub mod broadcaster;
pub mod config;
pub(crate) mod connection;
pub mod reactor;
pub mod status_server;

pub use broadcaster::{BroadcastPolicy, Broadcaster, ShutdownSignal};
pub use config::ServerConfig;
pub use reactor::{Reactor, ReactorHandle};
pub use status_server::{StatusServer, StatusUpdater};
