//! # status-stream
//!
//! Push-only TCP broadcaster for a live telemetry snapshot (odometer and
//! position). An application feeds the latest reading as often as it likes; the
//! server sends a one-line status record to every connected client whenever the
//! reading changed meaningfully, and a heartbeat roughly once a second otherwise.
//!
//! ```text
//! pc=<odometer>;<timestamp_ms>;<longitude>;<latitude>|\n
//! ```
//!
//! Clients never send anything. A client whose socket fails is dropped on the
//! spot without affecting anyone else.
//!
//! ## Example
//!
//! ```no_run
//! use status_stream::{ServerConfig, Status, StatusServer};
//!
//! # fn main() -> status_stream::error::Result<()> {
//! let mut server = StatusServer::start(ServerConfig::default().port(11912))?;
//!
//! let updater = server.updater();
//! std::thread::spawn(move || {
//!     let mut odometer = 0.0;
//!     loop {
//!         odometer += 0.5;
//!         updater.update(Status::new(odometer, 24.9384, 60.1699));
//!         std::thread::sleep(std::time::Duration::from_millis(20));
//!     }
//! });
//!
//! std::thread::sleep(std::time::Duration::from_secs(10));
//! server.stop();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;
pub mod status;

pub use error::{Error, ProtocolError, Result};
pub use protocol::StatusLine;
pub use server::{ServerConfig, StatusServer, StatusUpdater};
pub use status::Status;
