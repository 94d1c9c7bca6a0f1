//! Status stream client
//!
//! Connects to a status server and decodes the line stream. Used by the
//! watcher demo and by the integration tests; any plain TCP client works too.

pub mod subscriber;

pub use subscriber::StatusSubscriber;
