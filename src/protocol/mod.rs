//! Wire protocol
//!
//! The server speaks a single plaintext record type, broadcast identically to
//! every client. There is no handshake and nothing is ever read from clients.

pub mod constants;
pub mod status_line;

pub use status_line::{format_significant, unix_millis, StatusLine};
