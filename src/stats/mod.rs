//! Server statistics

pub mod metrics;

pub use metrics::{BroadcastKind, ServerStats, StatsSnapshot};
