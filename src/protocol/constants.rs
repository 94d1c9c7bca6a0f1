//! Protocol constants

/// Default TCP port the status server listens on
pub const DEFAULT_PORT: u16 = 11912;

/// Broadcaster tick period in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Idle ticks tolerated before a heartbeat is forced
///
/// A heartbeat goes out on the tick where the idle count first exceeds this,
/// so at least once every `DEFAULT_HEARTBEAT_TICKS + 1` ticks.
pub const DEFAULT_HEARTBEAT_TICKS: u32 = 10;

/// Every status line starts with this
pub const LINE_PREFIX: &str = "pc=";

/// Separates the fields of a status line
pub const FIELD_SEPARATOR: char = ';';

/// Closes the record, just before the newline
pub const LINE_TERMINATOR: char = '|';

/// Significant digits used for longitude and latitude
pub const COORDINATE_PRECISION: usize = 6;

/// Upper bound on one encoded line, used to size buffers
pub const MAX_LINE_LEN: usize = 128;
