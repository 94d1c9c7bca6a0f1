//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::protocol::constants::*;

/// Shortest accepted broadcaster tick period
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Broadcaster tick period
    pub tick_interval: Duration,

    /// Idle ticks allowed before a heartbeat is forced
    pub heartbeat_ticks: u32,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Messages buffered per connection before new ones are skipped
    pub send_queue_capacity: usize,

    /// A single write taking longer than this counts as a failed write
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            heartbeat_ticks: DEFAULT_HEARTBEAT_TICKS,
            max_connections: 0, // Unlimited
            tcp_nodelay: true, // Status lines are tiny and latency matters
            send_queue_capacity: 16,
            write_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Keep the bind IP, change the port
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Set the broadcaster tick period (at least [`MIN_TICK_INTERVAL`])
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(MIN_TICK_INTERVAL);
        self
    }

    /// Set the idle-tick limit before a heartbeat
    pub fn heartbeat_ticks(mut self, ticks: u32) -> Self {
        self.heartbeat_ticks = ticks;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Enable or disable TCP_NODELAY on accepted sockets
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set the per-connection queue length (at least 1)
    pub fn send_queue_capacity(mut self, capacity: usize) -> Self {
        self.send_queue_capacity = capacity.max(1);
        self
    }

    /// Set the write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 11912);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.heartbeat_ticks, 10);
        assert_eq!(config.max_connections, 0);
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:11913".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.heartbeat_ticks, DEFAULT_HEARTBEAT_TICKS);
    }

    #[test]
    fn test_builder_port() {
        let config = ServerConfig::default().port(0);

        assert_eq!(config.bind_addr.port(), 0);
        assert!(config.bind_addr.ip().is_unspecified());
    }

    #[test]
    fn test_builder_send_queue_capacity_floor() {
        let config = ServerConfig::default().send_queue_capacity(0);

        assert_eq!(config.send_queue_capacity, 1);
    }

    #[test]
    fn test_builder_tick_interval_floor() {
        let config = ServerConfig::default().tick_interval(Duration::ZERO);

        assert_eq!(config.tick_interval, MIN_TICK_INTERVAL);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .tick_interval(Duration::from_millis(20))
            .heartbeat_ticks(3)
            .max_connections(8)
            .tcp_nodelay(false)
            .send_queue_capacity(4)
            .write_timeout(Duration::from_millis(500));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.tick_interval, Duration::from_millis(20));
        assert_eq!(config.heartbeat_ticks, 3);
        assert_eq!(config.max_connections, 8);
        assert!(!config.tcp_nodelay);
        assert_eq!(config.send_queue_capacity, 4);
        assert_eq!(config.write_timeout, Duration::from_millis(500));
    }
}
