//! Line-by-line status subscriber

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::Result;
use crate::protocol::StatusLine;

/// Async client receiving decoded status lines
///
/// # Example
/// ```no_run
/// use status_stream::client::StatusSubscriber;
///
/// # async fn example() -> status_stream::error::Result<()> {
/// let mut subscriber = StatusSubscriber::connect("127.0.0.1:11912").await?;
/// while let Some(line) = subscriber.next_line().await? {
///     println!("odometer={} at {}", line.odometer, line.timestamp_ms);
/// }
/// # Ok(())
/// # }
/// ```
pub struct StatusSubscriber {
    reader: BufReader<TcpStream>,
    peer_addr: SocketAddr,
    buf: String,
}

impl StatusSubscriber {
    /// Connect to a status server
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let peer_addr = stream.peer_addr()?;

        tracing::debug!(server = %peer_addr, "Subscribed to status stream");

        Ok(Self {
            reader: BufReader::new(stream),
            peer_addr,
            buf: String::with_capacity(128),
        })
    }

    /// Server address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Next decoded line, or `None` once the server closes the connection
    ///
    /// Cancel-safe: a partially received line is kept and completed by the next call.
    pub async fn next_line(&mut self) -> Result<Option<StatusLine>> {
        let n = self.reader.read_line(&mut self.buf).await?;
        if n == 0 && self.buf.is_empty() {
            return Ok(None);
        }

        let parsed = StatusLine::parse(&self.buf);
        self.buf.clear();
        Ok(Some(parsed?))
    }
}
