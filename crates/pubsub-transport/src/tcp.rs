//! Plain TCP connection provider.

use tokio::net::TcpStream;

use crate::{Dialer, TransportError};

/// A [`Dialer`] that opens a fresh TCP connection to a fixed address.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    addr: String,
}

impl TcpDialer {
    /// Creates a dialer for `addr` (`host:port`). Name resolution happens on
    /// every dial, so a changed DNS record is picked up on reconnect.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// The address this dialer connects to.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self) -> Result<TcpStream, TransportError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(TransportError::DialFailed)?;
        // Frames are small and flushed one at a time.
        stream.set_nodelay(true).map_err(TransportError::DialFailed)?;
        tracing::debug!(addr = %self.addr, "tcp connection established");
        Ok(stream)
    }
}
