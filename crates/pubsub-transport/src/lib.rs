//! Connection providers for the pubsub client.
//!
//! The client never opens sockets itself. It asks a [`Dialer`] for a
//! ready-to-use byte stream whenever it needs a (new) connection, so TCP,
//! TLS, proxies, or in-memory test streams all plug in the same way.
//!
//! # Feature Flags
//!
//! - `tcp` (default): [`TcpDialer`] over `tokio::net::TcpStream`

mod error;
#[cfg(feature = "tcp")]
mod tcp;

pub use error::TransportError;
#[cfg(feature = "tcp")]
pub use tcp::TcpDialer;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncWrite};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of one connection generation, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Produces live, already-connected byte streams.
///
/// Called once per connection attempt. There is no timeout around `dial`;
/// an implementation that can hang should bound itself.
pub trait Dialer: Send + Sync + 'static {
    /// The stream type produced by this dialer.
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Opens a new connection.
    fn dial(
        &self,
    ) -> impl Future<Output = Result<Self::Stream, TransportError>> + Send;
}

/// A [`Dialer`] built from a closure. See [`dial_fn`].
#[derive(Clone)]
pub struct DialFn<F>(F);

/// Wraps a closure returning a future as a [`Dialer`].
///
/// ```rust
/// use pubsub_transport::{dial_fn, TransportError};
///
/// let dialer = dial_fn(|| async {
///     tokio::net::TcpStream::connect("127.0.0.1:14080")
///         .await
///         .map_err(TransportError::DialFailed)
/// });
/// # let _ = dialer;
/// ```
pub fn dial_fn<F, Fut, S>(f: F) -> DialFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S, TransportError>> + Send,
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    DialFn(f)
}

impl<F, Fut, S> Dialer for DialFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S, TransportError>> + Send,
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    type Stream = S;

    fn dial(&self) -> impl Future<Output = Result<S, TransportError>> + Send {
        (self.0)()
    }
}
