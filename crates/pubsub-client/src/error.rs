//! Error types for the client layer.

use pubsub_protocol::ProtocolError;
use pubsub_transport::TransportError;

/// Errors that can occur inside the client.
///
/// Transport and protocol errors never reach application code: the
/// connection manager logs them and reconnects. The only error a caller of
/// [`Sendable::send`](crate::Sendable::send) or
/// [`Client::read`](crate::Client::read) can see is [`ClientError::Shutdown`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Dialing or writing failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding a frame failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The client was shut down (or dropped) and its queues are closed.
    #[error("client has shut down")]
    Shutdown,
}
