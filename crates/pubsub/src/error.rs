//! Unified error type for the pubsub crates.

use pubsub_client::ClientError;
use pubsub_protocol::ProtocolError;
use pubsub_transport::TransportError;

/// Top-level error wrapping every crate-specific error.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors, so code
/// built on the facade only has to name this one type.
#[derive(Debug, thiserror::Error)]
pub enum PubsubError {
    /// Dialing or writing failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Framing or encoding failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The client was shut down.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// [`ClientBuilder::build`](crate::ClientBuilder::build) was called
    /// without a broker address.
    #[error("no broker address configured, call `dial_tcp` first")]
    NoAddress,
}
