/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection provider could not produce a connection.
    #[error("dial failed: {0}")]
    DialFailed(#[source] std::io::Error),

    /// Writing to an established connection failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),
}
