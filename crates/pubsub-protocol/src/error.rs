//! Error types for the protocol layer.
//!
//! Anything that goes wrong while turning bytes into a [`Message`](crate::Message)
//! (or back) ends up here. The client treats every variant the same way:
//! the connection is considered broken and gets replaced.

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The underlying stream failed while reading or writing.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended cleanly on a frame boundary.
    #[error("stream closed")]
    Closed,

    /// The stream ended in the middle of a frame.
    #[error("stream ended mid-frame while reading {0}")]
    Truncated(&'static str),

    /// The type tag does not name a known [`MessageType`](crate::MessageType).
    /// Carries the decoded integer, which may lie outside `u8`.
    #[error("unknown message type tag {0}")]
    UnknownMessageType(i64),

    /// A field started with a format marker the codec can't accept there,
    /// e.g. a map header where a byte array was expected.
    #[error("unexpected format marker 0x{marker:02x} for {field}")]
    UnexpectedFormat {
        /// Which field was being decoded.
        field: &'static str,
        /// The offending marker byte.
        marker: u8,
    },

    /// A field is longer than the codec can describe in a length header.
    #[error("{field} too long to encode: {len} bytes")]
    TooLong {
        /// Which field was being encoded.
        field: &'static str,
        /// Its length in bytes.
        len: usize,
    },
}

impl ProtocolError {
    /// `true` for errors caused by malformed or truncated input, as opposed
    /// to the stream itself failing.
    pub fn is_framing(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}
