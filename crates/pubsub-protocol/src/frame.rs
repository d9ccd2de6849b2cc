//! Message framing: one [`Message`] per frame, three fields in a row.
//!
//! ```text
//! +-----+---------------------------+---------------------------+
//! | tag | topic: absent | len+bytes | body:  absent | len+bytes |
//! +-----+---------------------------+---------------------------+
//! ```
//!
//! There is no envelope, version, checksum, or terminator. The position the
//! decoder reaches after the body is where the next frame starts.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::{Codec, Message, MessageType, ProtocolError};

/// Encodes `message` into a new buffer.
///
/// # Errors
/// Returns [`ProtocolError::TooLong`] if a field can't be length-prefixed.
pub fn encode_message<C: Codec>(
    codec: &C,
    message: &Message,
) -> Result<Vec<u8>, ProtocolError> {
    let topic_len = message.topic().map_or(0, <[u8]>::len);
    let body_len = message.body().map_or(0, <[u8]>::len);
    // 1 tag byte + up to 5 header bytes per field.
    let mut buf = Vec::with_capacity(11 + topic_len + body_len);

    codec.encode_tag(message.kind().tag(), &mut buf)?;
    codec.encode_bytes("topic", message.topic(), &mut buf)?;
    codec.encode_bytes("body", message.body(), &mut buf)?;
    Ok(buf)
}

/// Encodes `message`, writes it, and flushes the writer.
///
/// The whole frame is encoded first and handed over in a single
/// `write_all`, so a buffered writer never holds half a frame between calls.
///
/// # Errors
/// Returns [`ProtocolError::Io`] if writing or flushing fails.
pub async fn write_message<C, W>(
    codec: &C,
    writer: &mut W,
    message: &Message,
) -> Result<(), ProtocolError>
where
    C: Codec,
    W: AsyncWrite + Unpin,
{
    let frame = encode_message(codec, message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    tracing::trace!(kind = %message.kind(), len = frame.len(), "frame written");
    Ok(())
}

/// Reads exactly one frame and returns the decoded message.
///
/// # Errors
/// - [`ProtocolError::Closed`] if the stream ended before the frame began.
/// - [`ProtocolError::Truncated`] if it ended partway through.
/// - [`ProtocolError::UnknownMessageType`] / [`ProtocolError::UnexpectedFormat`]
///   for malformed input.
/// - [`ProtocolError::Io`] if the stream failed.
pub async fn read_message<C, R>(
    codec: &C,
    reader: &mut R,
) -> Result<Message, ProtocolError>
where
    C: Codec,
    R: AsyncRead + Unpin + Send,
{
    let tag = codec.decode_tag(reader).await?;
    let kind = MessageType::try_from(tag)?;
    let topic = codec.decode_bytes("topic", reader).await?;
    let body = codec.decode_bytes("body", reader).await?;
    tracing::trace!(%kind, "frame read");
    Ok(Message::new(kind, topic, body))
}
