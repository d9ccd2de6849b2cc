//! Codec trait and the MessagePack implementation of the wire primitives.
//!
//! A frame is built from only three primitives: a small integer (the type
//! tag), a length-prefixed byte array, and an explicit "absent" marker. The
//! [`Codec`] trait names exactly those primitives; the framing in
//! [`frame`](crate::frame) composes them and never looks at raw bytes itself.
//!
//! [`MsgPackCodec`] is the encoding the server speaks: MessagePack integers,
//! `bin` headers and `nil`, written and classified with `rmp`.

use std::future::Future;
use std::io;

use rmp::Marker;
use rmp::encode::{self, ValueWriteError};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::ProtocolError;

/// Encodes and decodes the primitives a frame is made of.
///
/// ## Trait bounds
///
/// - `Send + Sync + 'static` → one codec value is shared by the connection
///   manager task and every read loop task it spawns.
///
/// ## Why `impl Future + Send` instead of `async fn`?
///
/// The decode methods are awaited inside `tokio::spawn`ed tasks, which
/// require `Send` futures. Spelling the return type out lets the trait
/// promise `Send`; implementors can still write a plain `async fn`.
pub trait Codec: Send + Sync + 'static {
    /// Appends the encoding of a type tag to `buf`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Io`] if the buffer can't be written.
    fn encode_tag(&self, tag: u8, buf: &mut Vec<u8>) -> Result<(), ProtocolError>;

    /// Appends the encoding of an optional byte array to `buf`:
    /// the absent marker for `None`, a length header plus the bytes for
    /// `Some`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::TooLong`] if the length can't be described.
    fn encode_bytes(
        &self,
        field: &'static str,
        bytes: Option<&[u8]>,
        buf: &mut Vec<u8>,
    ) -> Result<(), ProtocolError>;

    /// Reads one type tag. This is the first read of every frame, so a clean
    /// end of stream here is reported as [`ProtocolError::Closed`].
    fn decode_tag<R>(
        &self,
        reader: &mut R,
    ) -> impl Future<Output = Result<u8, ProtocolError>> + Send
    where
        R: AsyncRead + Unpin + Send;

    /// Reads one optional byte array. `Ok(None)` means the absent marker was
    /// read, which is different from `Ok(Some(vec![]))`.
    fn decode_bytes<R>(
        &self,
        field: &'static str,
        reader: &mut R,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, ProtocolError>> + Send
    where
        R: AsyncRead + Unpin + Send;
}

// ---------------------------------------------------------------------------
// MsgPackCodec
// ---------------------------------------------------------------------------

/// Largest chunk reserved up front when reading a byte array. Larger payloads
/// grow the buffer as bytes actually arrive, so a corrupt length header can't
/// force a huge allocation.
const MAX_PREALLOC: usize = 64 * 1024;

/// A [`Codec`] speaking the MessagePack subset used by the server, built on
/// the `rmp` primitives.
///
/// Encoding always uses the smallest form: positive fixint for tags, and
/// `bin8`/`bin16`/`bin32` for byte arrays. Decoding is more lenient. A tag
/// may use any MessagePack integer form as long as its value fits in a
/// byte, and byte arrays may carry `str`-family headers, since other
/// MessagePack writers may emit those.
///
/// ## Example
///
/// ```rust
/// use pubsub_protocol::{Codec, MsgPackCodec};
///
/// let mut buf = Vec::new();
/// MsgPackCodec.encode_tag(4, &mut buf).unwrap();
/// MsgPackCodec.encode_bytes("topic", Some(b"t"), &mut buf).unwrap();
/// MsgPackCodec.encode_bytes("body", None, &mut buf).unwrap();
/// assert_eq!(buf, [0x04, 0xc4, 0x01, b't', 0xc0]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl Codec for MsgPackCodec {
    fn encode_tag(&self, tag: u8, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        encode::write_uint(buf, u64::from(tag)).map_err(value_write)?;
        Ok(())
    }

    fn encode_bytes(
        &self,
        field: &'static str,
        bytes: Option<&[u8]>,
        buf: &mut Vec<u8>,
    ) -> Result<(), ProtocolError> {
        let Some(bytes) = bytes else {
            encode::write_nil(buf)?;
            return Ok(());
        };

        let len = u32::try_from(bytes.len()).map_err(|_| ProtocolError::TooLong {
            field,
            len: bytes.len(),
        })?;
        encode::write_bin_len(buf, len).map_err(value_write)?;
        buf.extend_from_slice(bytes);
        Ok(())
    }

    async fn decode_tag<R>(&self, reader: &mut R) -> Result<u8, ProtocolError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let byte = reader.read_u8().await.map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                ProtocolError::Closed
            } else {
                ProtocolError::Io(e)
            }
        })?;

        let field = "type";
        let value = match Marker::from_u8(byte) {
            Marker::FixPos(v) => i64::from(v),
            Marker::FixNeg(v) => i64::from(v),
            Marker::U8 => i64::from(reader.read_u8().await.map_err(truncated(field))?),
            Marker::U16 => i64::from(reader.read_u16().await.map_err(truncated(field))?),
            Marker::U32 => i64::from(reader.read_u32().await.map_err(truncated(field))?),
            Marker::U64 => {
                let v = reader.read_u64().await.map_err(truncated(field))?;
                i64::try_from(v).unwrap_or(i64::MAX)
            }
            Marker::I8 => i64::from(reader.read_i8().await.map_err(truncated(field))?),
            Marker::I16 => i64::from(reader.read_i16().await.map_err(truncated(field))?),
            Marker::I32 => i64::from(reader.read_i32().await.map_err(truncated(field))?),
            Marker::I64 => reader.read_i64().await.map_err(truncated(field))?,
            other => {
                return Err(ProtocolError::UnexpectedFormat {
                    field,
                    marker: other.to_u8(),
                });
            }
        };
        u8::try_from(value).map_err(|_| ProtocolError::UnknownMessageType(value))
    }

    async fn decode_bytes<R>(
        &self,
        field: &'static str,
        reader: &mut R,
    ) -> Result<Option<Vec<u8>>, ProtocolError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let byte = reader.read_u8().await.map_err(truncated(field))?;

        let len = match Marker::from_u8(byte) {
            Marker::Null => return Ok(None),
            Marker::Bin8 | Marker::Str8 => {
                usize::from(reader.read_u8().await.map_err(truncated(field))?)
            }
            Marker::Bin16 | Marker::Str16 => {
                usize::from(reader.read_u16().await.map_err(truncated(field))?)
            }
            Marker::Bin32 | Marker::Str32 => {
                reader.read_u32().await.map_err(truncated(field))? as usize
            }
            Marker::FixStr(n) => usize::from(n),
            other => {
                return Err(ProtocolError::UnexpectedFormat {
                    field,
                    marker: other.to_u8(),
                });
            }
        };

        let mut payload = Vec::with_capacity(len.min(MAX_PREALLOC));
        // `take` borrows the reader and stops after `len` bytes; `read_to_end`
        // then returns early only if the stream itself ends.
        (&mut *reader)
            .take(len as u64)
            .read_to_end(&mut payload)
            .await?;
        if payload.len() < len {
            return Err(ProtocolError::Truncated(field));
        }
        Ok(Some(payload))
    }
}

/// Unwraps the I/O error behind a failed `rmp` write.
fn value_write(e: ValueWriteError<io::Error>) -> ProtocolError {
    match e {
        ValueWriteError::InvalidMarkerWrite(e) | ValueWriteError::InvalidDataWrite(e) => {
            ProtocolError::Io(e)
        }
    }
}

/// Maps an I/O error from inside a frame: end of stream means the frame was
/// cut short, anything else is a read failure.
fn truncated(field: &'static str) -> impl Fn(io::Error) -> ProtocolError {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ProtocolError::Truncated(field)
        } else {
            ProtocolError::Io(e)
        }
    }
}
