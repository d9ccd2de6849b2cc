//! Wire protocol for the pubsub client.
//!
//! This crate defines what travels over the connection:
//!
//! - **Types** ([`Message`], [`MessageType`]): the values on the wire.
//! - **Codec** ([`Codec`] trait, [`MsgPackCodec`]): how the primitives of a
//!   frame (tag, byte array, absent marker) become bytes.
//! - **Framing** ([`encode_message`], [`write_message`], [`read_message`]):
//!   how one message is laid out from those primitives.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about connections, retries, or queues.
//! It reads from any `AsyncRead` and writes to any `AsyncWrite`.
//!
//! ```text
//! Transport (byte stream) → Protocol (Message) → Client (queues, reconnect)
//! ```

mod codec;
mod error;
pub mod frame;
mod types;

pub use codec::{Codec, MsgPackCodec};
pub use error::ProtocolError;
pub use frame::{encode_message, read_message, write_message};
pub use types::{Message, MessageType, utf8};
