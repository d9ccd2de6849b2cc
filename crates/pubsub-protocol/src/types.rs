//! Message types: the values that travel on the wire.
//!
//! Every frame carries exactly one [`Message`]: a [`MessageType`] tag plus an
//! optional topic and an optional body. "Absent" and "present but empty" are
//! different values and survive a round trip through the codec unchanged.

use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// MessageType
// ---------------------------------------------------------------------------

/// The kind of operation a [`Message`] represents.
///
/// The discriminant is the numeric tag written as the first field of every
/// frame. `#[repr(u8)]` pins the in-memory representation to a single byte so
/// `as u8` yields exactly the wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// No-op sent to keep an idle connection alive.
    KeepAlive = 0,
    /// Presents the client's credential to the server.
    Authenticate = 1,
    /// Starts delivery of a topic to this client.
    Subscribe = 2,
    /// Stops delivery of a topic to this client.
    Unsubscribe = 3,
    /// Publishes a body on a topic (and, inbound, delivers one).
    Publish = 4,
}

impl MessageType {
    /// Returns the wire tag for this type.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// `TryFrom<u8>` is the standard conversion trait for fallible conversions.
/// Implementing it lets callers write `MessageType::try_from(tag)?`.
impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::KeepAlive),
            1 => Ok(Self::Authenticate),
            2 => Ok(Self::Subscribe),
            3 => Ok(Self::Unsubscribe),
            4 => Ok(Self::Publish),
            other => Err(ProtocolError::UnknownMessageType(i64::from(other))),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::KeepAlive => "keepalive",
            Self::Authenticate => "authenticate",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Publish => "publish",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One protocol message.
///
/// Immutable once built: the fields are private and only readable through
/// accessors, so a `Message` handed to the codec or to a reader is never
/// changed underneath it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    kind: MessageType,
    topic: Option<Vec<u8>>,
    body: Option<Vec<u8>>,
}

impl Message {
    /// Builds a message from its three fields.
    pub fn new(
        kind: MessageType,
        topic: Option<Vec<u8>>,
        body: Option<Vec<u8>>,
    ) -> Self {
        Self { kind, topic, body }
    }

    /// A `Subscribe` for `topic`.
    pub fn subscribe(topic: impl Into<Vec<u8>>) -> Self {
        Self::new(MessageType::Subscribe, Some(topic.into()), None)
    }

    /// An `Unsubscribe` for `topic`.
    pub fn unsubscribe(topic: impl Into<Vec<u8>>) -> Self {
        Self::new(MessageType::Unsubscribe, Some(topic.into()), None)
    }

    /// A `Publish` of `body` on `topic`.
    pub fn publish(
        topic: impl Into<Vec<u8>>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(
            MessageType::Publish,
            Some(topic.into()),
            Some(body.into()),
        )
    }

    /// An `Authenticate` carrying the UTF-8 bytes of `key` as its body.
    /// The topic is absent.
    pub fn authenticate(key: &str) -> Self {
        Self::new(MessageType::Authenticate, None, Some(utf8(key)))
    }

    /// A `KeepAlive` with both fields absent.
    pub fn keep_alive() -> Self {
        Self::new(MessageType::KeepAlive, None, None)
    }

    /// The message type.
    pub fn kind(&self) -> MessageType {
        self.kind
    }

    /// The topic, or `None` if absent.
    pub fn topic(&self) -> Option<&[u8]> {
        self.topic.as_deref()
    }

    /// The body, or `None` if absent.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Consumes the message and returns `(type, topic, body)`.
    pub fn into_parts(self) -> (MessageType, Option<Vec<u8>>, Option<Vec<u8>>) {
        (self.kind, self.topic, self.body)
    }
}

/// Returns the UTF-8 bytes of `s`.
///
/// Topics and bodies are raw bytes on the wire; this is the usual way to
/// turn a string literal into one.
pub fn utf8(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}
