//! Outbound operations and the single-slot queue they travel through.

use pubsub_protocol::Message;
use tokio::sync::mpsc;

use crate::ClientError;

/// Capacity of the outbound queue. One slot means a second send waits
/// until the connection manager has taken the first.
pub(crate) const OUTBOUND_CAPACITY: usize = 1;

/// Work items for the connection manager.
#[derive(Debug, Clone)]
pub(crate) enum Operation {
    /// Make sure a connection exists (reconnecting if a reconnect was
    /// forced) but write nothing.
    Connect,
    /// Write one message.
    Send(Message),
}

pub(crate) type OutboundSender = mpsc::Sender<Operation>;

/// A message bound to a client, ready to be queued for delivery.
///
/// Returned by [`Client::subscribe`](crate::Client::subscribe),
/// [`Client::unsubscribe`](crate::Client::unsubscribe) and
/// [`Client::publish`](crate::Client::publish). Nothing is sent until
/// [`send`](Self::send) is awaited.
#[derive(Debug)]
#[must_use = "a Sendable does nothing until `.send().await` is called"]
pub struct Sendable {
    message: Message,
    outbound: OutboundSender,
}

impl Sendable {
    pub(crate) fn new(message: Message, outbound: OutboundSender) -> Self {
        Self { message, outbound }
    }

    /// The message that will be sent.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Queues the message for the connection manager.
    ///
    /// Waits while the outbound slot is occupied and returns as soon as the
    /// message is queued, not once it is written. Delivery is retried across
    /// reconnects, so a queued message may be written more than once.
    ///
    /// # Errors
    /// Returns [`ClientError::Shutdown`] if the client has shut down.
    pub async fn send(self) -> Result<(), ClientError> {
        self.outbound
            .send(Operation::Send(self.message))
            .await
            .map_err(|_| ClientError::Shutdown)
    }
}
