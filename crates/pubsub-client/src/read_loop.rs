//! Per-connection read loop.
//!
//! One task per connection generation. It owns only the read half of that
//! connection, decodes frames into the inbound queue, and on the first
//! failure asks the connection manager for a reconnect and exits. It never
//! retries on its own.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pubsub_protocol::{Codec, Message, ProtocolError, read_message};
use pubsub_transport::ConnectionId;
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::sendable::{Operation, OutboundSender};
use crate::shutdown_requested;

/// Capacity of the inbound queue. With one slot, a reader that stops
/// consuming stalls the read loop instead of growing a buffer.
pub(crate) const INBOUND_CAPACITY: usize = 1;

/// Everything a read loop needs, captured when its connection is made.
pub(crate) struct ReadLoop<R, C> {
    pub(crate) id: ConnectionId,
    pub(crate) reader: R,
    pub(crate) codec: C,
    pub(crate) inbound: mpsc::Sender<Message>,
    pub(crate) outbound: OutboundSender,
    pub(crate) force_reconnect: Arc<AtomicBool>,
    pub(crate) shutdown: watch::Receiver<bool>,
}

impl<R, C> ReadLoop<R, C>
where
    R: AsyncRead + Unpin + Send,
    C: Codec,
{
    /// Runs until the connection fails, the client shuts down, or the
    /// inbound queue is dropped.
    pub(crate) async fn run(self) {
        let Self {
            id,
            mut reader,
            codec,
            inbound,
            outbound,
            force_reconnect,
            mut shutdown,
        } = self;

        debug!(conn_id = %id, "read loop started");

        let result = tokio::select! {
            result = pump(&codec, &mut reader, &inbound) => result,
            _ = shutdown_requested(&mut shutdown) => {
                debug!(conn_id = %id, "read loop stopped by shutdown");
                return;
            }
        };

        match result {
            Ok(()) => debug!(conn_id = %id, "inbound queue closed, read loop exiting"),
            Err(e) => {
                warn!(conn_id = %id, error = %e, "read failed, requesting reconnect");
                force_reconnect.store(true, Ordering::Release);
                // If the slot is already taken the manager is about to wake
                // up anyway and will see the flag.
                let _ = outbound.try_send(Operation::Connect);
            }
        }
    }
}

/// Decodes frames and hands each one to the inbound queue, waiting for the
/// consumer whenever the slot is full. `Ok(())` means the consumer is gone.
async fn pump<R, C>(
    codec: &C,
    reader: &mut R,
    inbound: &mpsc::Sender<Message>,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin + Send,
    C: Codec,
{
    loop {
        let message = read_message(codec, reader).await?;
        if inbound.send(message).await.is_err() {
            return Ok(());
        }
    }
}
