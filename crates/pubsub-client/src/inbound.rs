//! Consumer side of the single-slot inbound queue.

use std::time::Duration;

use pubsub_protocol::Message;
use tokio::sync::{Mutex, mpsc};

use crate::ClientError;

/// Hands decoded messages to one consumer at a time.
///
/// The receiver sits behind an async mutex so `take` can be called through
/// `&Client`. Concurrent callers queue up on the lock; messages are not fanned
/// out.
pub(crate) struct Inbound {
    rx: Mutex<mpsc::Receiver<Message>>,
}

impl Inbound {
    pub(crate) fn new(rx: mpsc::Receiver<Message>) -> Self {
        Self { rx: Mutex::new(rx) }
    }

    /// Waits for the next message.
    pub(crate) async fn take(&self) -> Result<Message, ClientError> {
        self.rx.lock().await.recv().await.ok_or(ClientError::Shutdown)
    }

    /// Waits up to `timeout` for the next message. `Ok(None)` on expiry.
    pub(crate) async fn take_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<Message>, ClientError> {
        match tokio::time::timeout(timeout, self.take()).await {
            Ok(result) => result.map(Some),
            Err(_elapsed) => Ok(None),
        }
    }
}
