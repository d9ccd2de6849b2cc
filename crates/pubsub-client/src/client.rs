//! The public client handle.

use std::time::Duration;

use pubsub_protocol::{Codec, Message, MsgPackCodec};
use pubsub_transport::Dialer;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::inbound::Inbound;
use crate::manager::{ConnectionManager, ConnectionState, ManagerChannels};
use crate::read_loop::INBOUND_CAPACITY;
use crate::sendable::{OUTBOUND_CAPACITY, Operation, OutboundSender, Sendable};
use crate::{ClientConfig, ClientError};

/// A long-lived publish/subscribe client.
///
/// Creating a client spawns its connection manager, which connects right
/// away and then keeps a connection up for as long as the client lives,
/// reconnecting with backoff whenever dialing, reading, or writing fails.
///
/// # Example
///
/// ```rust,no_run
/// use pubsub_client::{Client, ClientConfig};
/// use pubsub_transport::TcpDialer;
///
/// # async fn run() -> Result<(), pubsub_client::ClientError> {
/// let config = ClientConfig {
///     authentication_key: Some("secret".into()),
///     initial_topics: vec![b"news".to_vec()],
///     ..ClientConfig::default()
/// };
/// let client = Client::new(config, TcpDialer::new("127.0.0.1:14080"));
///
/// client.publish("news", "hello").send().await?;
/// let message = client.read().await?;
/// assert_eq!(message.body(), Some(&b"hello"[..]));
/// # Ok(())
/// # }
/// ```
pub struct Client {
    outbound: OutboundSender,
    inbound: Inbound,
    state: watch::Receiver<ConnectionState>,
    shutdown: watch::Sender<bool>,
    manager: Option<JoinHandle<()>>,
}

impl Client {
    /// Starts a client speaking the default MessagePack wire encoding.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<D: Dialer>(config: ClientConfig, dialer: D) -> Self {
        Self::with_codec(config, dialer, MsgPackCodec)
    }

    /// Starts a client with a custom [`Codec`] for the wire primitives.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_codec<D, C>(config: ClientConfig, dialer: D, codec: C) -> Self
    where
        D: Dialer,
        C: Codec + Clone,
    {
        let config = config.validated();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::NoConnection);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Connect at start-up rather than on the first send. The queue is
        // empty, so this can't fail.
        let _ = outbound_tx.try_send(Operation::Connect);

        let manager = ConnectionManager::new(
            config,
            dialer,
            codec,
            ManagerChannels {
                outbound_tx: outbound_tx.clone(),
                outbound_rx,
                inbound_tx,
                state_tx,
                shutdown_rx,
            },
        );

        Self {
            outbound: outbound_tx,
            inbound: Inbound::new(inbound_rx),
            state: state_rx,
            shutdown: shutdown_tx,
            manager: Some(tokio::spawn(manager.run())),
        }
    }

    /// Builds a `Subscribe` for `topic`.
    pub fn subscribe(&self, topic: impl Into<Vec<u8>>) -> Sendable {
        self.sendable(Message::subscribe(topic))
    }

    /// Builds an `Unsubscribe` for `topic`.
    pub fn unsubscribe(&self, topic: impl Into<Vec<u8>>) -> Sendable {
        self.sendable(Message::unsubscribe(topic))
    }

    /// Builds a `Publish` of `body` on `topic`.
    pub fn publish(
        &self,
        topic: impl Into<Vec<u8>>,
        body: impl Into<Vec<u8>>,
    ) -> Sendable {
        self.sendable(Message::publish(topic, body))
    }

    fn sendable(&self, message: Message) -> Sendable {
        Sendable::new(message, self.outbound.clone())
    }

    /// Waits for the next inbound message.
    ///
    /// # Errors
    /// Returns [`ClientError::Shutdown`] once the client has shut down.
    pub async fn read(&self) -> Result<Message, ClientError> {
        self.inbound.take().await
    }

    /// Waits up to `timeout` for the next inbound message. Returns
    /// `Ok(None)` if none arrived in time.
    ///
    /// # Errors
    /// Returns [`ClientError::Shutdown`] once the client has shut down.
    pub async fn read_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<Message>, ClientError> {
        self.inbound.take_timeout(timeout).await
    }

    /// The connection manager's current state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Waits until a connection is established and bootstrapped.
    ///
    /// # Errors
    /// Returns [`ClientError::Shutdown`] if the client stops first.
    pub async fn wait_ready(&self) -> Result<(), ClientError> {
        let mut state = self.state.clone();
        state
            .wait_for(|s| *s == ConnectionState::Ready)
            .await
            .map(|_| ())
            .map_err(|_| ClientError::Shutdown)
    }

    /// Stops every task, closes the connection, and waits for the
    /// connection manager to finish.
    ///
    /// Outstanding [`Sendable`]s fail with [`ClientError::Shutdown`] after
    /// this returns.
    pub async fn shutdown(mut self) {
        self.shutdown.send_replace(true);
        if let Some(manager) = self.manager.take() {
            if let Err(e) = manager.await {
                tracing::error!(error = %e, "connection manager task failed");
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
