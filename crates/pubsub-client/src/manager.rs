//! The connection manager: sole owner of the connection.
//!
//! A single task pulls operations off the one-slot outbound queue and runs
//! each one through the same retry loop:
//!
//! ```text
//!            ┌──────────── backoff sleep ◄──────────────┐
//!            ▼                                          │ failure
//! dequeue ─► forced reconnect or no connection? ──yes─► dial + bootstrap
//!            │ no                                       │ ok
//!            ▼                                          ▼
//!       write message ◄──────────────── (Connect ops stop here)
//!            │ ok                 │ failure
//!            ▼                    └─► close ─► backoff ─► retry
//!         next op
//! ```
//!
//! Every write therefore doubles as a health check, and a failed one
//! reconnects and retries the same message. There is no attempt limit.
//!
//! # Ownership
//!
//! Only this task dials, writes, or closes. A read loop gets the read half
//! of its own connection and talks back through exactly two channels: the
//! `force_reconnect` flag and a `Connect` operation on the outbound queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pubsub_keepalive::{KeepaliveConfig, KeepaliveScheduler};
use pubsub_protocol::{Codec, Message, ProtocolError, write_message};
use pubsub_transport::{ConnectionId, Dialer, TransportError};
use tokio::io::{AsyncWriteExt, BufReader, BufWriter, WriteHalf};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::read_loop::ReadLoop;
use crate::sendable::{Operation, OutboundSender};
use crate::{Backoff, ClientConfig, ClientError, shutdown_requested};

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// Where the connection manager is in its lifecycle.
///
/// ```text
/// NoConnection ──► Connecting ──► Ready
///      ▲               │            │
///      └───────────────┴────────────┘  (dial, bootstrap, read or write failure)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection exists.
    NoConnection,
    /// Dialing and sending the bootstrap messages.
    Connecting,
    /// Connected and bootstrapped; operations are written directly.
    Ready,
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// One connection generation: the write half plus the read loop that owns
/// the read half.
struct Connection<S> {
    id: ConnectionId,
    writer: BufWriter<WriteHalf<S>>,
    /// `None` until the bootstrap messages have been written.
    reader: Option<JoinHandle<()>>,
}

impl<S> Connection<S>
where
    S: tokio::io::AsyncWrite,
{
    /// Best-effort close: errors from shutting down the write half are
    /// ignored, and the read loop is aborted so it can't report a failure
    /// for a connection that is already gone.
    async fn close(mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Err(e) = self.writer.shutdown().await {
            debug!(conn_id = %self.id, error = %e, "ignoring error on close");
        }
        info!(conn_id = %self.id, "connection closed");
    }
}

// ---------------------------------------------------------------------------
// ConnectionManager
// ---------------------------------------------------------------------------

/// Channels the manager shares with the [`Client`](crate::Client) handle.
pub(crate) struct ManagerChannels {
    pub(crate) outbound_tx: OutboundSender,
    pub(crate) outbound_rx: mpsc::Receiver<Operation>,
    pub(crate) inbound_tx: mpsc::Sender<Message>,
    pub(crate) state_tx: watch::Sender<ConnectionState>,
    pub(crate) shutdown_rx: watch::Receiver<bool>,
}

/// State owned by the connection manager task.
pub(crate) struct ConnectionManager<D: Dialer, C> {
    config: ClientConfig,
    dialer: D,
    codec: C,
    outbound_tx: OutboundSender,
    outbound_rx: mpsc::Receiver<Operation>,
    inbound_tx: mpsc::Sender<Message>,
    state_tx: watch::Sender<ConnectionState>,
    shutdown_rx: watch::Receiver<bool>,
    /// Set by a failing read loop, cleared here before each attempt.
    force_reconnect: Arc<AtomicBool>,
    keepalive: KeepaliveScheduler<Operation>,
    backoff: Backoff,
    connection: Option<Connection<D::Stream>>,
}

impl<D, C> ConnectionManager<D, C>
where
    D: Dialer,
    C: Codec + Clone,
{
    pub(crate) fn new(
        config: ClientConfig,
        dialer: D,
        codec: C,
        channels: ManagerChannels,
    ) -> Self {
        let keepalive = KeepaliveScheduler::new(
            KeepaliveConfig::with_period(config.keepalive_period()),
            channels.outbound_tx.clone(),
            Operation::Send(Message::keep_alive()),
        );
        let backoff = Backoff::new(config.backoff_base(), config.max_backoff());

        Self {
            config,
            dialer,
            codec,
            outbound_tx: channels.outbound_tx,
            outbound_rx: channels.outbound_rx,
            inbound_tx: channels.inbound_tx,
            state_tx: channels.state_tx,
            shutdown_rx: channels.shutdown_rx,
            force_reconnect: Arc::new(AtomicBool::new(false)),
            keepalive,
            backoff,
            connection: None,
        }
    }

    /// Processes operations until shutdown.
    pub(crate) async fn run(mut self) {
        info!("connection manager started");
        // A local clone can be awaited alongside `&mut self` futures inside
        // `select!`; the field stays behind for spawning read loops.
        let mut shutdown = self.shutdown_rx.clone();

        loop {
            let op = tokio::select! {
                op = self.outbound_rx.recv() => op,
                _ = shutdown_requested(&mut shutdown) => break,
            };
            // The manager holds a sender itself, so the queue can't close
            // while it runs. If it does, nothing can ever be sent again.
            let Some(op) = op else {
                error!("outbound queue closed unexpectedly, stopping client");
                break;
            };

            tokio::select! {
                _ = self.process(op) => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }

        self.keepalive.cancel();
        self.close().await;
        info!("connection manager stopped");
    }

    /// Runs one operation to completion, reconnecting and backing off as
    /// often as it takes.
    async fn process(&mut self, op: Operation) {
        loop {
            let delay = self.backoff.delay();
            if !delay.is_zero() {
                debug!(
                    failures = self.backoff.failures(),
                    backoff_ms = delay.as_millis() as u64,
                    "backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }

            let forced = self.force_reconnect.swap(false, Ordering::AcqRel);
            if forced || self.connection.is_none() {
                if forced {
                    debug!("reconnect forced by read loop");
                }
                if let Err(e) = self.reconnect().await {
                    warn!(
                        error = %e,
                        failures = self.backoff.failures() + 1,
                        "connect failed"
                    );
                    self.close().await;
                    self.backoff.record_failure();
                    continue;
                }
            }

            let Operation::Send(message) = &op else {
                // A bare connect request is done once a connection exists.
                self.backoff.reset();
                return;
            };

            match self.invoke_now(message).await {
                Ok(()) => {
                    self.backoff.reset();
                    return;
                }
                Err(ClientError::Protocol(e)) => {
                    // Encoding failed before any byte was written; no
                    // connection will ever accept this message.
                    error!(error = %e, kind = %message.kind(), "dropping unencodable message");
                    self.backoff.reset();
                    return;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        kind = %message.kind(),
                        failures = self.backoff.failures() + 1,
                        "write failed, reconnecting"
                    );
                    self.close().await;
                    self.backoff.record_failure();
                }
            }
        }
    }

    /// Replaces the current connection with a freshly dialed and
    /// bootstrapped one, then starts its read loop.
    async fn reconnect(&mut self) -> Result<(), ClientError> {
        self.close().await;
        self.state_tx.send_replace(ConnectionState::Connecting);

        debug!("dialing");
        let stream = self.dialer.dial().await?;
        let id = ConnectionId::next();
        let (read_half, write_half) = tokio::io::split(stream);
        self.connection = Some(Connection {
            id,
            writer: BufWriter::new(write_half),
            reader: None,
        });

        self.bootstrap().await?;

        let read_loop = ReadLoop {
            id,
            reader: BufReader::new(read_half),
            codec: self.codec.clone(),
            inbound: self.inbound_tx.clone(),
            outbound: self.outbound_tx.clone(),
            force_reconnect: Arc::clone(&self.force_reconnect),
            shutdown: self.shutdown_rx.clone(),
        };
        if let Some(conn) = self.connection.as_mut() {
            conn.reader = Some(tokio::spawn(read_loop.run()));
        }

        self.state_tx.send_replace(ConnectionState::Ready);
        info!(conn_id = %id, "connected");
        Ok(())
    }

    /// Sends the authenticate message (if a key is configured) and the
    /// initial subscriptions, directly on the new connection.
    async fn bootstrap(&mut self) -> Result<(), ClientError> {
        let mut messages = Vec::with_capacity(self.config.initial_topics.len() + 1);
        if let Some(key) = &self.config.authentication_key {
            messages.push(Message::authenticate(key));
        }
        messages.extend(
            self.config
                .initial_topics
                .iter()
                .map(|topic| Message::subscribe(topic.clone())),
        );

        debug!(count = messages.len(), "sending bootstrap messages");
        for message in &messages {
            self.invoke_now(message).await?;
        }
        Ok(())
    }

    /// Writes `message` on the current connection, bypassing the queue.
    ///
    /// Only the manager task calls this, either for a dequeued operation or
    /// during bootstrap. Every write re-arms the keepalive.
    async fn invoke_now(&mut self, message: &Message) -> Result<(), ClientError> {
        let conn = self.connection.as_mut().ok_or_else(|| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "no connection",
            ))
        })?;

        self.keepalive.reset();
        write_message(&self.codec, &mut conn.writer, message)
            .await
            .map_err(|e| match e {
                ProtocolError::Io(io) => ClientError::Transport(TransportError::SendFailed(io)),
                other => ClientError::Protocol(other),
            })
    }

    /// Closes the current connection, if any.
    async fn close(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.close().await;
        }
        self.state_tx.send_replace(ConnectionState::NoConnection);
    }
}
