//! `ClientBuilder`: the TCP convenience entry point.

use std::time::Duration;

use pubsub_client::{Client, ClientConfig};
use pubsub_transport::TcpDialer;

use crate::PubsubError;

/// Builder for a [`Client`] that dials a broker over TCP.
///
/// Every setter has a [`ClientConfig`] field behind it; [`config`](Self::config)
/// replaces them all at once, for configs loaded from a file.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use pubsub::ClientBuilder;
///
/// # async fn run() -> Result<(), pubsub::PubsubError> {
/// let client = ClientBuilder::new()
///     .dial_tcp("broker.internal:14080")
///     .backoff(Duration::from_millis(500), Duration::from_secs(30))
///     .initial_topic("orders")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    addr: Option<String>,
    config: ClientConfig,
}

impl ClientBuilder {
    /// Creates a builder with the default configuration and no address.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the broker address (`host:port`).
    pub fn dial_tcp(mut self, addr: impl Into<String>) -> Self {
        self.addr = Some(addr.into());
        self
    }

    /// Sets the key sent in an `Authenticate` message after every connect.
    pub fn authentication_key(mut self, key: impl Into<String>) -> Self {
        self.config.authentication_key = Some(key.into());
        self
    }

    /// Adds a topic to subscribe to after every connect. Topics are
    /// subscribed in the order they were added.
    pub fn initial_topic(mut self, topic: impl Into<Vec<u8>>) -> Self {
        self.config.initial_topics.push(topic.into());
        self
    }

    /// Sets the reconnect backoff: `min(base^failures, max)` milliseconds.
    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.config.backoff_base_ms = millis(base);
        self.config.max_backoff_ms = millis(max);
        self
    }

    /// Sets how long the connection may stay quiet before a keepalive.
    pub fn keepalive_period(mut self, period: Duration) -> Self {
        self.config.keepalive_period_ms = millis(period);
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Starts the client. It connects in the background; use
    /// [`Client::wait_ready`] to wait for the first connection.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// [`PubsubError::NoAddress`] if [`dial_tcp`](Self::dial_tcp) was never
    /// called.
    pub fn build(self) -> Result<Client, PubsubError> {
        let addr = self.addr.ok_or(PubsubError::NoAddress)?;
        tracing::debug!(%addr, "starting client");
        Ok(Client::new(self.config, TcpDialer::new(addr)))
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
