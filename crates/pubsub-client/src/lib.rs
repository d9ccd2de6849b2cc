//! Reconnecting publish/subscribe client.
//!
//! This crate is the connection-management core:
//!
//! 1. **Outbound queue**: a one-slot queue of [`Sendable`]s, so every write
//!    happens one at a time, in order, with backpressure on producers.
//! 2. **Connection manager**: one task that owns the connection, dials
//!    through a [`Dialer`](pubsub_transport::Dialer), sends the bootstrap
//!    messages, and retries forever with [`Backoff`].
//! 3. **Read loop**: one task per connection that decodes inbound messages
//!    and requests a reconnect when reading fails.
//! 4. **Keepalive**: a timer re-armed by every write that queues a
//!    keepalive after a quiet period.
//! 5. **Inbound queue**: a one-slot queue drained by [`Client::read`].
//!
//! # How it fits in the stack
//!
//! ```text
//! Application  ← subscribe / publish / read
//!     ↕
//! Client (this crate)  ← queues, reconnect, keepalive
//!     ↕
//! Protocol  ← Message framing
//!     ↕
//! Transport  ← Dialer produces byte streams
//! ```

mod backoff;
mod client;
mod config;
mod error;
mod inbound;
mod manager;
mod read_loop;
mod sendable;

pub use backoff::Backoff;
pub use client::Client;
pub use config::ClientConfig;
pub use error::ClientError;
pub use manager::ConnectionState;
pub use sendable::Sendable;

use tokio::sync::watch;

/// Resolves once shutdown has been signalled or the signalling side is gone.
pub(crate) async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
