//! # pubsub
//!
//! A long-lived publish/subscribe client that keeps one connection to a
//! broker alive for as long as it runs.
//!
//! The client connects at start-up, authenticates and subscribes to its
//! initial topics after every connect, reconnects with exponential backoff
//! whenever the connection fails, and sends keepalives when the link has
//! been quiet. Outbound messages go through a single writer in the order
//! they were queued; inbound messages are handed out one at a time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pubsub::prelude::*;
//!
//! # async fn run() -> Result<(), PubsubError> {
//! let client = ClientBuilder::new()
//!     .dial_tcp("127.0.0.1:14080")
//!     .authentication_key("secret")
//!     .initial_topic("news")
//!     .build()?;
//!
//! client.publish("news", "hello").send().await?;
//! let message = client.read().await?;
//! println!("{:?}", message.body());
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;
pub mod logging;

pub use builder::ClientBuilder;
pub use error::PubsubError;

/// Everything an application usually needs.
pub mod prelude {
    pub use crate::{ClientBuilder, PubsubError};
    pub use pubsub_client::{Client, ClientConfig, ClientError, ConnectionState, Sendable};
    pub use pubsub_protocol::{Message, MessageType, utf8};
    pub use pubsub_transport::{Dialer, TcpDialer};
}

pub use pubsub_client as client;
pub use pubsub_protocol as protocol;
pub use pubsub_transport as transport;
