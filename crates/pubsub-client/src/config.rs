//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration for a [`Client`](crate::Client).
///
/// Durations are plain millisecond counts so the struct loads cleanly from
/// any serde format. `#[serde(default)]` fills missing fields from
/// [`Default`], so a config file only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base of the exponential reconnect backoff, in milliseconds.
    ///
    /// Default: 1000.
    pub backoff_base_ms: u64,

    /// Upper bound on any single backoff sleep, in milliseconds.
    ///
    /// Default: 60 000.
    pub max_backoff_ms: u64,

    /// Idle time after the last write before a keepalive is queued, in
    /// milliseconds.
    ///
    /// Default: 30 000.
    pub keepalive_period_ms: u64,

    /// Credential sent in an `Authenticate` message after every connect.
    pub authentication_key: Option<String>,

    /// Topics subscribed to after every connect, in order.
    pub initial_topics: Vec<Vec<u8>>,
}

impl ClientConfig {
    /// Default backoff base.
    pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1000;
    /// Default backoff cap.
    pub const DEFAULT_MAX_BACKOFF_MS: u64 = 60 * 1000;
    /// Default keepalive period.
    pub const DEFAULT_KEEPALIVE_PERIOD_MS: u64 = 30 * 1000;

    /// Replace every zero duration with its default.
    ///
    /// Called automatically by [`Client::new`](crate::Client::new). Zero is
    /// treated as "unset" rather than as a literal zero delay.
    pub fn validated(mut self) -> Self {
        fn or_default(field: &'static str, value: &mut u64, default: u64) {
            if *value == 0 {
                warn!(field, default, "zero duration in client config, using default");
                *value = default;
            }
        }

        or_default(
            "backoff_base_ms",
            &mut self.backoff_base_ms,
            Self::DEFAULT_BACKOFF_BASE_MS,
        );
        or_default(
            "max_backoff_ms",
            &mut self.max_backoff_ms,
            Self::DEFAULT_MAX_BACKOFF_MS,
        );
        or_default(
            "keepalive_period_ms",
            &mut self.keepalive_period_ms,
            Self::DEFAULT_KEEPALIVE_PERIOD_MS,
        );
        self
    }

    /// The backoff base as a `Duration`.
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// The backoff cap as a `Duration`.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// The keepalive period as a `Duration`.
    pub fn keepalive_period(&self) -> Duration {
        Duration::from_millis(self.keepalive_period_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: Self::DEFAULT_BACKOFF_BASE_MS,
            max_backoff_ms: Self::DEFAULT_MAX_BACKOFF_MS,
            keepalive_period_ms: Self::DEFAULT_KEEPALIVE_PERIOD_MS,
            authentication_key: None,
            initial_topics: Vec::new(),
        }
    }
}
