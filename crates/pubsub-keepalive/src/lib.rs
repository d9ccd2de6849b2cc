//! Keepalive timer for the pubsub client.
//!
//! Keeps at most one keepalive pending. Every real write calls
//! [`KeepaliveScheduler::reset`], which cancels the pending keepalive and
//! arms a fresh one a full period later, so an active connection never
//! sends keepalives at all. When a timer does fire it pushes a value onto
//! the client's outbound queue, exactly like an application send.
//!
//! # Integration
//!
//! The scheduler is owned by the connection manager task, the only place
//! writes happen:
//!
//! ```ignore
//! let mut keepalive = KeepaliveScheduler::new(config, outbound_tx.clone(), Op::KeepAlive);
//! loop {
//!     let op = outbound_rx.recv().await?;
//!     keepalive.reset();
//!     write(op).await?;
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the keepalive scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepaliveConfig {
    /// How long the connection may stay idle before a keepalive is queued.
    pub period: Duration,
}

impl KeepaliveConfig {
    /// Period used when none (or zero) is configured.
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(30);

    /// Create a config for a specific period.
    pub fn with_period(period: Duration) -> Self {
        Self { period }
    }

    /// Replace a zero period with [`Self::DEFAULT_PERIOD`].
    ///
    /// Called automatically by [`KeepaliveScheduler::new`]. A zero period
    /// would re-arm instantly after every write and flood the connection.
    pub fn validated(mut self) -> Self {
        if self.period.is_zero() {
            warn!(
                default_ms = Self::DEFAULT_PERIOD.as_millis() as u64,
                "keepalive period is zero, using default"
            );
            self.period = Self::DEFAULT_PERIOD;
        }
        self
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            period: Self::DEFAULT_PERIOD,
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters for the keepalive scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeepaliveMetrics {
    /// Number of times the timer was (re)armed.
    pub total_resets: u64,
    /// Number of timers that ran to completion and queued a keepalive.
    pub total_fired: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Single-slot keepalive timer.
///
/// Generic over the queued value `T` so it can feed any outbound queue.
/// The pending timer runs as its own Tokio task; `reset` aborts it before
/// spawning the next, so two keepalives are never armed at once.
pub struct KeepaliveScheduler<T> {
    config: KeepaliveConfig,
    sender: mpsc::Sender<T>,
    tick: T,
    pending: Option<JoinHandle<()>>,
    total_resets: u64,
    /// Shared with the timer tasks, which bump it when they fire.
    fired: Arc<AtomicU64>,
}

impl<T> KeepaliveScheduler<T>
where
    T: Clone + Send + 'static,
{
    /// Create a scheduler that pushes a clone of `tick` onto `sender` each
    /// time a timer fires. No timer is armed until the first
    /// [`reset`](Self::reset).
    pub fn new(config: KeepaliveConfig, sender: mpsc::Sender<T>, tick: T) -> Self {
        let config = config.validated();
        debug!(
            period_ms = config.period.as_millis() as u64,
            "keepalive scheduler created"
        );
        Self {
            config,
            sender,
            tick,
            pending: None,
            total_resets: 0,
            fired: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cancel the pending keepalive (if any) and arm a new one a full
    /// period from now.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn reset(&mut self) {
        self.cancel();

        let period = self.config.period;
        let sender = self.sender.clone();
        let tick = self.tick.clone();
        let fired = Arc::clone(&self.fired);

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(period).await;
            fired.fetch_add(1, Ordering::Relaxed);
            debug!("keepalive due, queueing");
            // Same one-slot backpressure as an application send. A closed
            // queue means the client is gone.
            if sender.send(tick).await.is_err() {
                trace!("outbound queue closed, keepalive dropped");
            }
        }));
        self.total_resets += 1;
        trace!(resets = self.total_resets, "keepalive rescheduled");
    }

    /// Cancel the pending keepalive without arming a new one.
    ///
    /// Safe to call when nothing is pending or the timer already fired.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a keepalive timer is armed and hasn't finished yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// The configured period.
    pub fn period(&self) -> Duration {
        self.config.period
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> KeepaliveMetrics {
        KeepaliveMetrics {
            total_resets: self.total_resets,
            total_fired: self.fired.load(Ordering::Relaxed),
        }
    }
}

impl<T> Drop for KeepaliveScheduler<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
