//! Integration tests for the keepalive scheduler.
//!
//! Uses `start_paused = true` so Tokio's clock only moves when every task
//! is idle, which makes the timer deterministic.

use std::time::Duration;

use pubsub_keepalive::{KeepaliveConfig, KeepaliveScheduler};
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

const PERIOD: Duration = Duration::from_secs(30);

fn scheduler(
    capacity: usize,
) -> (KeepaliveScheduler<&'static str>, mpsc::Receiver<&'static str>) {
    let (tx, rx) = mpsc::channel(capacity);
    let s = KeepaliveScheduler::new(KeepaliveConfig::with_period(PERIOD), tx, "keepalive");
    (s, rx)
}

// =========================================================================
// KeepaliveConfig
// =========================================================================

#[test]
fn test_default_period_is_thirty_seconds() {
    assert_eq!(KeepaliveConfig::default().period, Duration::from_secs(30));
}

#[test]
fn test_zero_period_falls_back_to_default() {
    let cfg = KeepaliveConfig::with_period(Duration::ZERO).validated();
    assert_eq!(cfg.period, KeepaliveConfig::DEFAULT_PERIOD);
}

// =========================================================================
// Firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_nothing_fires_before_first_reset() {
    let (s, mut rx) = scheduler(1);
    assert!(!s.is_pending());

    tokio::time::sleep(PERIOD * 3).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(s.metrics().total_fired, 0);
}

#[tokio::test(start_paused = true)]
async fn test_fires_once_after_period() {
    let (mut s, mut rx) = scheduler(1);
    s.reset();
    assert!(s.is_pending());

    tokio::time::sleep(PERIOD - Duration::from_millis(1)).await;
    assert!(rx.try_recv().is_err(), "must not fire early");

    let got = tokio::time::timeout(Duration::from_millis(10), rx.recv())
        .await
        .expect("keepalive should fire at the period");
    assert_eq!(got, Some("keepalive"));

    // One shot: nothing more without another reset.
    tokio::time::sleep(PERIOD * 2).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(s.metrics().total_fired, 1);
    assert!(!s.is_pending());
}

#[tokio::test(start_paused = true)]
async fn test_reset_before_deadline_suppresses_keepalive() {
    let (mut s, mut rx) = scheduler(1);
    s.reset();

    // A real send 20s in pushes the deadline out to t=50s.
    tokio::time::sleep(Duration::from_secs(20)).await;
    s.reset();

    tokio::time::sleep(Duration::from_secs(15)).await; // t=35s
    assert!(rx.try_recv().is_err(), "superseded deadline must not fire");
    assert_eq!(s.metrics().total_fired, 0);

    tokio::time::sleep(Duration::from_secs(16)).await; // t=51s
    assert_eq!(rx.try_recv().ok(), Some("keepalive"));
    assert_eq!(s.metrics().total_resets, 2);
    assert_eq!(s.metrics().total_fired, 1);
}

#[tokio::test(start_paused = true)]
async fn test_many_resets_leave_a_single_timer() {
    let (mut s, mut rx) = scheduler(8);
    for _ in 0..5 {
        s.reset();
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    tokio::time::sleep(PERIOD * 2).await;
    assert_eq!(rx.try_recv().ok(), Some("keepalive"));
    assert!(rx.try_recv().is_err(), "stacked keepalives must not fire");
}

// =========================================================================
// Cancellation and backpressure
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_is_idempotent() {
    let (mut s, mut rx) = scheduler(1);
    s.cancel();
    s.reset();
    s.cancel();
    s.cancel();
    assert!(!s.is_pending());

    tokio::time::sleep(PERIOD * 2).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_fired_keepalive_waits_for_free_slot() {
    let (tx, mut rx) = mpsc::channel(1);
    tx.send("filler").await.unwrap();
    let mut s = KeepaliveScheduler::new(KeepaliveConfig::with_period(PERIOD), tx, "keepalive");
    s.reset();

    tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
    assert_eq!(s.metrics().total_fired, 1);
    // The slot still holds the earlier item; the keepalive is blocked
    // behind it, not dropped.
    assert_eq!(rx.recv().await, Some("filler"));
    assert_eq!(rx.recv().await, Some("keepalive"));
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels_pending_timer() {
    let (mut s, mut rx) = scheduler(1);
    s.reset();
    drop(s);

    tokio::time::sleep(PERIOD * 2).await;
    // The scheduler held the last sender clone outside the aborted task,
    // so the channel is now closed and empty.
    assert_eq!(rx.recv().await, None);
}
