//! Reconnect backoff: `min(base^failures, max)` milliseconds.

use std::time::Duration;

/// Tracks one backoff burst: consecutive failures since the last success.
///
/// The delay grows as `base^n` but is carried as a running product clamped
/// at `max`, so an outage of any length never overflows the exponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    failures: u32,
    current_ms: u64,
}

impl Backoff {
    /// Creates a backoff with no recorded failures.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base_ms: millis(base),
            max_ms: millis(max),
            failures: 0,
            current_ms: 0,
        }
    }

    /// Delay before the next attempt. Zero while no failure has been
    /// recorded, so the first attempt of a burst is immediate.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.current_ms)
    }

    /// Records a failed attempt, growing the next delay.
    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
        let grown = if self.failures == 1 {
            self.base_ms
        } else {
            self.current_ms.saturating_mul(self.base_ms)
        };
        self.current_ms = grown.min(self.max_ms);
    }

    /// Ends the burst after a success.
    pub fn reset(&mut self) {
        self.failures = 0;
        self.current_ms = 0;
    }

    /// Consecutive failures in the current burst.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff(base_ms: u64, max_ms: u64) -> Backoff {
        Backoff::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms))
    }

    #[test]
    fn test_first_attempt_has_no_delay() {
        assert_eq!(backoff(1000, 60_000).delay(), Duration::ZERO);
    }

    #[test]
    fn test_delay_is_base_to_the_failure_count() {
        let mut b = backoff(10, 1_000_000);
        let mut seen = Vec::new();
        for _ in 0..4 {
            b.record_failure();
            seen.push(b.delay().as_millis());
        }
        assert_eq!(seen, vec![10, 100, 1_000, 10_000]);
    }

    #[test]
    fn test_default_settings_cap_at_second_failure() {
        let mut b = backoff(1000, 60_000);
        b.record_failure();
        assert_eq!(b.delay(), Duration::from_millis(1000));
        b.record_failure();
        assert_eq!(b.delay(), Duration::from_millis(60_000));
    }

    #[test]
    fn test_delays_are_monotonic_and_capped() {
        let mut b = backoff(3, 5_000);
        let mut previous = Duration::ZERO;
        for _ in 0..50 {
            b.record_failure();
            let d = b.delay();
            assert!(d >= previous);
            assert!(d <= Duration::from_millis(5_000));
            previous = d;
        }
        assert_eq!(previous, Duration::from_millis(5_000));
    }

    #[test]
    fn test_long_outage_does_not_overflow() {
        let mut b = backoff(1000, 60_000);
        for _ in 0..100_000 {
            b.record_failure();
        }
        assert_eq!(b.failures(), 100_000);
        assert_eq!(b.delay(), Duration::from_millis(60_000));
    }

    #[test]
    fn test_reset_starts_a_fresh_burst() {
        let mut b = backoff(100, 1_000);
        b.record_failure();
        b.record_failure();
        b.reset();
        assert_eq!(b.failures(), 0);
        assert_eq!(b.delay(), Duration::ZERO);
        b.record_failure();
        assert_eq!(b.delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_huge_durations_saturate() {
        let mut b = Backoff::new(Duration::MAX, Duration::MAX);
        b.record_failure();
        assert_eq!(b.delay(), Duration::from_millis(u64::MAX));
        b.record_failure();
        assert_eq!(b.delay(), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_base_of_one_stays_at_one() {
        let mut b = backoff(1, 60_000);
        for _ in 0..10 {
            b.record_failure();
            assert_eq!(b.delay(), Duration::from_millis(1));
        }
    }
}
