//! Time management for the tick loop
//!
//! All timers compare against a monotonic millisecond counter, never the
//! wall clock, so an NTP step can't double-fire a heartbeat or skip an
//! aggregate publish.
//!
//! Provides:
//! - `MonotonicClock` (std): milliseconds since the clock was created
//! - `MockTimeSource`: shared, manually advanced clock for tests
//! - `Schedule`: an interval timer that never fires early

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;

pub use crate::traits::TimeSource;

/// Timestamp in milliseconds since device boot
pub type Timestamp = u64;

/// Milliseconds elapsed from `earlier` to `later`, zero if time went backwards
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}

/// Whether at least `interval` has passed since `since`
pub fn has_elapsed(since: Timestamp, now: Timestamp, interval: Duration) -> bool {
    u128::from(elapsed_ms(since, now)) >= interval.as_millis()
}

/// Monotonic clock backed by `std::time::Instant`
///
/// Starts at 0 when created and only ever increases.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    /// Create a clock whose epoch is now
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }
}

/// Manually driven clock for deterministic tests
///
/// Clones share the same counter, so a test can keep one handle and hand
/// another to the scheduler:
///
/// ```rust
/// use carbonlink_core::time::{MockTimeSource, TimeSource};
///
/// let clock = MockTimeSource::new(0);
/// let handle = clock.clone();
/// handle.advance(1_500);
/// assert_eq!(clock.now(), 1_500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTimeSource {
    millis: Arc<AtomicU64>,
}

impl MockTimeSource {
    /// Create a mock clock starting at `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, timestamp: Timestamp) {
        self.millis.store(timestamp, Ordering::Relaxed);
    }

    /// Move forward by `ms` milliseconds
    pub fn advance(&self, ms: u64) {
        self.millis.fetch_add(ms, Ordering::Relaxed);
    }

    /// Move forward by a duration
    pub fn advance_by(&self, duration: Duration) {
        self.advance(duration.as_millis() as u64);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.millis.load(Ordering::Relaxed)
    }
}

/// Fixed-interval timer for one kind of periodic action
///
/// Fires when `now - last_fired_at >= interval`. Firing moves
/// `last_fired_at` to `now`, not to the ideal deadline, so a late tick
/// never causes a burst of catch-up fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Minimum spacing between fires
    pub interval: Duration,
    /// When this action last fired (or when the schedule was created)
    pub last_fired_at: Timestamp,
}

impl Schedule {
    /// Create a schedule whose first fire is one interval after `start`
    pub const fn new(interval: Duration, start: Timestamp) -> Self {
        Self {
            interval,
            last_fired_at: start,
        }
    }

    /// Whether the action is due at `now`
    pub fn is_due(&self, now: Timestamp) -> bool {
        has_elapsed(self.last_fired_at, now, self.interval)
    }

    /// Check and, if due, mark as fired at `now`
    pub fn fire_if_due(&mut self, now: Timestamp) -> bool {
        if self.is_due(now) {
            self.last_fired_at = now;
            true
        } else {
            false
        }
    }

    /// Milliseconds until the next fire (zero when already due)
    pub fn remaining_ms(&self, now: Timestamp) -> u64 {
        let interval = self.interval.as_millis() as u64;
        interval.saturating_sub(elapsed_ms(self.last_fired_at, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_clock_shares_state() {
        let clock = MockTimeSource::new(1000);
        let other = clock.clone();

        other.advance(500);
        assert_eq!(clock.now(), 1500);

        clock.set(10);
        assert_eq!(other.now(), 10);
    }

    #[test]
    fn elapsed_saturates_backwards() {
        assert_eq!(elapsed_ms(2000, 1000), 0);
        assert_eq!(elapsed_ms(1000, 2500), 1500);
    }

    #[test]
    fn schedule_never_fires_early() {
        let mut schedule = Schedule::new(Duration::from_secs(15), 0);

        assert!(!schedule.fire_if_due(14_999));
        assert_eq!(schedule.remaining_ms(14_999), 1);
        assert!(schedule.fire_if_due(15_000));
        assert_eq!(schedule.last_fired_at, 15_000);

        // Late tick: next deadline counts from the actual fire
        assert!(!schedule.fire_if_due(29_999));
        assert!(schedule.fire_if_due(30_000));
    }

    #[cfg(feature = "std")]
    #[test]
    fn monotonic_clock_starts_near_zero() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        assert!(first < 1000);
        assert!(clock.now() >= first);
    }
}
