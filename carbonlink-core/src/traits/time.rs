//! Time Source Abstraction
//!
//! The scheduler reads the time exactly once per tick and uses that single
//! value for every timer decision in the tick, so all steps of a tick agree
//! on "now".
//!
//! ## Common Implementations
//!
//! - `MonotonicClock`: `std::time::Instant` based, for the device binary
//! - `MockTimeSource`: shared counter advanced by tests
//!
//! ## Example Implementation
//!
//! ```rust
//! use carbonlink_core::traits::TimeSource;
//! use carbonlink_core::time::Timestamp;
//!
//! struct TickCounter {
//!     ticks: u64,
//! }
//!
//! impl TimeSource for TickCounter {
//!     fn now(&self) -> Timestamp {
//!         self.ticks * 10 // 100 Hz RTOS tick
//!     }
//! }
//! ```

use crate::time::Timestamp;

/// Source of time for the tick loop
///
/// Timers assume `now()` never decreases. Wall clock sources can step
/// backwards under NTP and should not drive the scheduler.
pub trait TimeSource: Send {
    /// Current timestamp in milliseconds
    ///
    /// - Monotonic sources: milliseconds since boot
    /// - Test sources: arbitrary starting point
    fn now(&self) -> Timestamp;
}
