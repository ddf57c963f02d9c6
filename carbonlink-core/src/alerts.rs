//! Threshold Alerts with Per-Channel Cooldown
//!
//! Two questions are kept apart:
//!
//! 1. *Is this condition alert-worthy?* - [`AlertEvaluator::evaluate`], a pure
//!    function of the current reading and ledger balance.
//! 2. *May we notify now?* - [`AlertState`], one per alert kind, owned by the
//!    scheduler and gated by a cooldown.
//!
//! ## Priority
//!
//! When the reading is critical and credits are low at the same time, only
//! [`AlertKind::CriticalHighReading`] is reported. The reading is checked
//! first; the credit balance only matters when the air is safe.
//!
//! ```rust
//! use carbonlink_core::alerts::{AlertEvaluator, AlertKind};
//! use carbonlink_core::traits::Reading;
//! use carbonlink_core::CreditLedger;
//!
//! let evaluator = AlertEvaluator::new(2500.0, 5.0);
//! let ledger = CreditLedger::new(1.0, false);
//! let alert = evaluator.evaluate(&Reading::new(2600.0, 50.0), &ledger.state());
//! assert_eq!(alert, Some(AlertKind::CriticalHighReading));
//! ```

use core::time::Duration;

use crate::constants::{CRITICAL_CO2_THRESHOLD_PPM, CRITICAL_CREDITS_THRESHOLD};
use crate::ledger::LedgerState;
use crate::time::{has_elapsed, Timestamp};
use crate::traits::Reading;

/// Kind of alert a device can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    /// CO2 above the critical threshold
    CriticalHighReading,
    /// Credit balance below the critical threshold
    LowCredits,
}

impl AlertKind {
    /// All kinds, in evaluation priority order
    pub const ALL: [AlertKind; 2] = [AlertKind::CriticalHighReading, AlertKind::LowCredits];

    /// Identifier sent in the `alert_type` field
    pub const fn wire_name(&self) -> &'static str {
        match self {
            AlertKind::CriticalHighReading => "HIGH_CO2",
            AlertKind::LowCredits => "LOW_CREDITS",
        }
    }

    /// Human-readable message sent with the alert
    pub const fn message(&self) -> &'static str {
        match self {
            AlertKind::CriticalHighReading => "Dangerous CO2 levels detected!",
            AlertKind::LowCredits => "Critical low carbon credits!",
        }
    }

    /// Slot of this kind in per-kind arrays
    pub(crate) const fn index(&self) -> usize {
        match self {
            AlertKind::CriticalHighReading => 0,
            AlertKind::LowCredits => 1,
        }
    }
}

/// Stateless threshold policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertEvaluator {
    /// CO2 (ppm) strictly above which a reading is critical
    pub critical_reading_threshold: f32,
    /// Balance strictly below which credits are critically low
    pub critical_credits_threshold: f32,
}

impl AlertEvaluator {
    /// Create an evaluator with explicit thresholds
    pub const fn new(critical_reading_threshold: f32, critical_credits_threshold: f32) -> Self {
        Self {
            critical_reading_threshold,
            critical_credits_threshold,
        }
    }

    /// Classify the current condition, if it warrants an alert
    pub fn evaluate(&self, reading: &Reading, ledger: &LedgerState) -> Option<AlertKind> {
        if reading.co2 > self.critical_reading_threshold {
            Some(AlertKind::CriticalHighReading)
        } else if ledger.available < self.critical_credits_threshold {
            Some(AlertKind::LowCredits)
        } else {
            None
        }
    }
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::new(CRITICAL_CO2_THRESHOLD_PPM, CRITICAL_CREDITS_THRESHOLD)
    }
}

/// Cooldown bookkeeping for one alert kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertState {
    /// When this kind last fired, if ever
    pub last_fired_at: Option<Timestamp>,
    /// Minimum spacing between two fires
    pub cooldown: Duration,
}

impl AlertState {
    /// Create a state that has never fired
    pub const fn new(cooldown: Duration) -> Self {
        Self {
            last_fired_at: None,
            cooldown,
        }
    }

    /// Whether a fire at `now` respects the cooldown
    pub fn ready(&self, now: Timestamp) -> bool {
        match self.last_fired_at {
            None => true,
            Some(last) => has_elapsed(last, now, self.cooldown),
        }
    }

    /// Record a fire at `now`
    pub fn record(&mut self, now: Timestamp) {
        self.last_fired_at = Some(now);
    }
}
