//! Error Types for the Telemetry Core
//!
//! ## Design Philosophy
//!
//! The core never halts. Every failure is either something the scheduler
//! degrades around (a bad sensor read, a dropped publish) or a logic error
//! the caller must check (an empty window, a negative credit amount).
//!
//! 1. **Small Size**: Variants carry only numbers and `&'static str` reasons,
//!    so every error is `Copy` and cheap to return from the tick path.
//!
//! 2. **No Heap Allocation**: Transport crates convert their rich errors into
//!    these at the trait boundary.
//!
//! 3. **One enum per seam**: aggregator, ledger, config, sensor, publish and
//!    connect errors never share a type, so a `match` can't confuse them.
//!
//! ## Error Categories
//!
//! ### Transient (scheduler recovers)
//! - `SensorError`: reuse the last reading
//! - `PublishError`: skip this dispatch, keep the window
//! - `ConnectError`: retry on the reconnect backoff
//!
//! ### Logic (surfaced to the caller)
//! - `AggregateError::EmptyWindow`: nothing to summarize yet
//! - `LedgerError::InvalidAmount`: negative or non-finite credit amount
//! - `ConfigError`: rejected at construction
//!
//! ## Handling Strategy
//!
//! ```rust
//! use carbonlink_core::{CreditLedger, LedgerError};
//!
//! let mut ledger = CreditLedger::new(10.0, false);
//! match ledger.generate(-1.0) {
//!     Ok(result) => println!("balance now {}", result.new_total),
//!     Err(LedgerError::InvalidAmount { amount }) => {
//!         // Reject upstream, ledger untouched
//!         assert_eq!(amount, -1.0);
//!     }
//! }
//! ```

use thiserror_no_std::Error;

/// Summarizing an aggregation window failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateError {
    /// No valid samples since the last reset
    #[error("Aggregation window is empty")]
    EmptyWindow,
}

/// Credit ledger rejected an operation
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum LedgerError {
    /// Amount was negative, NaN or infinite
    #[error("Invalid credit amount {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f32,
    },
}

/// Sensor provider could not produce a reading
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Sensor did not answer in time
    #[error("Sensor read timed out")]
    Timeout,

    /// Sensor answered with garbage
    #[error("Sensor returned invalid data: {reason}")]
    InvalidData {
        /// What was wrong with the data
        reason: &'static str,
    },

    /// Sensor is not available at all
    #[error("Sensor unavailable")]
    Unavailable,
}

/// Publishing a payload failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// Transport has no live connection
    #[error("Transport not connected")]
    NotConnected,

    /// Broker or endpoint refused the message
    #[error("Publish rejected: {reason}")]
    Rejected {
        /// Why the message was refused
        reason: &'static str,
    },

    /// Payload could not be encoded
    #[error("Payload encoding failed")]
    Encoding,

    /// Transport did not confirm within its time bound
    #[error("Publish timed out")]
    Timeout,
}

/// Reconnecting the transport failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectError {
    /// Connection attempt was refused
    #[error("Connection refused: {reason}")]
    Refused {
        /// Reason reported by the transport
        reason: &'static str,
    },

    /// Connection attempt did not finish in time
    #[error("Connection attempt timed out")]
    Timeout,
}

/// Device configuration is unusable
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Aggregation window must hold at least one sample
    #[error("Window capacity must be at least 1")]
    ZeroCapacity,

    /// An interval that drives a timer was zero
    #[error("Interval `{name}` must be non-zero")]
    ZeroInterval {
        /// Configuration field name
        name: &'static str,
    },

    /// A threshold, rate or amount was negative or non-finite
    #[error("Value for `{name}` is invalid: {value}")]
    InvalidValue {
        /// Configuration field name
        name: &'static str,
        /// The offending value
        value: f32,
    },
}
