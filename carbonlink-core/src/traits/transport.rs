//! Transport abstraction
//!
//! Split in two so a test double can script link state and publish results
//! independently:
//!
//! - [`TelemetryPublisher`] hands one finished [`Record`] to the wire
//! - [`TransportStatus`] reports link state and performs reconnects
//!
//! The scheduler checks `is_connected()` before every dispatch and only
//! calls `reconnect()` on its own backoff timer, never every tick.
//!
//! ## Implementation Requirements
//!
//! - `publish()` must be bounded in time (timeout or fire-and-forget)
//! - `reconnect()` must give up after a bounded wait
//! - `Ok(())` from `publish()` means the transport accepted the message;
//!   the scheduler resets the aggregation window on it

use crate::errors::{ConnectError, PublishError};
use crate::payload::{Channel, Record};

/// Sink for telemetry payloads
pub trait TelemetryPublisher {
    /// Publish one record on a channel
    fn publish(&mut self, channel: Channel, payload: &Record) -> Result<(), PublishError>;
}

/// Link state of the transport
pub trait TransportStatus {
    /// Whether a publish has a chance of succeeding right now
    fn is_connected(&self) -> bool;

    /// Try to re-establish the link, bounded in time
    fn reconnect(&mut self) -> Result<(), ConnectError>;

    /// Received signal strength in dBm, when the link reports one
    fn signal_strength(&self) -> Option<i32> {
        None
    }
}
