//! Telemetry core for CarbonLink devices
//!
//! Every simulated device, whether it sequesters CO2 ("creator") or emits it
//! ("burner"), runs the same control loop:
//!
//! ```text
//! sample → aggregate → ledger → alert → dispatch
//! ```
//!
//! This crate owns that loop. It keeps a fixed-capacity window of readings,
//! a local carbon-credit ledger, per-channel alert cooldowns and the interval
//! timers that decide when telemetry goes out. Sensors and transports are
//! collaborators behind traits, so the whole loop runs deterministically in
//! tests with a mock clock.
//!
//! Key constraints:
//! - Single owner, no shared mutable state
//! - No operation blocks; suspension happens only between ticks
//! - Payload records are fixed-size, no heap in the dispatch path
//!
//! ```no_run
//! use carbonlink_core::{DeviceConfig, Role, TickScheduler};
//! use carbonlink_core::time::MonotonicClock;
//! # use carbonlink_core::traits::{SensorProvider, Reading, TelemetryPublisher, TransportStatus};
//! # use carbonlink_core::payload::{Channel, Record};
//! # use carbonlink_core::errors::{SensorError, PublishError, ConnectError};
//! # struct Sensor;
//! # impl SensorProvider for Sensor {
//! #     fn sample(&mut self) -> Result<Reading, SensorError> { Ok(Reading::new(420.0, 45.0)) }
//! # }
//! # struct Link;
//! # impl TelemetryPublisher for Link {
//! #     fn publish(&mut self, _: Channel, _: &Record) -> Result<(), PublishError> { Ok(()) }
//! # }
//! # impl TransportStatus for Link {
//! #     fn is_connected(&self) -> bool { true }
//! #     fn reconnect(&mut self) -> Result<(), ConnectError> { Ok(()) }
//! # }
//!
//! let config = DeviceConfig::for_role(Role::Burner);
//! let mut scheduler = TickScheduler::new(config, Sensor, Link, MonotonicClock::new()).unwrap();
//!
//! let report = scheduler.tick();
//! println!("{:?}", report.aggregate);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

#[macro_use]
mod logging;

pub mod aggregator;
pub mod alerts;
pub mod config;
pub mod constants;
pub mod errors;
pub mod ledger;
pub mod payload;
pub mod scheduler;
pub mod time;
pub mod traits;

// Public API
pub use aggregator::{AggregateReport, Sample, SlidingAggregator};
pub use alerts::{AlertEvaluator, AlertKind, AlertState};
pub use config::{CreditFigures, DeviceConfig, Role, RoleProfile};
pub use errors::{AggregateError, ConfigError, ConnectError, LedgerError, PublishError, SensorError};
pub use ledger::{BurnResult, CreditLedger, GenerateResult, LedgerState};
pub use payload::{Channel, Record, Scalar};
pub use scheduler::{
    DeviceState, DispatchOutcome, LedgerAction, ReadingSource, TickReport, TickScheduler,
};

#[cfg(feature = "std")]
pub use scheduler::TickDriver;

/// Crate version, reported by the device binary at startup
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
