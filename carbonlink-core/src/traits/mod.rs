//! Collaborator Traits for the Telemetry Core
//!
//! The scheduler touches the outside world through exactly three seams:
//!
//! - [`time`] - monotonic time source that drives every timer
//! - [`sensor`] - provider of raw CO2/humidity readings
//! - [`transport`] - publisher of finished payload records plus link status
//!
//! Everything behind these traits (ADC handles, sockets, broker sessions) is
//! the implementor's concern. The core calls them synchronously, once per
//! tick at most, and expects each call to return within a bounded time.
//!
//! ## Usage Example
//!
//! ```rust
//! use carbonlink_core::traits::{Reading, SensorProvider};
//! use carbonlink_core::errors::SensorError;
//!
//! struct FixedSensor(f32);
//!
//! impl SensorProvider for FixedSensor {
//!     fn sample(&mut self) -> Result<Reading, SensorError> {
//!         Ok(Reading::new(self.0, 50.0))
//!     }
//! }
//! ```

pub mod sensor;
pub mod time;
pub mod transport;

pub use sensor::{Reading, SensorProvider};
pub use time::TimeSource;
pub use transport::{TelemetryPublisher, TransportStatus};
