//! Sensor provider abstraction
//!
//! Real devices read an NDIR CO2 cell and a capacitive humidity sensor;
//! simulated devices roll dice. The scheduler does not care which, it asks
//! for one [`Reading`] per tick and stamps it with its own clock.

use crate::errors::SensorError;

/// Raw reading from the sensor provider, before it is timestamped
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// CO2 concentration in ppm
    pub co2: f32,
    /// Relative humidity in percent
    pub humidity: f32,
}

impl Reading {
    /// Build a reading from CO2 ppm and humidity percent
    pub const fn new(co2: f32, humidity: f32) -> Self {
        Self { co2, humidity }
    }

    /// Both channels are finite numbers
    pub fn is_valid(&self) -> bool {
        self.co2.is_finite() && self.humidity.is_finite()
    }
}

/// Source of CO2/humidity readings, polled once per tick
///
/// Implementations must return promptly. A failed read is not fatal: the
/// scheduler falls back to the last good reading.
pub trait SensorProvider {
    /// Take one reading
    fn sample(&mut self) -> Result<Reading, SensorError>;
}

impl<S: SensorProvider + ?Sized> SensorProvider for &mut S {
    fn sample(&mut self) -> Result<Reading, SensorError> {
        (**self).sample()
    }
}
