//! Pseudo-random sensor standing in for the NDIR CO2 and humidity cells.
//!
//! Each role draws from its own range: creators sit near outdoor
//! background, burners start elevated. Readings are whole numbers, like the
//! integer ppm values a real cell reports.

use std::ops::RangeInclusive;

use carbonlink_core::constants::sensors::{
    BURNER_CO2_MAX_PPM, BURNER_CO2_MIN_PPM, BURNER_HUMIDITY_MAX_PCT, BURNER_HUMIDITY_MIN_PCT,
    CREATOR_CO2_MAX_PPM, CREATOR_CO2_MIN_PPM, CREATOR_HUMIDITY_MAX_PCT, CREATOR_HUMIDITY_MIN_PCT,
};
use carbonlink_core::errors::SensorError;
use carbonlink_core::traits::{Reading, SensorProvider};
use carbonlink_core::Role;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform random readings with optional injected faults
pub struct SimulatedSensor {
    co2: RangeInclusive<f32>,
    humidity: RangeInclusive<f32>,
    fault_rate: f64,
    rng: StdRng,
}

impl SimulatedSensor {
    /// Sensor for `role`; a seed makes the sequence reproducible
    pub fn for_role(role: Role, seed: Option<u64>) -> Self {
        let (co2, humidity) = match role {
            Role::Creator => (
                CREATOR_CO2_MIN_PPM..=CREATOR_CO2_MAX_PPM,
                CREATOR_HUMIDITY_MIN_PCT..=CREATOR_HUMIDITY_MAX_PCT,
            ),
            Role::Burner => (
                BURNER_CO2_MIN_PPM..=BURNER_CO2_MAX_PPM,
                BURNER_HUMIDITY_MIN_PCT..=BURNER_HUMIDITY_MAX_PCT,
            ),
        };

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            co2,
            humidity,
            fault_rate: 0.0,
            rng,
        }
    }

    /// Fail this fraction of reads with a timeout
    pub fn with_fault_rate(mut self, rate: f64) -> Self {
        self.fault_rate = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 0.0 };
        self
    }
}

impl SensorProvider for SimulatedSensor {
    fn sample(&mut self) -> Result<Reading, SensorError> {
        if self.fault_rate > 0.0 && self.rng.gen_bool(self.fault_rate) {
            return Err(SensorError::Timeout);
        }

        let co2 = self.rng.gen_range(self.co2.clone()).round();
        let humidity = self.rng.gen_range(self.humidity.clone()).round();
        Ok(Reading::new(co2, humidity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_stay_in_role_range() {
        let mut sensor = SimulatedSensor::for_role(Role::Burner, Some(7));
        for _ in 0..500 {
            let r = sensor.sample().unwrap();
            assert!((800.0..=3000.0).contains(&r.co2), "co2 {}", r.co2);
            assert!((40.0..=90.0).contains(&r.humidity), "humidity {}", r.humidity);
            assert_eq!(r.co2.fract(), 0.0);
        }

        let mut sensor = SimulatedSensor::for_role(Role::Creator, Some(7));
        for _ in 0..500 {
            let r = sensor.sample().unwrap();
            assert!((300.0..=2000.0).contains(&r.co2));
            assert!((20.0..=80.0).contains(&r.humidity));
        }
    }

    #[test]
    fn seeded_sensors_repeat() {
        let mut a = SimulatedSensor::for_role(Role::Creator, Some(42));
        let mut b = SimulatedSensor::for_role(Role::Creator, Some(42));
        for _ in 0..20 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn fault_rate_extremes() {
        let mut always = SimulatedSensor::for_role(Role::Creator, Some(1)).with_fault_rate(1.0);
        assert_eq!(always.sample(), Err(SensorError::Timeout));

        let mut clamped = SimulatedSensor::for_role(Role::Creator, Some(1)).with_fault_rate(7.0);
        assert_eq!(clamped.sample(), Err(SensorError::Timeout));

        let mut never = SimulatedSensor::for_role(Role::Creator, Some(1)).with_fault_rate(f64::NAN);
        assert!(never.sample().is_ok());
    }
}
