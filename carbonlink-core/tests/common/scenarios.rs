//! Preset configurations and reading scripts
//!
//! Intervals are shortened so scenarios play out in a handful of ticks.

use core::time::Duration;

use carbonlink_core::errors::SensorError;
use carbonlink_core::traits::Reading;
use carbonlink_core::{DeviceConfig, Role};

/// Burner with a 5 s aggregate interval and a 10 s alert cooldown
pub fn fast_burner() -> DeviceConfig {
    DeviceConfig::for_role(Role::Burner)
        .with_aggregate_interval(Duration::from_secs(5))
        .with_heartbeat_interval(Duration::from_secs(60))
        .with_alert_cooldown(Duration::from_secs(10))
}

/// Creator with a 5 s aggregate interval
pub fn fast_creator() -> DeviceConfig {
    DeviceConfig::for_role(Role::Creator)
        .with_aggregate_interval(Duration::from_secs(5))
        .with_heartbeat_interval(Duration::from_secs(60))
}

/// CO2 ramp `start, start + step, ...` at constant humidity
pub fn ramp(start: f32, step: f32, n: usize) -> Vec<Result<Reading, SensorError>> {
    (0..n)
        .map(|i| Ok(Reading::new(start + step * i as f32, 50.0)))
        .collect()
}
