//! Constants for the CarbonLink Core
//!
//! Default values for every policy knob in [`DeviceConfig`](crate::DeviceConfig).
//! The numbers come from the field firmware the simulator replaces; each is
//! overridable through configuration.
//!
//! ## Organization
//!
//! - **Time**: tick period and dispatch intervals
//! - **Credits**: ledger policy and per-role conversion rates
//! - **Sensors**: alert thresholds and simulated reading ranges
//! - **Buffers**: window and payload sizes

/// Tick period, dispatch intervals and backoffs.
pub mod time;

/// Credit ledger policy and per-role conversion factors.
pub mod credits;

/// Alert thresholds and simulated sensor ranges.
pub mod sensors;

/// Aggregation window and payload record sizes.
pub mod buffers;

pub use time::{
    DEFAULT_TICK_PERIOD_MS, AGGREGATE_PUBLISH_INTERVAL_MS, HEARTBEAT_INTERVAL_MS,
    ALERT_COOLDOWN_MS, RECONNECT_BACKOFF_MS,
};

pub use credits::{
    NEGLIGIBLE_BURN_EPSILON, REPLENISH_THRESHOLD, REPLENISH_AMOUNT,
};

pub use sensors::{
    CRITICAL_CO2_THRESHOLD_PPM, CRITICAL_CREDITS_THRESHOLD,
};

pub use buffers::{
    DEFAULT_WINDOW_CAPACITY, MAX_RECORD_FIELDS,
};
