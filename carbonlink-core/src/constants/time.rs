//! Time-Related Constants
//!
//! Intervals for the tick loop and its three periodic actions. All values
//! are milliseconds on the monotonic clock.

// ===== TICK =====

/// Default control loop period (milliseconds).
///
/// One sample, one ledger update and one alert evaluation per second.
pub const DEFAULT_TICK_PERIOD_MS: u64 = 1000;

// ===== DISPATCH INTERVALS =====

/// Aggregated sensor data publish interval (milliseconds).
///
/// 15 seconds fills the default 15-sample window at 1 Hz.
pub const AGGREGATE_PUBLISH_INTERVAL_MS: u64 = 15_000;

/// Heartbeat interval (milliseconds).
///
/// Five minutes keeps dashboards' "last seen" fresh without chatter.
pub const HEARTBEAT_INTERVAL_MS: u64 = 300_000;

/// Minimum spacing between two alerts of the same kind (milliseconds).
pub const ALERT_COOLDOWN_MS: u64 = 30_000;

// ===== TRANSPORT =====

/// Delay between reconnect attempts while the transport is down (milliseconds).
pub const RECONNECT_BACKOFF_MS: u64 = 5_000;

/// Upper bound for a single connect attempt (milliseconds).
pub const CONNECT_TIMEOUT_MS: u64 = 3_000;

/// Upper bound for a single publish round-trip (milliseconds).
pub const PUBLISH_TIMEOUT_MS: u64 = 500;
