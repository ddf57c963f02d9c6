//! Buffer Sizes
//!
//! The aggregation window is the only buffer that grows with configuration;
//! payload records have a fixed upper bound on fields.

/// Default aggregation window capacity (samples).
///
/// At the default 1 Hz tick this covers one 15 s publish interval.
pub const DEFAULT_WINDOW_CAPACITY: usize = 15;

/// Maximum number of fields in one payload record.
///
/// The sensor data record is the widest at 12 fields.
pub const MAX_RECORD_FIELDS: usize = 12;
