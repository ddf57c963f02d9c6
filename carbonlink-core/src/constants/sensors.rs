//! Alert Thresholds and Sensor Ranges
//!
//! Critical thresholds feed the alert evaluator. The simulated ranges are
//! what the pseudo-sensors of each role draw from.

// ===== ALERT THRESHOLDS =====

/// CO2 level (ppm) above which a critical high-reading alert fires.
///
/// Sustained exposure above 2500 ppm causes headaches and drowsiness.
pub const CRITICAL_CO2_THRESHOLD_PPM: f32 = 2500.0;

/// Credit balance below which a low-credits alert fires.
pub const CRITICAL_CREDITS_THRESHOLD: f32 = 5.0;

// ===== SIMULATED RANGES: CREATOR =====

/// Lowest simulated CO2 for a creator (ppm), outdoor background.
pub const CREATOR_CO2_MIN_PPM: f32 = 300.0;

/// Highest simulated CO2 for a creator (ppm), stuffy indoor air.
pub const CREATOR_CO2_MAX_PPM: f32 = 2000.0;

/// Lowest simulated humidity for a creator (%).
pub const CREATOR_HUMIDITY_MIN_PCT: f32 = 20.0;

/// Highest simulated humidity for a creator (%).
pub const CREATOR_HUMIDITY_MAX_PCT: f32 = 80.0;

// ===== SIMULATED RANGES: BURNER =====

/// Lowest simulated CO2 for a burner (ppm), already elevated.
pub const BURNER_CO2_MIN_PPM: f32 = 800.0;

/// Highest simulated CO2 for a burner (ppm).
pub const BURNER_CO2_MAX_PPM: f32 = 3000.0;

/// Lowest simulated humidity for a burner (%).
pub const BURNER_HUMIDITY_MIN_PCT: f32 = 40.0;

/// Highest simulated humidity for a burner (%).
pub const BURNER_HUMIDITY_MAX_PCT: f32 = 90.0;
