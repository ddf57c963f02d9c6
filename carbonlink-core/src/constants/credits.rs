//! Credit Ledger Policy Constants
//!
//! Conversion factors map one reading to the credit figures a device
//! reports and to the amount its ledger moves. Creators turn sequestered
//! CO2 into credits; burners pay credits for emitted CO2.

// ===== LEDGER POLICY =====

/// Burns at or below this many credits are skipped.
///
/// Keeps noise-level transactions out of the ledger and the logs.
pub const NEGLIGIBLE_BURN_EPSILON: f32 = 0.01;

/// Auto-purchase triggers when the balance drops below this.
pub const REPLENISH_THRESHOLD: f32 = 10.0;

/// Credits bought per auto-purchase.
pub const REPLENISH_AMOUNT: f32 = 100.0;

// ===== CREATOR PROFILE =====

/// Credits produced per ppm of CO2 measured.
pub const CREATOR_CREDIT_FACTOR: f32 = 0.5;

/// Emissions attributed per percent of relative humidity.
pub const CREATOR_EMISSION_FACTOR: f32 = 0.2;

/// CO2 level (ppm) above which sequestration earns ledger credits.
///
/// Outdoor background; anything above it was captured by the device.
pub const CREATOR_LEDGER_BASELINE_PPM: f32 = 300.0;

/// Ledger credits generated per ppm above the baseline.
pub const CREATOR_LEDGER_RATE: f32 = 0.001;

/// Starting balance of a creator.
pub const CREATOR_INITIAL_CREDITS: f32 = 0.0;

// ===== BURNER PROFILE =====

/// Credits required per ppm of CO2 emitted.
pub const BURNER_CREDIT_FACTOR: f32 = 0.8;

/// Emissions attributed per percent of relative humidity.
pub const BURNER_EMISSION_FACTOR: f32 = 0.3;

/// CO2 level (ppm) above which emissions must be offset.
pub const BURNER_LEDGER_BASELINE_PPM: f32 = 1000.0;

/// Ledger credits burned per ppm above the baseline.
pub const BURNER_LEDGER_RATE: f32 = 0.001;

/// Starting balance of a burner.
pub const BURNER_INITIAL_CREDITS: f32 = 50.0;
