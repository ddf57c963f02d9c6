//! Device Configuration and Role Profiles
//!
//! ## Overview
//!
//! A device is either a **creator** (sequesters CO2, earns credits) or a
//! **burner** (emits CO2, spends credits). The role fixes the conversion
//! factors in a [`RoleProfile`]; everything else in [`DeviceConfig`] is the
//! same for both and defaults to the values in [`constants`](crate::constants).
//!
//! ## Derived Figures
//!
//! For every accepted reading the scheduler derives:
//!
//! ```text
//! credits       = co2 × credit_factor
//! emissions     = humidity × emission_factor
//! ledger_amount = max(co2 − ledger_baseline, 0) × ledger_rate
//! offset        = creator: credits ≥ emissions
//!                 burner:  available ≥ credits
//! ```
//!
//! `credits` and `emissions` are reported figures only. The ledger moves by
//! `ledger_amount`: generated by creators, burned by burners.
//!
//! ## Loading
//!
//! With the `serde` feature, `DeviceConfig` deserializes from a flat JSON
//! object. Every field is optional, durations are given in milliseconds, and
//! the result is validated before it is returned:
//!
//! ```json
//! { "role": "burner", "aggregate_interval_ms": 10000, "initial_credits": 20.0 }
//! ```

use core::fmt;
use core::time::Duration;

use crate::constants::credits::{
    BURNER_CREDIT_FACTOR, BURNER_EMISSION_FACTOR, BURNER_INITIAL_CREDITS, BURNER_LEDGER_BASELINE_PPM,
    BURNER_LEDGER_RATE, CREATOR_CREDIT_FACTOR, CREATOR_EMISSION_FACTOR, CREATOR_INITIAL_CREDITS,
    CREATOR_LEDGER_BASELINE_PPM, CREATOR_LEDGER_RATE,
};
use crate::constants::{
    AGGREGATE_PUBLISH_INTERVAL_MS, ALERT_COOLDOWN_MS, CRITICAL_CO2_THRESHOLD_PPM,
    CRITICAL_CREDITS_THRESHOLD, DEFAULT_TICK_PERIOD_MS, DEFAULT_WINDOW_CAPACITY,
    HEARTBEAT_INTERVAL_MS, NEGLIGIBLE_BURN_EPSILON, RECONNECT_BACKOFF_MS, REPLENISH_AMOUNT,
    REPLENISH_THRESHOLD,
};
use crate::errors::ConfigError;
use crate::traits::Reading;

/// What a device does with carbon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Role {
    /// Sequesters CO2 and generates credits
    #[default]
    Creator,
    /// Emits CO2 and burns credits
    Burner,
}

impl Role {
    /// Lowercase name, as used in configuration and logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Creator => "creator",
            Role::Burner => "burner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-role conversion factors and ledger policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleProfile {
    /// Credits per ppm of CO2 (produced by creators, needed by burners)
    pub credit_factor: f32,
    /// Emissions per percent of humidity
    pub emission_factor: f32,
    /// CO2 (ppm) above which the ledger moves
    pub ledger_baseline: f32,
    /// Ledger credits per ppm above the baseline
    pub ledger_rate: f32,
    /// Starting balance
    pub initial_credits: f32,
    /// Auto-purchase enabled at start
    pub auto_replenish: bool,
}

/// Figures derived from one reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditFigures {
    /// Credits produced (creator) or needed (burner)
    pub credits: f32,
    /// Attributed emissions
    pub emissions: f32,
    /// Whether the device is currently offset
    pub offset: bool,
    /// Amount to generate or burn on the ledger
    pub ledger_amount: f32,
}

impl RoleProfile {
    /// Creator defaults
    pub const fn creator() -> Self {
        Self {
            credit_factor: CREATOR_CREDIT_FACTOR,
            emission_factor: CREATOR_EMISSION_FACTOR,
            ledger_baseline: CREATOR_LEDGER_BASELINE_PPM,
            ledger_rate: CREATOR_LEDGER_RATE,
            initial_credits: CREATOR_INITIAL_CREDITS,
            auto_replenish: false,
        }
    }

    /// Burner defaults
    pub const fn burner() -> Self {
        Self {
            credit_factor: BURNER_CREDIT_FACTOR,
            emission_factor: BURNER_EMISSION_FACTOR,
            ledger_baseline: BURNER_LEDGER_BASELINE_PPM,
            ledger_rate: BURNER_LEDGER_RATE,
            initial_credits: BURNER_INITIAL_CREDITS,
            auto_replenish: true,
        }
    }

    /// Defaults for `role`
    pub const fn for_role(role: Role) -> Self {
        match role {
            Role::Creator => Self::creator(),
            Role::Burner => Self::burner(),
        }
    }

    /// Ledger movement for a CO2 reading; never negative
    pub fn ledger_amount(&self, co2: f32) -> f32 {
        (co2 - self.ledger_baseline).max(0.0) * self.ledger_rate
    }

    /// Derive all figures for a reading, given the balance before this tick
    pub fn figures(&self, role: Role, reading: &Reading, available: f32) -> CreditFigures {
        let credits = reading.co2 * self.credit_factor;
        let emissions = reading.humidity * self.emission_factor;
        let offset = match role {
            Role::Creator => credits >= emissions,
            Role::Burner => available >= credits,
        };

        CreditFigures {
            credits,
            emissions,
            offset,
            ledger_amount: self.ledger_amount(reading.co2),
        }
    }
}

/// Everything a device needs to run its control loop
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "ConfigFile"))]
pub struct DeviceConfig {
    /// Creator or burner
    pub role: Role,
    /// Conversion factors and ledger policy for the role
    pub profile: RoleProfile,
    /// Period of the control loop
    pub tick_period: Duration,
    /// Spacing of aggregated sensor data publishes
    pub aggregate_interval: Duration,
    /// Spacing of heartbeats
    pub heartbeat_interval: Duration,
    /// Minimum spacing of two alerts of the same kind
    pub alert_cooldown: Duration,
    /// Spacing of reconnect attempts while disconnected
    pub reconnect_backoff: Duration,
    /// Samples kept in the aggregation window
    pub window_capacity: usize,
    /// CO2 (ppm) strictly above which a reading is critical
    pub critical_reading_threshold: f32,
    /// Balance strictly below which credits are critically low
    pub critical_credits_threshold: f32,
    /// Balance below which auto-purchase triggers
    pub replenish_threshold: f32,
    /// Credits bought per auto-purchase
    pub replenish_amount: f32,
    /// Burns at or below this are skipped
    pub burn_epsilon: f32,
}

impl DeviceConfig {
    /// Defaults for a role
    pub fn for_role(role: Role) -> Self {
        Self {
            role,
            profile: RoleProfile::for_role(role),
            tick_period: Duration::from_millis(DEFAULT_TICK_PERIOD_MS),
            aggregate_interval: Duration::from_millis(AGGREGATE_PUBLISH_INTERVAL_MS),
            heartbeat_interval: Duration::from_millis(HEARTBEAT_INTERVAL_MS),
            alert_cooldown: Duration::from_millis(ALERT_COOLDOWN_MS),
            reconnect_backoff: Duration::from_millis(RECONNECT_BACKOFF_MS),
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            critical_reading_threshold: CRITICAL_CO2_THRESHOLD_PPM,
            critical_credits_threshold: CRITICAL_CREDITS_THRESHOLD,
            replenish_threshold: REPLENISH_THRESHOLD,
            replenish_amount: REPLENISH_AMOUNT,
            burn_epsilon: NEGLIGIBLE_BURN_EPSILON,
        }
    }

    /// Switch role, replacing the profile with that role's defaults
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self.profile = RoleProfile::for_role(role);
        self
    }

    /// Replace the role profile
    pub fn with_profile(mut self, profile: RoleProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Set the control loop period
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Set the aggregate publish interval
    pub fn with_aggregate_interval(mut self, interval: Duration) -> Self {
        self.aggregate_interval = interval;
        self
    }

    /// Set the heartbeat interval
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the per-kind alert cooldown
    pub fn with_alert_cooldown(mut self, cooldown: Duration) -> Self {
        self.alert_cooldown = cooldown;
        self
    }

    /// Set the reconnect backoff
    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    /// Set the aggregation window capacity
    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity;
        self
    }

    /// Set both alert thresholds
    pub fn with_critical_thresholds(mut self, reading: f32, credits: f32) -> Self {
        self.critical_reading_threshold = reading;
        self.critical_credits_threshold = credits;
        self
    }

    /// Set the auto-purchase threshold and amount
    pub fn with_replenish(mut self, threshold: f32, amount: f32) -> Self {
        self.replenish_threshold = threshold;
        self.replenish_amount = amount;
        self
    }

    /// Enable or disable auto-purchase
    pub fn with_auto_replenish(mut self, enabled: bool) -> Self {
        self.profile.auto_replenish = enabled;
        self
    }

    /// Set the starting balance
    pub fn with_initial_credits(mut self, credits: f32) -> Self {
        self.profile.initial_credits = credits;
        self
    }

    /// Set the negligible-burn epsilon
    pub fn with_burn_epsilon(mut self, epsilon: f32) -> Self {
        self.burn_epsilon = epsilon;
        self
    }

    /// Reject configurations the scheduler cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        let intervals = [
            ("tick_period", self.tick_period),
            ("aggregate_interval", self.aggregate_interval),
            ("heartbeat_interval", self.heartbeat_interval),
            ("reconnect_backoff", self.reconnect_backoff),
        ];
        for (name, interval) in intervals {
            if interval.is_zero() {
                return Err(ConfigError::ZeroInterval { name });
            }
        }

        let values = [
            ("critical_reading_threshold", self.critical_reading_threshold),
            ("critical_credits_threshold", self.critical_credits_threshold),
            ("replenish_threshold", self.replenish_threshold),
            ("replenish_amount", self.replenish_amount),
            ("burn_epsilon", self.burn_epsilon),
            ("credit_factor", self.profile.credit_factor),
            ("emission_factor", self.profile.emission_factor),
            ("ledger_baseline", self.profile.ledger_baseline),
            ("ledger_rate", self.profile.ledger_rate),
            ("initial_credits", self.profile.initial_credits),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue { name, value });
            }
        }

        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::for_role(Role::default())
    }
}

/// Flat on-disk form of [`DeviceConfig`]
#[cfg(feature = "serde")]
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    role: Role,
    tick_period_ms: Option<u64>,
    aggregate_interval_ms: Option<u64>,
    heartbeat_interval_ms: Option<u64>,
    alert_cooldown_ms: Option<u64>,
    reconnect_backoff_ms: Option<u64>,
    window_capacity: Option<usize>,
    critical_reading_threshold: Option<f32>,
    critical_credits_threshold: Option<f32>,
    replenish_threshold: Option<f32>,
    replenish_amount: Option<f32>,
    auto_replenish: Option<bool>,
    initial_credits: Option<f32>,
    burn_epsilon: Option<f32>,
    credit_factor: Option<f32>,
    emission_factor: Option<f32>,
    ledger_baseline: Option<f32>,
    ledger_rate: Option<f32>,
}

#[cfg(feature = "serde")]
impl TryFrom<ConfigFile> for DeviceConfig {
    type Error = ConfigError;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let mut config = DeviceConfig::for_role(file.role);
        let ms = Duration::from_millis;

        if let Some(v) = file.tick_period_ms {
            config.tick_period = ms(v);
        }
        if let Some(v) = file.aggregate_interval_ms {
            config.aggregate_interval = ms(v);
        }
        if let Some(v) = file.heartbeat_interval_ms {
            config.heartbeat_interval = ms(v);
        }
        if let Some(v) = file.alert_cooldown_ms {
            config.alert_cooldown = ms(v);
        }
        if let Some(v) = file.reconnect_backoff_ms {
            config.reconnect_backoff = ms(v);
        }
        if let Some(v) = file.window_capacity {
            config.window_capacity = v;
        }

        let set = |slot: &mut f32, value: Option<f32>| {
            if let Some(v) = value {
                *slot = v;
            }
        };
        set(&mut config.critical_reading_threshold, file.critical_reading_threshold);
        set(&mut config.critical_credits_threshold, file.critical_credits_threshold);
        set(&mut config.replenish_threshold, file.replenish_threshold);
        set(&mut config.replenish_amount, file.replenish_amount);
        set(&mut config.burn_epsilon, file.burn_epsilon);
        set(&mut config.profile.initial_credits, file.initial_credits);
        set(&mut config.profile.credit_factor, file.credit_factor);
        set(&mut config.profile.emission_factor, file.emission_factor);
        set(&mut config.profile.ledger_baseline, file.ledger_baseline);
        set(&mut config.profile.ledger_rate, file.ledger_rate);

        if let Some(v) = file.auto_replenish {
            config.profile.auto_replenish = v;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_defaults() {
        let creator = DeviceConfig::for_role(Role::Creator);
        assert_eq!(creator.profile.credit_factor, 0.5);
        assert_eq!(creator.profile.initial_credits, 0.0);
        assert!(!creator.profile.auto_replenish);

        let burner = DeviceConfig::for_role(Role::Burner);
        assert_eq!(burner.profile.credit_factor, 0.8);
        assert_eq!(burner.profile.initial_credits, 50.0);
        assert!(burner.profile.auto_replenish);

        assert_eq!(burner.window_capacity, 15);
        assert_eq!(burner.aggregate_interval, Duration::from_secs(15));
        assert_eq!(burner.heartbeat_interval, Duration::from_secs(300));
        assert!(burner.validate().is_ok());
        assert!(creator.validate().is_ok());
    }

    #[test]
    fn figures_per_role() {
        let reading = Reading::new(1500.0, 50.0);

        let creator = RoleProfile::creator().figures(Role::Creator, &reading, 0.0);
        assert_eq!(creator.credits, 750.0);
        assert_eq!(creator.emissions, 10.0);
        assert!(creator.offset);
        assert!((creator.ledger_amount - 1.2).abs() < 1e-6);

        let burner = RoleProfile::burner().figures(Role::Burner, &reading, 50.0);
        assert_eq!(burner.credits, 1200.0);
        assert_eq!(burner.emissions, 15.0);
        assert!(!burner.offset);
        assert!((burner.ledger_amount - 0.5).abs() < 1e-6);
    }

    #[test]
    fn ledger_amount_floors_at_baseline() {
        assert_eq!(RoleProfile::burner().ledger_amount(800.0), 0.0);
        assert_eq!(RoleProfile::creator().ledger_amount(300.0), 0.0);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let base = DeviceConfig::default();

        assert_eq!(
            base.clone().with_window_capacity(0).validate(),
            Err(ConfigError::ZeroCapacity)
        );
        assert_eq!(
            base.clone().with_tick_period(Duration::ZERO).validate(),
            Err(ConfigError::ZeroInterval { name: "tick_period" })
        );
        assert_eq!(
            base.clone().with_heartbeat_interval(Duration::ZERO).validate(),
            Err(ConfigError::ZeroInterval { name: "heartbeat_interval" })
        );
        assert!(matches!(
            base.clone().with_replenish(-1.0, 100.0).validate(),
            Err(ConfigError::InvalidValue { name: "replenish_threshold", .. })
        ));
        assert!(matches!(
            base.clone().with_initial_credits(f32::NAN).validate(),
            Err(ConfigError::InvalidValue { name: "initial_credits", .. })
        ));

        // A zero cooldown is allowed: alerts may fire every tick
        assert!(base.with_alert_cooldown(Duration::ZERO).validate().is_ok());
    }

    #[test]
    fn with_role_resets_profile() {
        let config = DeviceConfig::for_role(Role::Creator)
            .with_initial_credits(7.0)
            .with_role(Role::Burner);
        assert_eq!(config.profile, RoleProfile::burner());
    }

    #[test]
    fn role_display() {
        assert_eq!(Role::Burner.to_string(), "burner");
        assert_eq!(Role::Creator.as_str(), "creator");
    }
}
