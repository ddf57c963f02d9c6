//! Local Carbon-Credit Ledger
//!
//! ## Overview
//!
//! Each device keeps its own balance. Creators add credits for CO2 they
//! capture, burners spend credits for CO2 they emit, and burners may buy a
//! fixed block of credits automatically when they run low. Ledgers are not
//! synchronized between devices.
//!
//! ## Invariants
//!
//! - `available >= 0` after every operation. A burn larger than the balance
//!   is truncated to the balance.
//! - `burned_lifetime`, `generated_lifetime` and `replenished_lifetime` never
//!   decrease.
//! - A rejected operation leaves the state untouched.
//!
//! ## Operations
//!
//! | Operation              | available | lifetime counter      | session_delta |
//! |------------------------|-----------|-----------------------|---------------|
//! | `burn(x)`              | `-= a`    | `burned += a`         | `-= a`        |
//! | `generate(x)`          | `+= x`    | `generated += x`      | `+= x`        |
//! | `replenish(x)`         | `+= x`    | `replenished += x`    | unchanged     |
//!
//! where `a = min(x, available)`, or 0 when `a` is negligible.
//!
//! ```rust
//! use carbonlink_core::CreditLedger;
//!
//! let mut ledger = CreditLedger::new(5.0, true);
//! let burn = ledger.burn(8.0);
//! assert_eq!(burn.actual_burned, 5.0);
//! assert_eq!(burn.remaining, 0.0);
//!
//! assert!(ledger.maybe_auto_replenish(10.0, 100.0));
//! assert_eq!(ledger.available(), 100.0);
//! ```

use crate::constants::NEGLIGIBLE_BURN_EPSILON;
use crate::errors::LedgerError;

/// Snapshot of all ledger balances
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerState {
    /// Credits that can still be burned
    pub available: f32,
    /// Total credits burned since start
    pub burned_lifetime: f32,
    /// Total credits generated since start
    pub generated_lifetime: f32,
    /// Total credits bought by auto-replenish since start
    pub replenished_lifetime: f32,
    /// Net generated minus burned since start
    pub session_delta: f32,
    /// Whether auto-purchase is allowed
    pub auto_replenish_enabled: bool,
}

/// Outcome of a burn request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurnResult {
    /// Credits actually removed (may be less than requested, or zero)
    pub actual_burned: f32,
    /// Balance after the burn
    pub remaining: f32,
}

/// Outcome of a generate request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateResult {
    /// Credits added
    pub generated: f32,
    /// Balance after generation
    pub new_total: f32,
}

/// Credit balance with burn/generate/replenish operations
#[derive(Debug, Clone)]
pub struct CreditLedger {
    state: LedgerState,
    burn_epsilon: f32,
}

impl CreditLedger {
    /// Create a ledger with a starting balance
    ///
    /// Negative or non-finite starting balances are clamped to zero.
    pub fn new(initial: f32, auto_replenish_enabled: bool) -> Self {
        let available = if initial.is_finite() && initial > 0.0 {
            initial
        } else {
            0.0
        };
        Self {
            state: LedgerState {
                available,
                burned_lifetime: 0.0,
                generated_lifetime: 0.0,
                replenished_lifetime: 0.0,
                session_delta: 0.0,
                auto_replenish_enabled,
            },
            burn_epsilon: NEGLIGIBLE_BURN_EPSILON,
        }
    }

    /// Override the negligible-burn threshold
    pub fn with_burn_epsilon(mut self, epsilon: f32) -> Self {
        self.burn_epsilon = epsilon.max(0.0);
        self
    }

    /// Spend up to `requested` credits
    ///
    /// Never fails. Returns zero burned when the request is not positive,
    /// the balance is empty, or the truncated amount is negligible.
    pub fn burn(&mut self, requested: f32) -> BurnResult {
        if requested.is_nan() || requested <= 0.0 || self.state.available <= 0.0 {
            return self.no_burn();
        }

        let actual = requested.min(self.state.available);
        if actual <= self.burn_epsilon {
            return self.no_burn();
        }

        self.state.available = (self.state.available - actual).max(0.0);
        self.state.burned_lifetime += actual;
        self.state.session_delta -= actual;

        BurnResult {
            actual_burned: actual,
            remaining: self.state.available,
        }
    }

    /// Add `amount` newly created credits
    pub fn generate(&mut self, amount: f32) -> Result<GenerateResult, LedgerError> {
        Self::check_amount(amount)?;

        self.state.available += amount;
        self.state.generated_lifetime += amount;
        self.state.session_delta += amount;

        Ok(GenerateResult {
            generated: amount,
            new_total: self.state.available,
        })
    }

    /// Add `amount` purchased credits, returning the new balance
    pub fn replenish(&mut self, amount: f32) -> Result<f32, LedgerError> {
        Self::check_amount(amount)?;

        self.state.available += amount;
        self.state.replenished_lifetime += amount;
        Ok(self.state.available)
    }

    /// Buy `amount` credits if enabled and the balance is below `threshold`
    pub fn maybe_auto_replenish(&mut self, threshold: f32, amount: f32) -> bool {
        if !self.state.auto_replenish_enabled || !(self.state.available < threshold) {
            return false;
        }

        match self.replenish(amount) {
            Ok(total) => {
                log_info!("Auto-purchased {:.1} credits, balance {:.1}", amount, total);
                true
            }
            Err(e) => {
                log_warn!("Auto-purchase skipped: {}", e);
                false
            }
        }
    }

    /// Turn auto-purchase on or off
    pub fn set_auto_replenish(&mut self, enabled: bool) {
        self.state.auto_replenish_enabled = enabled;
    }

    /// Current balance
    pub fn available(&self) -> f32 {
        self.state.available
    }

    /// Snapshot of all balances
    pub fn state(&self) -> LedgerState {
        self.state
    }

    fn no_burn(&self) -> BurnResult {
        BurnResult {
            actual_burned: 0.0,
            remaining: self.state.available,
        }
    }

    fn check_amount(amount: f32) -> Result<(), LedgerError> {
        if amount.is_finite() && amount >= 0.0 {
            Ok(())
        } else {
            Err(LedgerError::InvalidAmount { amount })
        }
    }
}
