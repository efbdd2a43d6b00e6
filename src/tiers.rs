//! Tiers
//!
//! Graduated tier pricing: every unit of a subscription's quantity is billed at the rate of
//! the bracket it falls into.

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::subscriptions::BillingScheme;

/// Pricing conditions the engine does not know how to value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PricingError {
    /// The plan does not use tiered billing.
    #[error("unsupported billing scheme: {0}")]
    UnsupportedBillingScheme(BillingScheme),

    /// The tier schedule is not graduated.
    #[error("unsupported tiers mode: {0}")]
    UnsupportedTiersMode(TiersMode),
}

/// How a tier schedule applies to a quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TiersMode {
    /// Each unit is priced by the bracket it falls into.
    Graduated,

    /// The whole quantity is priced by the bracket of the last unit.
    Volume,

    /// Any mode the engine does not model explicitly.
    Other(String),
}

impl From<&str> for TiersMode {
    fn from(value: &str) -> Self {
        match value {
            "graduated" => TiersMode::Graduated,
            "volume" => TiersMode::Volume,
            other => TiersMode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TiersMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiersMode::Graduated => f.write_str("graduated"),
            TiersMode::Volume => f.write_str("volume"),
            TiersMode::Other(mode) => f.write_str(mode),
        }
    }
}

/// A single pricing bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    up_to: Option<u64>,
    unit_amount: Decimal,
}

impl Tier {
    /// Create a tier covering units up to and including `up_to`.
    ///
    /// An `up_to` of `0` marks the unbounded last tier.
    pub fn new(up_to: u64, unit_amount: Decimal) -> Self {
        Self {
            up_to: (up_to != 0).then_some(up_to),
            unit_amount,
        }
    }

    /// Create the unbounded last tier.
    pub fn unbounded(unit_amount: Decimal) -> Self {
        Self {
            up_to: None,
            unit_amount,
        }
    }

    /// Upper bound on cumulative quantity, `None` when unbounded.
    pub fn up_to(&self) -> Option<u64> {
        self.up_to
    }

    /// Amount charged per unit in this bracket, in minor currency units.
    pub fn unit_amount(&self) -> Decimal {
        self.unit_amount
    }

    /// Returns `true` if the unit at 1-based position `unit` is billed by this tier.
    fn covers(&self, unit: u64) -> bool {
        self.up_to.is_none_or(|bound| unit <= bound)
    }
}

/// The tier schedule of a plan, as returned by a tier lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSchedule {
    mode: TiersMode,
    tiers: Vec<Tier>,
}

impl TierSchedule {
    /// Create a new tier schedule.
    pub fn new(mode: TiersMode, tiers: impl Into<Vec<Tier>>) -> Self {
        Self {
            mode,
            tiers: tiers.into(),
        }
    }

    /// Create a graduated tier schedule.
    pub fn graduated(tiers: impl Into<Vec<Tier>>) -> Self {
        Self::new(TiersMode::Graduated, tiers)
    }

    /// How the schedule applies to a quantity.
    pub fn mode(&self) -> &TiersMode {
        &self.mode
    }

    /// The tiers, in the order they were supplied.
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Returns `true` if the tiers ascend by bound with any unbounded tier last.
    pub fn is_sorted(&self) -> bool {
        self.tiers
            .is_sorted_by_key(|tier| tier.up_to.unwrap_or(u64::MAX))
    }

    /// Price `quantity` units against this schedule.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::UnsupportedTiersMode`] unless the schedule is graduated.
    pub fn price(&self, quantity: u64) -> Result<Decimal, PricingError> {
        match &self.mode {
            TiersMode::Graduated => Ok(evaluate(quantity, &self.tiers)),
            mode => Err(PricingError::UnsupportedTiersMode(mode.clone())),
        }
    }
}

/// Sum the per-unit price of `quantity` units under graduated `tiers`.
///
/// Each unit is billed by the first tier whose bound covers it. `tiers` must be sorted
/// ascending by bound; an unsorted list is evaluated as given and misprices units. Units no
/// tier covers are not billed.
pub fn evaluate(quantity: u64, tiers: &[Tier]) -> Decimal {
    (1..=quantity)
        .filter_map(|unit| tiers.iter().find(|tier| tier.covers(unit)))
        .map(Tier::unit_amount)
        .sum()
}
