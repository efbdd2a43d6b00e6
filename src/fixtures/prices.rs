//! Price Fixtures

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::iso::{Currency, EUR, GBP, USD};
use serde::Deserialize;

use crate::{
    fixtures::FixtureError,
    tiers::{Tier, TierSchedule, TiersMode},
};

/// Wrapper for the price catalogue in YAML
#[derive(Debug, Deserialize)]
pub struct PricesFixture {
    /// ISO currency code every price is denominated in (e.g., "USD")
    pub currency: String,

    /// Map of plan id -> price fixture
    pub prices: FxHashMap<String, PriceFixture>,
}

/// Price Fixture
#[derive(Debug, Deserialize)]
pub struct PriceFixture {
    /// Tiers mode (e.g., "graduated")
    pub tiers_mode: String,

    /// Tiers, ascending by `up_to`
    pub tiers: Vec<TierFixture>,
}

/// Tier Fixture
#[derive(Debug, Deserialize)]
pub struct TierFixture {
    /// Upper bound on cumulative quantity; omitted, `~` or `0` for the last tier
    #[serde(default)]
    pub up_to: Option<u64>,

    /// Per-unit amount in minor units (e.g., 500 or "12.5")
    pub unit_amount: Decimal,
}

impl From<TierFixture> for Tier {
    fn from(fixture: TierFixture) -> Self {
        Tier::new(fixture.up_to.unwrap_or(0), fixture.unit_amount)
    }
}

impl From<PriceFixture> for TierSchedule {
    fn from(fixture: PriceFixture) -> Self {
        let mode = TiersMode::from(fixture.tiers_mode.trim());
        let tiers: Vec<Tier> = fixture.tiers.into_iter().map(Tier::from).collect();

        TierSchedule::new(mode, tiers)
    }
}

/// Parse an ISO currency code.
///
/// # Errors
///
/// Returns [`FixtureError::UnknownCurrency`] if the code is not recognized.
pub fn parse_currency(s: &str) -> Result<&'static Currency, FixtureError> {
    match s.trim() {
        "GBP" => Ok(GBP),
        "USD" => Ok(USD),
        "EUR" => Ok(EUR),
        other => Err(FixtureError::UnknownCurrency(other.to_string())),
    }
}
