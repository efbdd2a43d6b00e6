//! Customer Fixtures

use decimal_percentage::Percentage;
use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    discounts::{Coupon, Discount},
    fixtures::FixtureError,
    subscriptions::{
        BillingInterval, BillingScheme, Customer, PlanRef, Subscription, SubscriptionStatus,
    },
};

/// Wrapper for customers in YAML
#[derive(Debug, Deserialize)]
pub struct CustomersFixture {
    /// Customers, in the order they are processed
    pub customers: Vec<CustomerFixture>,
}

/// Customer Fixture
#[derive(Debug, Deserialize)]
pub struct CustomerFixture {
    /// Customer id
    pub id: String,

    /// Customer-level discount
    #[serde(default)]
    pub discount: Option<DiscountFixture>,

    /// Subscriptions
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionFixture>,
}

/// Subscription Fixture
#[derive(Debug, Deserialize)]
pub struct SubscriptionFixture {
    /// Subscription id
    pub id: String,

    /// Status (e.g., `active`, `past_due`)
    pub status: String,

    /// Whether the subscription cancels at period end
    #[serde(default)]
    pub cancel_at_period_end: bool,

    /// Cancellation time (RFC 3339)
    #[serde(default)]
    pub canceled_at: Option<Timestamp>,

    /// Start time (RFC 3339)
    pub start_date: Timestamp,

    /// Billed quantity
    pub quantity: u64,

    /// Plan reference
    pub plan: PlanFixture,

    /// Subscription-level discount
    #[serde(default)]
    pub discount: Option<DiscountFixture>,
}

/// Plan reference fixture
#[derive(Debug, Deserialize)]
pub struct PlanFixture {
    /// Plan id, matching a key in the price catalogue
    pub id: String,

    /// Billing scheme (e.g., "tiered")
    pub billing_scheme: String,

    /// Billing interval ("month" or "year")
    pub interval: String,
}

/// Discount fixture
#[derive(Debug, Deserialize)]
pub struct DiscountFixture {
    /// Coupon, if still present
    #[serde(default)]
    pub coupon: Option<CouponFixture>,

    /// When the discount ends (RFC 3339); omitted for discounts that never end
    #[serde(default)]
    pub end: Option<Timestamp>,
}

/// Coupon fixture
#[derive(Debug, Deserialize)]
pub struct CouponFixture {
    /// Amount off in minor units
    #[serde(default)]
    pub amount_off: Option<i64>,

    /// Percent off, 0 to 100 (e.g., 25 for 25%)
    #[serde(default)]
    pub percent_off: Option<Decimal>,
}

impl TryFrom<CustomerFixture> for Customer {
    type Error = FixtureError;

    fn try_from(fixture: CustomerFixture) -> Result<Self, Self::Error> {
        let subscriptions = fixture
            .subscriptions
            .into_iter()
            .map(Subscription::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Customer {
            id: fixture.id,
            discount: fixture.discount.map(Discount::try_from).transpose()?,
            subscriptions,
        })
    }
}

impl TryFrom<SubscriptionFixture> for Subscription {
    type Error = FixtureError;

    fn try_from(fixture: SubscriptionFixture) -> Result<Self, Self::Error> {
        if fixture.quantity == 0 {
            return Err(FixtureError::InvalidQuantity(fixture.id));
        }

        Ok(Subscription {
            status: SubscriptionStatus::from(fixture.status.as_str()),
            cancel_at_period_end: fixture.cancel_at_period_end,
            canceled_at: fixture.canceled_at,
            start_date: fixture.start_date,
            quantity: fixture.quantity,
            plan: PlanRef::try_from(fixture.plan)?,
            discount: fixture.discount.map(Discount::try_from).transpose()?,
            id: fixture.id,
        })
    }
}

impl TryFrom<PlanFixture> for PlanRef {
    type Error = FixtureError;

    fn try_from(fixture: PlanFixture) -> Result<Self, Self::Error> {
        Ok(PlanRef {
            billing_scheme: BillingScheme::from(fixture.billing_scheme.trim()),
            interval: parse_interval(&fixture.interval)?,
            id: fixture.id,
        })
    }
}

impl TryFrom<DiscountFixture> for Discount {
    type Error = FixtureError;

    fn try_from(fixture: DiscountFixture) -> Result<Self, Self::Error> {
        Ok(Discount {
            coupon: fixture.coupon.map(Coupon::try_from).transpose()?,
            end: fixture.end,
        })
    }
}

impl TryFrom<CouponFixture> for Coupon {
    type Error = FixtureError;

    fn try_from(fixture: CouponFixture) -> Result<Self, Self::Error> {
        Ok(Coupon {
            amount_off: fixture.amount_off,
            percent_off: fixture.percent_off.map(parse_percent_off).transpose()?,
        })
    }
}

/// Parse a billing interval string.
///
/// # Errors
///
/// Returns [`FixtureError::UnknownInterval`] for anything but "month" or "year".
pub fn parse_interval(s: &str) -> Result<BillingInterval, FixtureError> {
    match s {
        "month" => Ok(BillingInterval::Month),
        "year" => Ok(BillingInterval::Year),
        other => Err(FixtureError::UnknownInterval(other.to_string())),
    }
}

/// Convert a 0 to 100 percent-off into a `Percentage`.
///
/// # Errors
///
/// Returns [`FixtureError::InvalidPercentage`] if the value is outside 0 to 100.
pub fn parse_percent_off(value: Decimal) -> Result<Percentage, FixtureError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(FixtureError::InvalidPercentage(value.to_string()));
    }

    Ok(Percentage::from(value / Decimal::ONE_HUNDRED))
}
