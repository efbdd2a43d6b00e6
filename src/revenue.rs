//! Revenue
//!
//! Resolves one subscription to its monthly-equivalent recurring revenue, or to the reason it
//! contributes none.

use jiff::Timestamp;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    aggregate::MonthKey,
    discounts::{Discount, apply_discounts},
    sources::{TierLookup, TierLookupError},
    subscriptions::{BillingInterval, BillingScheme, Subscription},
    tiers::PricingError,
    valuation::Valuation,
};

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Monthly-equivalent revenue of one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevenueRecord {
    /// Subscription the revenue comes from.
    pub subscription_id: String,

    /// When the subscription started.
    pub started_at: Timestamp,

    /// Calendar month the subscription started in.
    pub month: MonthKey,

    /// Monthly-equivalent revenue in major currency units.
    pub amount: Decimal,
}

/// Why a subscription contributes no revenue.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Exclusion {
    /// Set to cancel before the valuation horizon.
    #[error("cancels before the valuation horizon")]
    Cancelling,

    /// Not in the active state.
    #[error("subscription is not active")]
    Inactive,

    /// Priced in a way the engine cannot value.
    #[error(transparent)]
    Unsupported(PricingError),
}

/// Outcome of resolving a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The subscription contributes revenue.
    Revenue(RevenueRecord),

    /// The subscription is counted, but its tiers could not be valued and were priced at zero.
    Unpriced(RevenueRecord, PricingError),

    /// The subscription contributes nothing.
    Excluded(Exclusion),
}

impl Resolution {
    /// The revenue record, if the subscription produced one.
    pub fn record(&self) -> Option<&RevenueRecord> {
        match self {
            Resolution::Revenue(record) | Resolution::Unpriced(record, _) => Some(record),
            Resolution::Excluded(_) => None,
        }
    }

    /// Consume the resolution, keeping only the revenue record.
    pub fn into_record(self) -> Option<RevenueRecord> {
        match self {
            Resolution::Revenue(record) | Resolution::Unpriced(record, _) => Some(record),
            Resolution::Excluded(_) => None,
        }
    }
}

/// Resolve the monthly-equivalent revenue of `subscription`.
///
/// The tier schedule is fetched from `lookup` for tiered plans; the subscription's own
/// discount is applied before `customer_discount`.
///
/// # Errors
///
/// Returns the [`TierLookupError`] if the plan's tier schedule cannot be fetched.
pub fn resolve(
    subscription: &Subscription,
    customer_discount: Option<&Discount>,
    lookup: &impl TierLookup,
    valuation: &Valuation,
) -> Result<Resolution, TierLookupError> {
    if let Some(exclusion) = exclusion(subscription, valuation) {
        debug!(subscription = %subscription.id, %exclusion, "excluding subscription");

        return Ok(Resolution::Excluded(exclusion));
    }

    let plan = &subscription.plan;

    if plan.billing_scheme != BillingScheme::Tiered {
        let error = PricingError::UnsupportedBillingScheme(plan.billing_scheme.clone());

        warn!(subscription = %subscription.id, plan = %plan.id, %error, "skipping subscription");

        return Ok(Resolution::Excluded(Exclusion::Unsupported(error)));
    }

    let schedule = lookup.tier_schedule(&plan.id)?;

    if !schedule.is_sorted() {
        warn!(plan = %plan.id, "tiers are not sorted by bound; units may be mispriced");
    }

    let (raw, unpriced) = match schedule.price(subscription.quantity) {
        Ok(amount) => (amount, None),
        Err(error) => {
            warn!(
                subscription = %subscription.id,
                plan = %plan.id,
                %error,
                "pricing tiers at zero"
            );

            (Decimal::ZERO, Some(error))
        }
    };

    let monthly = match subscription.interval() {
        BillingInterval::Month => raw,
        BillingInterval::Year => raw / MONTHS_PER_YEAR,
    };

    let discounted = apply_discounts(
        monthly,
        [subscription.discount.as_ref(), customer_discount],
        valuation,
    );

    let record = RevenueRecord {
        subscription_id: subscription.id.clone(),
        started_at: subscription.start_date,
        month: valuation.month_of(subscription.start_date),
        amount: discounted / Decimal::ONE_HUNDRED,
    };

    debug!(
        subscription = %record.subscription_id,
        amount = %record.amount,
        "resolved subscription"
    );

    Ok(match unpriced {
        None => Resolution::Revenue(record),
        Some(error) => Resolution::Unpriced(record, error),
    })
}

fn exclusion(subscription: &Subscription, valuation: &Valuation) -> Option<Exclusion> {
    // A missing cancellation time counts as already cancelled.
    let cancelling = subscription.cancel_at_period_end
        && subscription
            .canceled_at
            .is_none_or(|at| valuation.before_horizon(at));

    if cancelling {
        Some(Exclusion::Cancelling)
    } else if !subscription.status.is_active() {
        Some(Exclusion::Inactive)
    } else {
        None
    }
}
