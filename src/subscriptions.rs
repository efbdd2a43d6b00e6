//! Subscriptions
//!
//! Plain value types describing customers and their subscriptions, decoupled from any
//! billing provider's schema.

use std::fmt;

use jiff::Timestamp;

use crate::discounts::Discount;

/// Lifecycle status of a subscription.
///
/// Only [`SubscriptionStatus::Active`] subscriptions contribute recurring revenue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// Currently billing.
    Active,

    /// In a free trial period.
    Trialing,

    /// Latest invoice failed to collect.
    PastDue,

    /// Payment retries exhausted.
    Unpaid,

    /// Cancelled and no longer billing.
    Canceled,

    /// Initial payment has not completed.
    Incomplete,

    /// Any status the engine does not model explicitly.
    Other(String),
}

impl SubscriptionStatus {
    /// Returns `true` for active subscriptions.
    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

impl From<&str> for SubscriptionStatus {
    fn from(value: &str) -> Self {
        match value {
            "active" => SubscriptionStatus::Active,
            "trialing" => SubscriptionStatus::Trialing,
            "past_due" => SubscriptionStatus::PastDue,
            "unpaid" => SubscriptionStatus::Unpaid,
            "canceled" => SubscriptionStatus::Canceled,
            "incomplete" => SubscriptionStatus::Incomplete,
            other => SubscriptionStatus::Other(other.to_string()),
        }
    }
}

/// How often a plan bills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingInterval {
    /// Billed every month.
    Month,

    /// Billed every year.
    Year,
}

/// How a plan's price is computed from the subscription quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingScheme {
    /// Price is computed from a tier schedule.
    Tiered,

    /// Flat price per unit.
    PerUnit,

    /// Any scheme the engine does not model explicitly.
    Other(String),
}

impl From<&str> for BillingScheme {
    fn from(value: &str) -> Self {
        match value {
            "tiered" => BillingScheme::Tiered,
            "per_unit" => BillingScheme::PerUnit,
            other => BillingScheme::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BillingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingScheme::Tiered => f.write_str("tiered"),
            BillingScheme::PerUnit => f.write_str("per_unit"),
            BillingScheme::Other(scheme) => f.write_str(scheme),
        }
    }
}

/// Reference to the plan (price) a subscription bills against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRef {
    /// Plan identifier, used to look up the tier schedule.
    pub id: String,

    /// Billing scheme of the plan.
    pub billing_scheme: BillingScheme,

    /// Billing interval of the plan.
    pub interval: BillingInterval,
}

/// A customer's subscription.
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Subscription identifier.
    pub id: String,

    /// Lifecycle status.
    pub status: SubscriptionStatus,

    /// Whether the subscription is set to cancel at the end of the current period.
    pub cancel_at_period_end: bool,

    /// When the cancellation was requested, if ever.
    pub canceled_at: Option<Timestamp>,

    /// When the subscription started.
    pub start_date: Timestamp,

    /// Number of billed units.
    pub quantity: u64,

    /// Plan the subscription bills against.
    pub plan: PlanRef,

    /// Discount attached to the subscription itself.
    pub discount: Option<Discount>,
}

impl Subscription {
    /// Billing interval of the subscription's plan.
    pub fn interval(&self) -> BillingInterval {
        self.plan.interval
    }
}

/// A customer together with everything the engine needs from it.
#[derive(Debug, Clone)]
pub struct Customer {
    /// Customer identifier.
    pub id: String,

    /// Discount attached to the customer, applied after any subscription discount.
    pub discount: Option<Discount>,

    /// The customer's subscriptions, in source order.
    pub subscriptions: Vec<Subscription>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_str_maps_known_values() {
        assert_eq!(SubscriptionStatus::from("active"), SubscriptionStatus::Active);
        assert_eq!(SubscriptionStatus::from("past_due"), SubscriptionStatus::PastDue);
        assert_eq!(
            SubscriptionStatus::from("paused"),
            SubscriptionStatus::Other("paused".to_string())
        );
    }

    #[test]
    fn only_active_status_is_active() {
        assert!(SubscriptionStatus::Active.is_active());
        assert!(!SubscriptionStatus::Trialing.is_active());
        assert!(!SubscriptionStatus::Other("active ".to_string()).is_active());
    }

    #[test]
    fn billing_scheme_display() {
        assert_eq!(BillingScheme::Tiered.to_string(), "tiered");
        assert_eq!(BillingScheme::PerUnit.to_string(), "per_unit");
        assert_eq!(BillingScheme::from("package").to_string(), "package");
    }

    #[test]
    fn billing_scheme_from_str_keeps_unknown_values() {
        assert_eq!(BillingScheme::from("tiered"), BillingScheme::Tiered);
        assert_eq!(
            BillingScheme::from("package"),
            BillingScheme::Other("package".to_string())
        );
    }
}
