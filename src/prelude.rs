//! MRR prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    aggregate::{Aggregate, MonthBucket, MonthKey, aggregate},
    discounts::{Coupon, Discount, apply_discount, apply_discounts},
    fixtures::{FixtureError, Snapshot},
    report::{Counts, Diagnostic, Report, ReportError, generate_report},
    revenue::{Exclusion, Resolution, RevenueRecord, resolve},
    sources::{PriceCatalogue, TierLookup, TierLookupError},
    subscriptions::{
        BillingInterval, BillingScheme, Customer, PlanRef, Subscription, SubscriptionStatus,
    },
    tiers::{PricingError, Tier, TierSchedule, TiersMode, evaluate},
    valuation::{Valuation, ValuationError},
    windows::{TrailingWindow, mrr_since},
};
