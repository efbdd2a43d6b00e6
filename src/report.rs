//! Report
//!
//! Runs every customer's subscriptions through the revenue resolver, aggregates the results and
//! renders them.

use std::io;

use jiff::Timestamp;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rustc_hash::FxHashSet;
use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    aggregate::{MonthBucket, aggregate},
    revenue::{Exclusion, Resolution, resolve},
    sources::{TierLookup, TierLookupError},
    subscriptions::Customer,
    tiers::PricingError,
    valuation::{Valuation, ValuationError},
    windows::TrailingWindow,
};

/// Errors that abort report generation or rendering.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A plan's tier schedule could not be fetched; totals would be understated.
    #[error(transparent)]
    TierLookup(#[from] TierLookupError),

    /// A window cutoff could not be computed.
    #[error(transparent)]
    Valuation(#[from] ValuationError),

    /// An amount does not fit in minor currency units.
    #[error("amount out of range: {0}")]
    AmountOutOfRange(Decimal),

    /// Writing the report failed.
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}

/// A recoverable condition met while generating a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The customer has no subscriptions.
    NoSubscriptions {
        /// Customer id.
        customer: String,
    },

    /// The subscription id was already processed for an earlier record.
    DuplicateSubscription {
        /// Subscription id.
        subscription: String,
    },

    /// The subscription's pricing could not be valued.
    UnsupportedPricing {
        /// Subscription id.
        subscription: String,

        /// What was unsupported.
        error: PricingError,
    },
}

/// Subscription counts by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Customers processed.
    pub customers: usize,

    /// Subscriptions resolved.
    pub subscriptions: usize,

    /// Subscriptions contributing revenue records.
    pub included: usize,

    /// Subscriptions cancelling before the horizon.
    pub cancelling: usize,

    /// Subscriptions that are not active.
    pub inactive: usize,

    /// Subscriptions with unsupported pricing, excluded or priced at zero.
    pub unsupported: usize,
}

impl Counts {
    fn record(&mut self, resolution: &Resolution) {
        self.subscriptions += 1;

        match resolution {
            Resolution::Revenue(_) => self.included += 1,
            Resolution::Unpriced(..) => {
                self.included += 1;
                self.unsupported += 1;
            }
            Resolution::Excluded(Exclusion::Cancelling) => self.cancelling += 1,
            Resolution::Excluded(Exclusion::Inactive) => self.inactive += 1,
            Resolution::Excluded(Exclusion::Unsupported(_)) => self.unsupported += 1,
        }
    }
}

/// Recurring revenue report.
#[derive(Debug, Clone)]
pub struct Report {
    currency: &'static Currency,
    generated_at: Timestamp,
    total: Decimal,
    months: Vec<MonthBucket>,
    windows: Vec<(TrailingWindow, Decimal)>,
    counts: Counts,
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Total monthly recurring revenue in major units.
    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Month buckets, most recent month first.
    pub fn months(&self) -> &[MonthBucket] {
        &self.months
    }

    /// Revenue added within each trailing window, shortest first.
    pub fn windows(&self) -> &[(TrailingWindow, Decimal)] {
        &self.windows
    }

    /// Revenue added within `window`.
    pub fn window(&self, window: TrailingWindow) -> Option<Decimal> {
        self.windows
            .iter()
            .find(|(w, _)| *w == window)
            .map(|(_, amount)| *amount)
    }

    /// Subscription counts by outcome.
    pub fn counts(&self) -> Counts {
        self.counts
    }

    /// Recoverable conditions met while generating the report.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Reference time of the report.
    pub fn generated_at(&self) -> Timestamp {
        self.generated_at
    }

    /// Currency amounts are reported in.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Writes the report: reference time, total MRR, the month table and the trailing-window
    /// table.
    ///
    /// # Errors
    ///
    /// Returns an error if an amount cannot be formatted or the output cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReportError> {
        writeln!(out, "As of\t{}", self.generated_at)?;
        writeln!(out, "MRR is\t{}", self.money(self.total)?)?;

        let mut months = Builder::default();

        months.push_record(["Month", "New subscriptions", "MRR"]);

        for bucket in &self.months {
            months.push_record([
                bucket.month.to_string(),
                bucket.subscriptions.to_string(),
                self.money(bucket.revenue)?,
            ]);
        }

        write_table(&mut out, months)?;

        let mut windows = Builder::default();

        windows.push_record(["Window", "MRR added"]);

        for (window, amount) in &self.windows {
            windows.push_record([window.to_string(), self.money(*amount)?]);
        }

        write_table(&mut out, windows)?;

        Ok(())
    }

    fn money(&self, amount: Decimal) -> Result<String, ReportError> {
        let minor = (amount * Decimal::ONE_HUNDRED)
            .round_dp(0)
            .to_i64()
            .ok_or(ReportError::AmountOutOfRange(amount))?;

        Ok(Money::from_minor(minor, self.currency).to_string())
    }
}

fn write_table(out: &mut impl io::Write, builder: Builder) -> Result<(), ReportError> {
    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(1..), Alignment::right());

    writeln!(out, "\n{table}")?;

    Ok(())
}

/// Generate a recurring revenue report.
///
/// Customers are processed in order and each subscription is resolved once; a subscription id
/// seen before is skipped. Recoverable conditions are logged and collected as
/// [`Diagnostic`]s.
///
/// # Errors
///
/// Returns [`ReportError::TierLookup`] as soon as a tier schedule cannot be fetched; no partial
/// report is produced.
pub fn generate_report(
    customers: &[Customer],
    lookup: &impl TierLookup,
    valuation: &Valuation,
    currency: &'static Currency,
) -> Result<Report, ReportError> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut records = Vec::new();
    let mut counts = Counts::default();
    let mut diagnostics = Vec::new();

    for customer in customers {
        counts.customers += 1;

        if customer.subscriptions.is_empty() {
            info!(customer = %customer.id, "customer has no subscriptions");

            diagnostics.push(Diagnostic::NoSubscriptions {
                customer: customer.id.clone(),
            });

            continue;
        }

        for subscription in &customer.subscriptions {
            if !seen.insert(subscription.id.as_str()) {
                warn!(subscription = %subscription.id, "duplicate subscription skipped");

                diagnostics.push(Diagnostic::DuplicateSubscription {
                    subscription: subscription.id.clone(),
                });

                continue;
            }

            let resolution = resolve(subscription, customer.discount.as_ref(), lookup, valuation)?;

            counts.record(&resolution);

            match resolution {
                Resolution::Revenue(record) => records.push(record),
                Resolution::Unpriced(record, error) => {
                    diagnostics.push(Diagnostic::UnsupportedPricing {
                        subscription: subscription.id.clone(),
                        error,
                    });

                    records.push(record);
                }
                Resolution::Excluded(Exclusion::Unsupported(error)) => {
                    diagnostics.push(Diagnostic::UnsupportedPricing {
                        subscription: subscription.id.clone(),
                        error,
                    });
                }
                Resolution::Excluded(_) => {}
            }
        }
    }

    let aggregate = aggregate(records);

    let windows = TrailingWindow::ALL
        .into_iter()
        .map(|window| Ok((window, aggregate.mrr_since(window.cutoff(valuation)?))))
        .collect::<Result<Vec<_>, ValuationError>>()?;

    info!(
        total = %aggregate.total(),
        customers = counts.customers,
        subscriptions = counts.subscriptions,
        included = counts.included,
        "report generated"
    );

    Ok(Report {
        currency,
        generated_at: valuation.now(),
        total: aggregate.total(),
        months: aggregate.months().rev().copied().collect(),
        windows,
        counts,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use jiff::tz::TimeZone;
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use super::*;
    use crate::{
        aggregate::MonthKey,
        sources::PriceCatalogue,
        subscriptions::{BillingInterval, BillingScheme, PlanRef, Subscription, SubscriptionStatus},
        tiers::{Tier, TierSchedule},
    };

    fn valuation() -> TestResult<Valuation> {
        Ok(Valuation::at("2024-06-15T00:00:00Z".parse()?, TimeZone::UTC)?)
    }

    fn catalogue() -> PriceCatalogue {
        let mut catalogue = PriceCatalogue::new();

        catalogue.insert(
            "price_seats",
            TierSchedule::graduated([
                Tier::new(2, Decimal::from(500)),
                Tier::unbounded(Decimal::from(300)),
            ]),
        );

        catalogue
    }

    fn subscription(id: &str, start: &str, quantity: u64) -> TestResult<Subscription> {
        Ok(Subscription {
            id: id.to_string(),
            status: SubscriptionStatus::Active,
            cancel_at_period_end: false,
            canceled_at: None,
            start_date: start.parse()?,
            quantity,
            plan: PlanRef {
                id: "price_seats".to_string(),
                billing_scheme: BillingScheme::Tiered,
                interval: BillingInterval::Month,
            },
            discount: None,
        })
    }

    fn customer(id: &str, subscriptions: Vec<Subscription>) -> Customer {
        Customer {
            id: id.to_string(),
            discount: None,
            subscriptions,
        }
    }

    #[test]
    fn single_subscription_report() -> TestResult {
        let customers = [
            customer(
                "cus_1",
                vec![subscription("sub_1", "2024-03-05T10:00:00Z", 3)?],
            ),
            customer("cus_2", Vec::new()),
        ];

        let report = generate_report(&customers, &catalogue(), &valuation()?, USD)?;

        assert_eq!(report.total(), Decimal::from(13));
        assert_eq!(
            report.months(),
            [MonthBucket {
                month: MonthKey::new(2024, 3),
                revenue: Decimal::from(13),
                subscriptions: 1,
            }]
        );
        assert_eq!(
            report.diagnostics(),
            [Diagnostic::NoSubscriptions {
                customer: "cus_2".to_string()
            }]
        );

        Ok(())
    }

    #[test]
    fn months_are_most_recent_first() -> TestResult {
        let customers = [customer(
            "cus_1",
            vec![
                subscription("sub_1", "2024-01-05T00:00:00Z", 1)?,
                subscription("sub_2", "2024-05-05T00:00:00Z", 1)?,
                subscription("sub_3", "2024-03-05T00:00:00Z", 1)?,
            ],
        )];

        let report = generate_report(&customers, &catalogue(), &valuation()?, USD)?;
        let months: Vec<String> = report.months().iter().map(|b| b.month.to_string()).collect();

        assert_eq!(months, ["2024-05", "2024-03", "2024-01"]);

        Ok(())
    }

    #[test]
    fn trailing_windows_sum_recent_starts() -> TestResult {
        let customers = [customer(
            "cus_1",
            vec![
                subscription("sub_today", "2024-06-14T12:00:00Z", 1)?,
                subscription("sub_week", "2024-06-10T00:00:00Z", 1)?,
                subscription("sub_old", "2023-01-01T00:00:00Z", 1)?,
            ],
        )];

        let report = generate_report(&customers, &catalogue(), &valuation()?, USD)?;

        assert_eq!(report.window(TrailingWindow::Day), Some(Decimal::from(5)));
        assert_eq!(report.window(TrailingWindow::Week), Some(Decimal::from(10)));
        assert_eq!(report.window(TrailingWindow::Quarter), Some(Decimal::from(10)));
        assert_eq!(report.total(), Decimal::from(15));

        Ok(())
    }

    #[test]
    fn duplicate_subscription_counts_once() -> TestResult {
        let sub = subscription("sub_1", "2024-03-05T10:00:00Z", 3)?;
        let customers = [
            customer("cus_1", vec![sub.clone()]),
            customer("cus_1_again", vec![sub]),
        ];

        let report = generate_report(&customers, &catalogue(), &valuation()?, USD)?;

        assert_eq!(report.total(), Decimal::from(13));
        assert_eq!(report.counts().subscriptions, 1);
        assert_eq!(
            report.diagnostics(),
            [Diagnostic::DuplicateSubscription {
                subscription: "sub_1".to_string()
            }]
        );

        Ok(())
    }

    #[test]
    fn unsupported_scheme_is_reported_and_skipped() -> TestResult {
        let mut per_unit = subscription("sub_per_unit", "2024-03-05T10:00:00Z", 3)?;

        per_unit.plan.billing_scheme = BillingScheme::PerUnit;

        let customers = [customer("cus_1", vec![per_unit])];
        let report = generate_report(&customers, &catalogue(), &valuation()?, USD)?;

        assert_eq!(report.total(), Decimal::ZERO);
        assert!(report.months().is_empty());
        assert_eq!(report.counts().unsupported, 1);
        assert!(matches!(
            report.diagnostics(),
            [Diagnostic::UnsupportedPricing { .. }]
        ));

        Ok(())
    }

    #[test]
    fn tier_lookup_failure_aborts() -> TestResult {
        let mut unknown = subscription("sub_unknown", "2024-03-05T10:00:00Z", 3)?;

        unknown.plan.id = "price_missing".to_string();

        let customers = [customer(
            "cus_1",
            vec![subscription("sub_1", "2024-03-05T10:00:00Z", 3)?, unknown],
        )];

        let result = generate_report(&customers, &catalogue(), &valuation()?, USD);

        assert!(matches!(
            result,
            Err(ReportError::TierLookup(TierLookupError::UnknownPlan(_)))
        ));

        Ok(())
    }

    #[derive(Debug)]
    struct UnreachableCatalogue;

    impl TierLookup for UnreachableCatalogue {
        fn tier_schedule(&self, plan_id: &str) -> Result<TierSchedule, TierLookupError> {
            Err(TierLookupError::Backend {
                plan: plan_id.to_string(),
                source: Box::new(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "price service timed out",
                )),
            })
        }
    }

    #[test]
    fn backend_failure_aborts() -> TestResult {
        let customers = [customer(
            "cus_1",
            vec![subscription("sub_1", "2024-03-05T10:00:00Z", 3)?],
        )];

        let result = generate_report(&customers, &UnreachableCatalogue, &valuation()?, USD);

        let error = match result {
            Err(ReportError::TierLookup(error @ TierLookupError::Backend { .. })) => error,
            other => return Err(format!("expected backend failure, got {other:?}").into()),
        };

        assert_eq!(
            error.to_string(),
            "tier lookup failed for plan price_seats: price service timed out"
        );

        Ok(())
    }

    #[test]
    fn write_to_renders_totals_and_tables() -> TestResult {
        let customers = [customer(
            "cus_1",
            vec![subscription("sub_1", "2024-03-05T10:00:00Z", 3)?],
        )];

        let report = generate_report(&customers, &catalogue(), &valuation()?, USD)?;
        let mut out = Vec::new();

        report.write_to(&mut out)?;

        let rendered = String::from_utf8(out)?;

        assert!(
            rendered.starts_with("As of\t2024-06-15T00:00:00Z\nMRR is\t"),
            "{rendered}"
        );
        assert!(rendered.contains("13.00"), "{rendered}");
        assert!(rendered.contains("2024-03"), "{rendered}");
        assert!(rendered.contains("last 90 days"), "{rendered}");

        Ok(())
    }
}
