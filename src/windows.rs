//! Trailing windows
//!
//! Revenue added by subscriptions that started within a lookback period.

use std::fmt;

use jiff::Timestamp;
use rust_decimal::Decimal;

use crate::{
    revenue::RevenueRecord,
    valuation::{Valuation, ValuationError},
};

/// A lookback period ending at the valuation's reference time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingWindow {
    /// The last day.
    Day,

    /// The last 7 days.
    Week,

    /// The last 30 days.
    Month,

    /// The last 90 days.
    Quarter,
}

impl TrailingWindow {
    /// Every window, shortest first.
    pub const ALL: [TrailingWindow; 4] = [
        TrailingWindow::Day,
        TrailingWindow::Week,
        TrailingWindow::Month,
        TrailingWindow::Quarter,
    ];

    /// Length of the window in calendar days.
    pub fn days(self) -> i64 {
        match self {
            TrailingWindow::Day => 1,
            TrailingWindow::Week => 7,
            TrailingWindow::Month => 30,
            TrailingWindow::Quarter => 90,
        }
    }

    /// Earliest start date that falls inside the window.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::Arithmetic`] if the cutoff is out of range.
    pub fn cutoff(self, valuation: &Valuation) -> Result<Timestamp, ValuationError> {
        valuation.days_ago(self.days())
    }
}

impl fmt::Display for TrailingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrailingWindow::Day => f.write_str("last day"),
            days => write!(f, "last {} days", days.days()),
        }
    }
}

/// Sum revenue of records that started at or after `cutoff`.
///
/// `records` must be sorted by start date, most recent first; the qualifying records are then
/// a prefix located by binary search. Unsorted input gives a wrong sum rather than an error.
pub fn mrr_since(cutoff: Timestamp, records: &[RevenueRecord]) -> Decimal {
    let end = records.partition_point(|record| record.started_at >= cutoff);

    records
        .iter()
        .take(end)
        .map(|record| record.amount)
        .sum()
}
