//! Aggregate
//!
//! Folds resolved revenue records into the figures a report needs: total MRR, revenue per
//! start month, and records ordered most-recent-first for trailing-window queries.

use std::{cmp::Reverse, collections::BTreeMap, fmt};

use jiff::Zoned;
use rust_decimal::Decimal;

use crate::{revenue::RevenueRecord, windows::mrr_since};

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i16,
    month: i8,
}

impl MonthKey {
    /// Create a month key. `month` is 1-based.
    pub fn new(year: i16, month: i8) -> Self {
        Self { year, month }
    }

    /// Calendar year.
    pub fn year(&self) -> i16 {
        self.year
    }

    /// Month of the year, 1-based.
    pub fn month(&self) -> i8 {
        self.month
    }
}

impl From<&Zoned> for MonthKey {
    fn from(zoned: &Zoned) -> Self {
        Self::new(zoned.year(), zoned.month())
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Revenue from subscriptions that started in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthBucket {
    /// The start month.
    pub month: MonthKey,

    /// Monthly-equivalent revenue in major units.
    pub revenue: Decimal,

    /// Number of contributing subscriptions.
    pub subscriptions: usize,
}

impl MonthBucket {
    fn empty(month: MonthKey) -> Self {
        Self {
            month,
            revenue: Decimal::ZERO,
            subscriptions: 0,
        }
    }

    fn add(&mut self, record: &RevenueRecord) {
        self.revenue += record.amount;
        self.subscriptions += 1;
    }
}

/// Aggregated revenue across a set of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    total: Decimal,
    months: BTreeMap<MonthKey, MonthBucket>,
    records: Vec<RevenueRecord>,
}

impl Aggregate {
    /// Total monthly recurring revenue in major units.
    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Month buckets, oldest month first.
    pub fn months(&self) -> impl DoubleEndedIterator<Item = &MonthBucket> + ExactSizeIterator {
        self.months.values()
    }

    /// Bucket for `month`, if any subscription started in it.
    pub fn month(&self, month: MonthKey) -> Option<&MonthBucket> {
        self.months.get(&month)
    }

    /// Records ordered by start date, most recent first.
    pub fn records(&self) -> &[RevenueRecord] {
        &self.records
    }

    /// Revenue from subscriptions that started at or after `cutoff`.
    pub fn mrr_since(&self, cutoff: jiff::Timestamp) -> Decimal {
        mrr_since(cutoff, &self.records)
    }
}

/// Aggregate `records` into totals, month buckets and a start-date ordering.
pub fn aggregate(records: impl IntoIterator<Item = RevenueRecord>) -> Aggregate {
    let mut records: Vec<RevenueRecord> = records.into_iter().collect();
    let mut months: BTreeMap<MonthKey, MonthBucket> = BTreeMap::new();
    let mut total = Decimal::ZERO;

    for record in &records {
        total += record.amount;

        months
            .entry(record.month)
            .or_insert_with(|| MonthBucket::empty(record.month))
            .add(record);
    }

    records.sort_by_key(|record| Reverse(record.started_at));

    Aggregate {
        total,
        months,
        records,
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use testresult::TestResult;

    use super::*;

    fn record(
        id: &str,
        started_at: &str,
        month: MonthKey,
        amount: Decimal,
    ) -> TestResult<RevenueRecord> {
        Ok(RevenueRecord {
            subscription_id: id.to_string(),
            started_at: started_at.parse::<Timestamp>()?,
            month,
            amount,
        })
    }

    fn records() -> TestResult<Vec<RevenueRecord>> {
        let january = MonthKey::new(2024, 1);
        let march = MonthKey::new(2024, 3);

        Ok(vec![
            record("sub_a", "2024-01-10T00:00:00Z", january, Decimal::new(1300, 2))?,
            record("sub_b", "2024-03-02T00:00:00Z", march, Decimal::new(500, 2))?,
            record("sub_c", "2024-01-20T00:00:00Z", january, Decimal::new(250, 2))?,
        ])
    }

    #[test]
    fn total_sums_all_records() -> TestResult {
        let aggregate = aggregate(records()?);

        assert_eq!(aggregate.total(), Decimal::new(2050, 2));

        Ok(())
    }

    #[test]
    fn buckets_group_by_start_month() -> TestResult {
        let aggregate = aggregate(records()?);

        let january = aggregate.month(MonthKey::new(2024, 1)).ok_or("missing january")?;

        assert_eq!(january.subscriptions, 2);
        assert_eq!(january.revenue, Decimal::new(1550, 2));
        assert_eq!(aggregate.month(MonthKey::new(2024, 2)), None);

        Ok(())
    }

    #[test]
    fn buckets_are_in_ascending_month_order() -> TestResult {
        let aggregate = aggregate(records()?);

        let keys: Vec<String> = aggregate.months().map(|b| b.month.to_string()).collect();

        assert_eq!(keys, ["2024-01", "2024-03"]);

        Ok(())
    }

    #[test]
    fn records_are_sorted_most_recent_first() -> TestResult {
        let aggregate = aggregate(records()?);

        let ids: Vec<&str> = aggregate
            .records()
            .iter()
            .map(|r| r.subscription_id.as_str())
            .collect();

        assert_eq!(ids, ["sub_b", "sub_c", "sub_a"]);

        Ok(())
    }

    #[test]
    fn aggregation_is_repeatable() -> TestResult {
        let first = aggregate(records()?);
        let second = aggregate(records()?);

        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn empty_input_aggregates_to_zero() {
        let aggregate = aggregate(Vec::new());

        assert_eq!(aggregate.total(), Decimal::ZERO);
        assert_eq!(aggregate.months().len(), 0);
        assert!(aggregate.records().is_empty());
    }

    #[test]
    fn month_key_display_is_zero_padded() {
        assert_eq!(MonthKey::new(2024, 3).to_string(), "2024-03");
    }
}
