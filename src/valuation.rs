//! Valuation
//!
//! The point in time a report is generated for, and the one-year horizon recurring revenue is
//! measured against.

use jiff::{Timestamp, ToSpan, Zoned, tz::TimeZone};
use thiserror::Error;

use crate::aggregate::MonthKey;

/// Errors raised while deriving dates from the reference time.
#[derive(Debug, Error)]
pub enum ValuationError {
    /// Date arithmetic left the supported range.
    #[error("date arithmetic out of range: {0}")]
    Arithmetic(#[from] jiff::Error),
}

/// Reference time of a report.
///
/// Discounts and cancellations that take effect before [`Valuation::horizon`] are not part of
/// steady-state revenue.
#[derive(Debug, Clone)]
pub struct Valuation {
    now: Zoned,
    horizon: Timestamp,
}

impl Valuation {
    /// Create a valuation at `now`, in `now`'s time zone.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::Arithmetic`] if `now` plus one year is out of range.
    pub fn new(now: Zoned) -> Result<Self, ValuationError> {
        let horizon = now.checked_add(1.year())?.timestamp();

        Ok(Self { now, horizon })
    }

    /// Create a valuation at `now`, observed in `time_zone`.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::Arithmetic`] if `now` plus one year is out of range.
    pub fn at(now: Timestamp, time_zone: TimeZone) -> Result<Self, ValuationError> {
        Self::new(now.to_zoned(time_zone))
    }

    /// The reference time.
    pub fn now(&self) -> Timestamp {
        self.now.timestamp()
    }

    /// The reference time plus one calendar year.
    pub fn horizon(&self) -> Timestamp {
        self.horizon
    }

    /// Time zone calendar months and days are observed in.
    pub fn time_zone(&self) -> &TimeZone {
        self.now.time_zone()
    }

    /// Returns `true` if `at` falls strictly before the horizon.
    pub fn before_horizon(&self, at: Timestamp) -> bool {
        at < self.horizon
    }

    /// The instant `days` calendar days before the reference time.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::Arithmetic`] if the result is out of range.
    pub fn days_ago(&self, days: i64) -> Result<Timestamp, ValuationError> {
        Ok(self.now.checked_sub(days.days())?.timestamp())
    }

    /// Calendar month `at` falls in.
    pub fn month_of(&self, at: Timestamp) -> MonthKey {
        MonthKey::from(&at.to_zoned(self.time_zone().clone()))
    }
}
