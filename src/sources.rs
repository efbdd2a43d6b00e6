//! Sources
//!
//! Collaborators the engine reads from: the price catalogue that resolves a plan to its tier
//! schedule. Customers and subscriptions are passed in directly as [`Customer`] values.
//!
//! [`Customer`]: crate::subscriptions::Customer

use std::error::Error;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::tiers::TierSchedule;

/// Errors returned by a tier lookup. Any of these aborts report generation.
#[derive(Debug, Error)]
pub enum TierLookupError {
    /// The catalogue has no price with this identifier.
    #[error("no price found for plan {0}")]
    UnknownPlan(String),

    /// The backing store failed.
    #[error("tier lookup failed for plan {plan}: {source}")]
    Backend {
        /// Plan being looked up.
        plan: String,

        /// Underlying failure.
        source: Box<dyn Error + Send + Sync>,
    },
}

/// Resolves a plan identifier to its tier schedule.
pub trait TierLookup {
    /// Fetch the tier schedule for `plan_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`TierLookupError`] if the schedule cannot be retrieved.
    fn tier_schedule(&self, plan_id: &str) -> Result<TierSchedule, TierLookupError>;
}

/// In-memory price catalogue keyed by plan identifier.
#[derive(Debug, Clone, Default)]
pub struct PriceCatalogue {
    prices: FxHashMap<String, TierSchedule>,
}

impl PriceCatalogue {
    /// Create an empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the schedule for `plan_id`.
    pub fn insert(&mut self, plan_id: impl Into<String>, schedule: TierSchedule) -> &mut Self {
        self.prices.insert(plan_id.into(), schedule);
        self
    }

    /// Number of prices in the catalogue.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Returns `true` if the catalogue holds no prices.
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(String, TierSchedule)> for PriceCatalogue {
    fn from_iter<I: IntoIterator<Item = (String, TierSchedule)>>(iter: I) -> Self {
        Self {
            prices: iter.into_iter().collect(),
        }
    }
}

impl TierLookup for PriceCatalogue {
    fn tier_schedule(&self, plan_id: &str) -> Result<TierSchedule, TierLookupError> {
        self.prices
            .get(plan_id)
            .cloned()
            .ok_or_else(|| TierLookupError::UnknownPlan(plan_id.to_string()))
    }
}
