//! MRR
//!
//! Estimates monthly recurring revenue from subscription records: total MRR, revenue by the
//! month subscriptions started, and revenue added over trailing windows.

pub mod aggregate;
pub mod config;
pub mod discounts;
pub mod fixtures;
pub mod logging;
pub mod prelude;
pub mod report;
pub mod revenue;
pub mod sources;
pub mod subscriptions;
pub mod tiers;
pub mod valuation;
pub mod windows;
