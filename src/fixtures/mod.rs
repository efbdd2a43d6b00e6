//! Fixtures
//!
//! Loads a billing snapshot (price catalogue plus customers) from YAML files laid out as
//! `<base>/prices/<set>.yml` and `<base>/customers/<set>.yml`.

use std::{fs, path::PathBuf};

use rusty_money::iso::Currency;
use thiserror::Error;

use crate::{
    fixtures::{customers::CustomersFixture, prices::PricesFixture},
    sources::{PriceCatalogue, TierLookup, TierLookupError},
    subscriptions::Customer,
    tiers::TierSchedule,
};

pub mod customers;
pub mod prices;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Unknown billing interval
    #[error("Unknown billing interval: {0}")]
    UnknownInterval(String),

    /// Currency mismatch between price files
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// Percent-off outside 0 to 100
    #[error("Invalid percentage: {0}")]
    InvalidPercentage(String),

    /// Subscription with a zero quantity
    #[error("Subscription {0} has a zero quantity")]
    InvalidQuantity(String),

    /// No prices loaded yet
    #[error("No prices loaded yet; currency unknown")]
    NoCurrency,
}

/// A snapshot of billing data: the data source and tier lookup for one report.
#[derive(Debug)]
pub struct Snapshot {
    /// Base path for fixture files
    base_path: PathBuf,

    /// Plan id -> tier schedule
    catalogue: PriceCatalogue,

    /// Customers in file order
    customers: Vec<Customer>,

    /// Currency for the snapshot
    currency: Option<&'static Currency>,
}

impl Snapshot {
    /// Create a new empty snapshot with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty snapshot with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            catalogue: PriceCatalogue::new(),
            customers: Vec::new(),
            currency: None,
        }
    }

    /// Load the price catalogue from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or names an unknown or mismatched
    /// currency.
    pub fn load_prices(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("prices").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;

        self.add_prices(&contents)
    }

    /// Load customers from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds an invalid record.
    pub fn load_customers(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("customers").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;

        self.add_customers(&contents)
    }

    /// Add prices from YAML source
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed, or names an unknown currency or one that
    /// differs from previously loaded prices.
    pub fn add_prices(&mut self, yaml: &str) -> Result<&mut Self, FixtureError> {
        let fixture: PricesFixture = serde_norway::from_str(yaml)?;
        let currency = prices::parse_currency(&fixture.currency)?;

        match self.currency {
            Some(existing) if existing != currency => {
                return Err(FixtureError::CurrencyMismatch(
                    existing.iso_alpha_code.to_string(),
                    currency.iso_alpha_code.to_string(),
                ));
            }
            Some(_) => {}
            None => self.currency = Some(currency),
        }

        for (plan_id, price_fixture) in fixture.prices {
            self.catalogue.insert(plan_id, TierSchedule::from(price_fixture));
        }

        Ok(self)
    }

    /// Add customers from YAML source
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed or holds an invalid record.
    pub fn add_customers(&mut self, yaml: &str) -> Result<&mut Self, FixtureError> {
        let fixture: CustomersFixture = serde_norway::from_str(yaml)?;

        for customer_fixture in fixture.customers {
            self.customers.push(Customer::try_from(customer_fixture)?);
        }

        Ok(self)
    }

    /// Load a complete snapshot (prices and customers with the same name)
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set(base_path: impl Into<PathBuf>, name: &str) -> Result<Self, FixtureError> {
        let mut snapshot = Self::with_base_path(base_path);

        snapshot.load_prices(name)?.load_customers(name)?;

        Ok(snapshot)
    }

    /// Customers, in file order
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    /// The price catalogue
    pub fn catalogue(&self) -> &PriceCatalogue {
        &self.catalogue
    }

    /// Currency of the snapshot's prices
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::NoCurrency`] if no prices have been loaded.
    pub fn currency(&self) -> Result<&'static Currency, FixtureError> {
        self.currency.ok_or(FixtureError::NoCurrency)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl TierLookup for Snapshot {
    fn tier_schedule(&self, plan_id: &str) -> Result<TierSchedule, TierLookupError> {
        self.catalogue.tier_schedule(plan_id)
    }
}
