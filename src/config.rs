//! Report configuration

use std::path::PathBuf;

use clap::{Args, Parser};
use jiff::{Timestamp, tz::TimeZone};
use thiserror::Error;

use crate::valuation::{Valuation, ValuationError};

/// Errors turning configuration into runtime values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The time zone name is not in the time zone database.
    #[error("unknown time zone {name}: {source}")]
    TimeZone {
        /// Configured name.
        name: String,

        /// Lookup failure.
        source: jiff::Error,
    },

    /// The reference time is out of range.
    #[error(transparent)]
    Valuation(#[from] ValuationError),
}

/// Log output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// MRR report configuration
#[derive(Debug, Parser)]
#[command(name = "mrr", about = "Monthly recurring revenue report", long_about = None)]
pub struct Config {
    /// Directory holding `prices/` and `customers/` snapshot files
    #[arg(short, long, env = "MRR_FIXTURES", default_value = "./fixtures")]
    pub fixtures: PathBuf,

    /// Snapshot set to load
    #[arg(short, long, env = "MRR_SET", default_value = "demo")]
    pub set: String,

    /// Reference time (RFC 3339); defaults to now
    #[arg(long, env = "MRR_NOW")]
    pub now: Option<Timestamp>,

    /// Time zone months and days are counted in
    #[arg(long, env = "MRR_TIME_ZONE", default_value = "UTC")]
    pub time_zone: String,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// The configured time zone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TimeZone`] if the name cannot be resolved.
    pub fn time_zone(&self) -> Result<TimeZone, ConfigError> {
        if self.time_zone.eq_ignore_ascii_case("UTC") {
            return Ok(TimeZone::UTC);
        }

        TimeZone::get(&self.time_zone).map_err(|source| ConfigError::TimeZone {
            name: self.time_zone.clone(),
            source,
        })
    }

    /// The valuation the report is generated for.
    ///
    /// # Errors
    ///
    /// Returns an error if the time zone is unknown or the reference time is out of range.
    pub fn valuation(&self) -> Result<Valuation, ConfigError> {
        let now = self.now.unwrap_or_else(Timestamp::now);

        Ok(Valuation::at(now, self.time_zone()?)?)
    }
}
