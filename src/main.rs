//! MRR report CLI

use std::io;

use anyhow::Result;
use mrr::{
    config::Config, fixtures::Snapshot, logging::init_subscriber, report::generate_report,
};

pub fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|error| error.exit());

    init_subscriber(&config.logging)?;

    let snapshot = Snapshot::from_set(&config.fixtures, &config.set)?;
    let valuation = config.valuation()?;

    let report = generate_report(
        snapshot.customers(),
        &snapshot,
        &valuation,
        snapshot.currency()?,
    )?;

    report.write_to(io::stdout().lock())?;

    Ok(())
}
