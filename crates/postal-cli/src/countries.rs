//! # Countries Subcommand
//!
//! Lists the supported countries and their code formats.

use anyhow::Result;
use clap::Args;

use crate::{bundled_dataset, GlobalOptions};

/// Arguments for the `postal countries` subcommand.
#[derive(Args, Debug)]
pub struct CountriesArgs {}

/// Execute the countries subcommand.
pub fn run_countries(_args: &CountriesArgs, global: &GlobalOptions) -> Result<u8> {
    let registry = global.country_registry()?;
    for rule in registry.iter() {
        let bundled = if bundled_dataset(&rule.code).is_some() {
            " [bundled]"
        } else {
            ""
        };
        println!(
            "{}  {:<16} {}{bundled}",
            rule.code,
            rule.name,
            rule.rule.describe()
        );
    }
    Ok(0)
}
