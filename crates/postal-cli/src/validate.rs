//! # Validate Subcommand
//!
//! Checks a postal code against one country's format rule.

use anyhow::Result;
use clap::Args;

use crate::GlobalOptions;

/// Arguments for the `postal validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Country whose rule applies (e.g. PT).
    #[arg(long, default_value = "PT")]
    pub country: String,

    /// Postal code to check.
    #[arg(value_name = "CODE")]
    pub code: String,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when the code is valid, 1 when it is not. An unknown
/// country is an operational error.
pub fn run_validate(args: &ValidateArgs, global: &GlobalOptions) -> Result<u8> {
    let registry = global.country_registry()?;
    let rule = registry.lookup(&args.country)?;
    match rule.validate(&args.code) {
        Ok(normalized) => {
            println!("VALID: {normalized} ({})", rule.name);
            Ok(0)
        }
        Err(e) => {
            println!("INVALID: {e}");
            Ok(1)
        }
    }
}
