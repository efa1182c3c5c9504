//! # Lookup Subcommand
//!
//! Prints the full record for one code as JSON.

use anyhow::Result;
use clap::Args;

use crate::GlobalOptions;

/// Arguments for the `postal lookup` subcommand.
#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Postal code to look up.
    #[arg(value_name = "CODE")]
    pub code: String,
}

/// Execute the lookup subcommand.
///
/// Returns exit code: 0 when found, 1 when no record has the code.
pub async fn run_lookup(args: &LookupArgs, global: &GlobalOptions) -> Result<u8> {
    let store = global.open_query_store().await?;
    match store.get(&args.code).await? {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            println!("{}", record.full_address());
            Ok(0)
        }
        None => {
            println!("{}: not found", args.code.trim());
            Ok(1)
        }
    }
}
