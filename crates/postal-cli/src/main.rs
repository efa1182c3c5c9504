//! # postal CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use postal_cli::countries::{run_countries, CountriesArgs};
use postal_cli::import::{run_import, ImportArgs};
use postal_cli::lookup::{run_lookup, LookupArgs};
use postal_cli::near::{run_near, NearArgs};
use postal_cli::validate::{run_validate, ValidateArgs};
use postal_cli::GlobalOptions;

/// Postal codes CLI
///
/// Imports per-country postal code datasets and answers lookup, radius and
/// validation queries.
#[derive(Parser, Debug)]
#[command(name = "postal", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Postgres connection string. Without it, nothing is persisted.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
    database_url: Option<String>,

    /// JSON file of extra country rules.
    #[arg(long, env = "POSTAL_COUNTRIES_FILE", global = true)]
    countries_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import one country's dataset (bundled or from a file).
    Import(ImportArgs),

    /// Print the record for a postal code.
    Lookup(LookupArgs),

    /// List postal codes within a radius of a point.
    Near(NearArgs),

    /// Check a postal code against a country's format.
    Validate(ValidateArgs),

    /// List supported countries.
    Countries(CountriesArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let global = GlobalOptions {
        database_url: cli.database_url.filter(|u| !u.trim().is_empty()),
        countries_file: cli.countries_file,
    };

    let result = match cli.command {
        Commands::Import(args) => run_import(&args, &global).await,
        Commands::Lookup(args) => run_lookup(&args, &global).await,
        Commands::Near(args) => run_near(&args, &global).await,
        Commands::Validate(args) => run_validate(&args, &global),
        Commands::Countries(args) => run_countries(&args, &global),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
