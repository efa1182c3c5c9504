//! # Near Subcommand
//!
//! Radius search around a point, one line per match, nearest first.

use anyhow::Result;
use clap::Args;

use postal_core::Coordinates;

use crate::GlobalOptions;

/// Arguments for the `postal near` subcommand.
#[derive(Args, Debug)]
pub struct NearArgs {
    /// Latitude of the center, decimal degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude of the center, decimal degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Search radius in kilometres.
    #[arg(long)]
    pub radius_km: f64,
}

/// Execute the near subcommand.
pub async fn run_near(args: &NearArgs, global: &GlobalOptions) -> Result<u8> {
    let center = Coordinates::new(args.lat, args.lon)?;
    let store = global.open_query_store().await?;
    let hits = store.within_radius(center, args.radius_km).await?;

    for hit in &hits {
        println!(
            "{:>9.3} km  {:<10} {}",
            hit.distance_km,
            hit.record.code,
            hit.record.full_address()
        );
    }
    println!("{} postal code(s) within {} km", hits.len(), args.radius_km);
    Ok(0)
}
