//! # postal-cli: CLI Tool for the Postal Codes Service
//!
//! Provides the `postal` command-line interface.
//!
//! ## Subcommands
//!
//! - `postal import`: Bulk import of one country's dataset.
//! - `postal lookup`: Print the record for a code.
//! - `postal near`: Radius search around a point.
//! - `postal validate`: Check a code against a country's format rule.
//! - `postal countries`: List supported countries.
//!
//! ```bash
//! postal import --country PT
//! postal import --country ES --file es.txt --delimiter '|' --has-headers
//! postal near --lat 40.21 --lon -8.41 --radius-km 5
//! ```
//!
//! With `--database-url` (or `DATABASE_URL`) every command works against
//! Postgres. Without it, imports run in memory and the query commands read
//! the bundled datasets.

pub mod countries;
pub mod import;
pub mod lookup;
pub mod near;
pub mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use postal_api::import::{run_import, ImportOptions};
use postal_api::PostalCodeStore;
use postal_core::{CountryCode, CountryRegistry};

/// Bundled Portuguese dataset.
pub const PT_DATASET: &str = include_str!("../data/pt.csv");

/// The bundled dataset for `country`, if one ships with the binary.
pub fn bundled_dataset(country: &CountryCode) -> Option<&'static str> {
    match country.as_str() {
        "PT" => Some(PT_DATASET),
        _ => None,
    }
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Postgres connection string.
    pub database_url: Option<String>,
    /// Extra country rules.
    pub countries_file: Option<PathBuf>,
}

impl GlobalOptions {
    /// Built-in country rules plus any from `countries_file`.
    pub fn country_registry(&self) -> Result<CountryRegistry> {
        let mut registry = CountryRegistry::builtin();
        if let Some(path) = &self.countries_file {
            registry
                .extend_from_file(path)
                .with_context(|| format!("failed to load country rules from {}", path.display()))?;
        }
        Ok(registry)
    }

    /// Open the store over Postgres when a database is configured, in
    /// memory otherwise.
    pub async fn open_store(&self) -> Result<PostalCodeStore> {
        let registry = self.country_registry()?;
        let pool = postal_api::db::init_pool(self.database_url.as_deref())
            .await
            .context("failed to connect to the database")?;
        Ok(PostalCodeStore::new(Arc::new(registry), pool))
    }

    /// Open the store for read-only commands. Without a database, the store is
    /// filled from the bundled datasets.
    pub async fn open_query_store(&self) -> Result<PostalCodeStore> {
        let store = self.open_store().await?;
        if !store.is_persistent() {
            let portugal = CountryCode::portugal();
            if let Some(data) = bundled_dataset(&portugal) {
                let summary = run_import(&store, data.as_bytes(), &ImportOptions::new(portugal))
                    .await
                    .context("failed to load bundled dataset")?;
                tracing::debug!(%summary, "loaded bundled dataset");
            }
        }
        Ok(store)
    }
}
