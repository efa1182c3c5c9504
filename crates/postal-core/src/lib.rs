#![deny(missing_docs)]

//! # postal-core: Foundational Types for the Postal Codes Service
//!
//! This crate defines the types every other crate in the workspace depends on.
//! It has no internal crate dependencies and performs no I/O beyond reading
//! from a caller-supplied [`std::io::Read`].
//!
//! ## Design Principles
//!
//! 1. **Validated construction.** A [`PostalCodeRecord`] can only be built
//!    from a [`NewPostalCode`] draft through [`NewPostalCode::validate`], which
//!    checks required fields, the country's code rule, and coordinate ranges.
//!
//! 2. **Pluggable country table.** Code formats and dataset row layouts live
//!    in the [`CountryRegistry`], keyed by [`CountryCode`]. Portugal is the
//!    default country, not a hard-coded shape.
//!
//! 3. **Row-level failures are values.** The [`RowReader`] yields one
//!    [`ParsedRow`] per input line; a malformed row is a [`RowError`], never
//!    an aborted read.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod country;
pub mod error;
pub mod geo;
pub mod parse;
pub mod record;
pub mod summary;

// Re-export primary types at crate root for ergonomic imports.
pub use config::{CountryRuleConfig, RowLayoutConfig};
pub use country::{CodeRule, ColumnMap, CountryCode, CountryRegistry, CountryRule, RowLayout};
pub use error::{PostalError, RowError, ValidationError};
pub use geo::{validate_radius, Coordinates, EARTH_RADIUS_KM};
pub use parse::{ParsedRow, RowReader};
pub use record::{NewPostalCode, PostalCodeRecord};
pub use summary::{ImportSummary, RowFailure, UpsertOutcome};
