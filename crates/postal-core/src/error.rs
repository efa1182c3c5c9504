//! # Error Hierarchy
//!
//! Structured error types for the postal codes service, built with `thiserror`.
//!
//! - [`ValidationError`]: a candidate value violates a domain rule. Surfaced
//!   to API clients as a rejected-input response.
//! - [`RowError`]: one dataset row could not be turned into a record. The
//!   importer logs it, counts it, and moves on.
//! - [`PostalError`]: top-level error for operations that can also fail on
//!   I/O or deserialization (loading country rule files).

use thiserror::Error;

/// Top-level error type for the postal codes service.
#[derive(Error, Debug)]
pub enum PostalError {
    /// Domain rule violation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A dataset row could not be parsed.
    #[error("row error: {0}")]
    Row(#[from] RowError),

    /// A country rule definition is malformed.
    #[error("invalid country rule for {country}: {reason}")]
    InvalidRule {
        /// The country code the rule was declared for.
        country: String,
        /// What is wrong with the rule.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors for postal code records and query parameters.
///
/// Each variant carries the offending input so operators and API clients
/// can see exactly what was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Country code is not two ASCII letters.
    #[error("invalid country code: \"{0}\" (expected ISO 3166-1 alpha-2, e.g. PT)")]
    InvalidCountryCode(String),

    /// Country code is well-formed but has no registered rule.
    #[error("unsupported country: \"{0}\"")]
    UnknownCountry(String),

    /// Postal code does not satisfy the country's format rule.
    #[error("invalid postal code \"{code}\" for {country} (expected {expected})")]
    InvalidCode {
        /// Country whose rule was applied.
        country: String,
        /// The rejected code.
        code: String,
        /// Human-readable description of the rule.
        expected: String,
    },

    /// A required text field is empty or whitespace.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// Latitude outside `[-90, 90]` or not finite.
    #[error("latitude {0} is out of range [-90, 90]")]
    LatitudeOutOfRange(f64),

    /// Longitude outside `[-180, 180]` or not finite.
    #[error("longitude {0} is out of range [-180, 180]")]
    LongitudeOutOfRange(f64),

    /// Only one of latitude/longitude was supplied.
    #[error("latitude and longitude must be given together")]
    IncompleteCoordinates,

    /// Search radius is negative or not finite.
    #[error("radius {0} km is invalid (expected a finite value >= 0)")]
    InvalidRadius(f64),
}

/// Errors for a single dataset row.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    /// A required column is absent or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A coordinate column is present but not a number.
    #[error("unparseable {field}: \"{value}\"")]
    InvalidNumber {
        /// Column name.
        field: &'static str,
        /// Raw column value.
        value: String,
    },

    /// The row parsed but the resulting record is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The reader could not decode the row (bad quoting, invalid UTF-8).
    #[error("malformed row: {0}")]
    Malformed(String),

    /// The row was valid but the store rejected the write.
    #[error("persistence failed: {0}")]
    Persistence(String),
}
