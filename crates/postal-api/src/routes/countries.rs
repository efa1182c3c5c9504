//! # Countries API
//!
//! Routes:
//! - GET /v1/countries: Supported countries with record counts
//! - GET /v1/countries/:country/validate?code=: Check a code against a country's rule

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use postal_core::ValidationError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_query;
use crate::state::AppState;

/// A supported country.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CountrySummary {
    pub code: String,
    pub name: String,
    /// Human-readable code format.
    pub format: String,
    /// Records stored for this country.
    pub records: usize,
}

/// Query for the validation endpoint.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateParams {
    pub code: String,
}

/// Outcome of validating one code.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationResponse {
    pub country: String,
    /// The code as submitted.
    pub code: String,
    pub valid: bool,
    /// Normalized form, when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
    /// Why the code was rejected, when invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Build the countries router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/countries", get(list_countries))
        .route("/v1/countries/:country/validate", get(validate_code))
}

/// GET /v1/countries: List supported countries.
#[utoipa::path(
    get,
    path = "/v1/countries",
    responses(
        (status = 200, description = "Supported countries", body = Vec<CountrySummary>),
    ),
    tag = "countries"
)]
async fn list_countries(
    State(state): State<AppState>,
) -> Result<Json<Vec<CountrySummary>>, AppError> {
    let counts = state.postal_codes.count_by_country().await?;
    let countries = state
        .postal_codes
        .countries()
        .iter()
        .map(|rule| CountrySummary {
            code: rule.code.to_string(),
            name: rule.name.clone(),
            format: rule.rule.describe(),
            records: counts.get(&rule.code).copied().unwrap_or(0),
        })
        .collect();
    Ok(Json(countries))
}

/// GET /v1/countries/:country/validate: Validate a code.
#[utoipa::path(
    get,
    path = "/v1/countries/{country}/validate",
    params(
        ("country" = String, Path, description = "Country code, e.g. PT"),
        ("code" = String, Query, description = "Postal code to check"),
    ),
    responses(
        (status = 200, description = "Validation outcome", body = ValidationResponse),
        (status = 404, description = "Unsupported country", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed country code", body = crate::error::ErrorBody),
    ),
    tag = "countries"
)]
async fn validate_code(
    State(state): State<AppState>,
    Path(country): Path<String>,
    query: Result<Query<ValidateParams>, QueryRejection>,
) -> Result<Json<ValidationResponse>, AppError> {
    let params = extract_query(query)?;
    let rule = match state.postal_codes.countries().lookup(&country) {
        Ok(rule) => rule,
        Err(e @ ValidationError::UnknownCountry(_)) => {
            return Err(AppError::not_found(e.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let (normalized, reason) = match rule.validate(&params.code) {
        Ok(normalized) => (Some(normalized), None),
        Err(e) => (None, Some(e.to_string())),
    };
    Ok(Json(ValidationResponse {
        country: rule.code.to_string(),
        code: params.code,
        valid: normalized.is_some(),
        normalized,
        reason,
    }))
}
