//! # Administrative Regions API
//!
//! Distinct districts, counties and localities with the number of postal
//! codes in each.
//!
//! Routes:
//! - GET /v1/districts?country
//! - GET /v1/counties?country&district
//! - GET /v1/localities?country&district&county

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_query;
use crate::routes::postal_codes::list_filter;
use crate::state::AppState;
use crate::store::{RegionCount, RegionLevel};

/// Filters narrowing a region listing to a parent region.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct RegionParams {
    pub country: Option<String>,
    pub district: Option<String>,
    pub county: Option<String>,
}

/// Build the regions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/districts", get(districts))
        .route("/v1/counties", get(counties))
        .route("/v1/localities", get(localities))
}

async fn distinct(
    state: &AppState,
    level: RegionLevel,
    query: Result<Query<RegionParams>, QueryRejection>,
) -> Result<Json<Vec<RegionCount>>, AppError> {
    let params = extract_query(query)?;
    let filter = list_filter(
        params.country.as_deref(),
        params.district.as_deref(),
        params.county.as_deref(),
        None,
    )?;
    Ok(Json(state.postal_codes.distinct(level, &filter).await?))
}

/// GET /v1/districts: Distinct districts.
#[utoipa::path(
    get,
    path = "/v1/districts",
    params(("country" = Option<String>, Query, description = "Exact country code")),
    responses((status = 200, description = "Districts with code counts", body = Vec<RegionCount>)),
    tag = "regions"
)]
async fn districts(
    State(state): State<AppState>,
    query: Result<Query<RegionParams>, QueryRejection>,
) -> Result<Json<Vec<RegionCount>>, AppError> {
    distinct(&state, RegionLevel::District, query).await
}

/// GET /v1/counties: Distinct counties.
#[utoipa::path(
    get,
    path = "/v1/counties",
    params(
        ("country" = Option<String>, Query, description = "Exact country code"),
        ("district" = Option<String>, Query, description = "District contains (case-insensitive)"),
    ),
    responses((status = 200, description = "Counties with code counts", body = Vec<RegionCount>)),
    tag = "regions"
)]
async fn counties(
    State(state): State<AppState>,
    query: Result<Query<RegionParams>, QueryRejection>,
) -> Result<Json<Vec<RegionCount>>, AppError> {
    distinct(&state, RegionLevel::County, query).await
}

/// GET /v1/localities: Distinct localities.
#[utoipa::path(
    get,
    path = "/v1/localities",
    params(
        ("country" = Option<String>, Query, description = "Exact country code"),
        ("district" = Option<String>, Query, description = "District contains (case-insensitive)"),
        ("county" = Option<String>, Query, description = "County contains (case-insensitive)"),
    ),
    responses((status = 200, description = "Localities with code counts", body = Vec<RegionCount>)),
    tag = "regions"
)]
async fn localities(
    State(state): State<AppState>,
    query: Result<Query<RegionParams>, QueryRejection>,
) -> Result<Json<Vec<RegionCount>>, AppError> {
    distinct(&state, RegionLevel::Locality, query).await
}
