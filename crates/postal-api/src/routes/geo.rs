//! # Geographic Search API
//!
//! Routes:
//! - GET /v1/geo/near?lat&lon&radius_km: Codes within a radius, nearest first

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use postal_core::Coordinates;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_query;
use crate::state::AppState;
use crate::store::NearbyRecord;

/// Radius search parameters.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NearParams {
    /// Latitude of the center, decimal degrees.
    pub lat: f64,
    /// Longitude of the center, decimal degrees.
    pub lon: f64,
    /// Search radius in kilometres (>= 0).
    pub radius_km: f64,
}

/// Build the geo router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/geo/near", get(near))
}

/// GET /v1/geo/near: Radius search.
#[utoipa::path(
    get,
    path = "/v1/geo/near",
    params(
        ("lat" = f64, Query, description = "Center latitude"),
        ("lon" = f64, Query, description = "Center longitude"),
        ("radius_km" = f64, Query, description = "Radius in km"),
    ),
    responses(
        (status = 200, description = "Matches ordered by distance", body = Vec<NearbyRecord>),
        (status = 400, description = "Missing or non-numeric parameter", body = crate::error::ErrorBody),
        (status = 422, description = "Coordinates or radius out of range", body = crate::error::ErrorBody),
    ),
    tag = "geo"
)]
async fn near(
    State(state): State<AppState>,
    query: Result<Query<NearParams>, QueryRejection>,
) -> Result<Json<Vec<NearbyRecord>>, AppError> {
    let params = extract_query(query)?;
    let center = Coordinates::new(params.lat, params.lon)?;
    let hits = state.postal_codes.within_radius(center, params.radius_km).await?;
    tracing::debug!(
        lat = params.lat,
        lon = params.lon,
        radius_km = params.radius_km,
        hits = hits.len(),
        "radius search"
    );
    Ok(Json(hits))
}
