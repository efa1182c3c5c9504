//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Postal Codes API",
        version = "0.1.0",
        description = "Postal code lookup, radius search, per-country code validation and administrative region listings.\n\nCodes are unique across countries. Portugal (`PT`) is the default country for records created without one.",
        license(name = "MIT"),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Postal codes ────────────────────────────────────────────────
        crate::routes::postal_codes::list_postal_codes,
        crate::routes::postal_codes::create_postal_code,
        crate::routes::postal_codes::get_postal_code,
        crate::routes::postal_codes::put_postal_code,
        crate::routes::postal_codes::delete_postal_code,
        // ── Geo ─────────────────────────────────────────────────────────
        crate::routes::geo::near,
        // ── Countries ───────────────────────────────────────────────────
        crate::routes::countries::list_countries,
        crate::routes::countries::validate_code,
        // ── Regions ─────────────────────────────────────────────────────
        crate::routes::regions::districts,
        crate::routes::regions::counties,
        crate::routes::regions::localities,
    ),
    components(
        schemas(
            postal_core::PostalCodeRecord,
            postal_core::NewPostalCode,
            postal_core::CountryCode,
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::store::NearbyRecord,
            crate::store::RegionCount,
            crate::middleware::metrics::MetricsSnapshot,
            crate::routes::postal_codes::PostalCodeSummary,
            crate::routes::postal_codes::PostalCodeList,
            crate::routes::countries::CountrySummary,
            crate::routes::countries::ValidationResponse,
        ),
    ),
    tags(
        (name = "postal-codes", description = "Postal code records: listing, lookup, create, upsert, delete"),
        (name = "geo", description = "Radius search over records with coordinates"),
        (name = "countries", description = "Supported countries and code format validation"),
        (name = "regions", description = "Distinct districts, counties and localities"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Postal Codes API");
    }

    #[test]
    fn spec_has_every_route() {
        let spec = ApiDoc::openapi();
        for path in [
            "/v1/postal-codes",
            "/v1/postal-codes/{code}",
            "/v1/geo/near",
            "/v1/countries",
            "/v1/countries/{country}/validate",
            "/v1/districts",
            "/v1/counties",
            "/v1/localities",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn spec_has_record_schema() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components");
        assert!(components.schemas.contains_key("PostalCodeRecord"));
        assert!(components.schemas.contains_key("ErrorBody"));
    }
}
