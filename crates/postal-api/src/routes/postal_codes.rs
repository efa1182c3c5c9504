//! # Postal Codes API
//!
//! Routes:
//! - GET    /v1/postal-codes: Filtered, paginated listing
//! - POST   /v1/postal-codes: Create a record (409 if the code exists)
//! - GET    /v1/postal-codes/:code: Full record
//! - PUT    /v1/postal-codes/:code: Upsert (201 inserted, 200 updated)
//! - DELETE /v1/postal-codes/:code: Remove

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use postal_core::{CountryCode, NewPostalCode, PostalCodeRecord, UpsertOutcome};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::state::AppState;
use crate::store::{lookup_key, ListFilter};

/// Query parameters for the listing.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct ListParams {
    /// Exact country code.
    pub country: Option<String>,
    /// Case-insensitive substring of the district.
    pub district: Option<String>,
    /// Case-insensitive substring of the county.
    pub county: Option<String>,
    /// Case-insensitive substring of the locality.
    pub locality: Option<String>,
    /// Maximum number of items to return (default: 100, max: 1000).
    pub limit: Option<usize>,
    /// Number of items to skip (default: 0).
    pub offset: Option<usize>,
}

impl ListParams {
    const DEFAULT_LIMIT: usize = 100;
    const MAX_LIMIT: usize = 1000;

    fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT)
    }

    fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

/// Build a store filter from query strings. Blank values are ignored.
pub(crate) fn list_filter(
    country: Option<&str>,
    district: Option<&str>,
    county: Option<&str>,
    locality: Option<&str>,
) -> Result<ListFilter, AppError> {
    fn text(v: Option<&str>) -> Option<String> {
        v.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
    }
    let country = text(country).map(CountryCode::new).transpose()?;
    Ok(ListFilter {
        country,
        district: text(district),
        county: text(county),
        locality: text(locality),
    })
}

/// One entry in the listing.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostalCodeSummary {
    pub code: String,
    pub country: String,
    pub full_address: String,
}

impl From<&PostalCodeRecord> for PostalCodeSummary {
    fn from(record: &PostalCodeRecord) -> Self {
        Self {
            code: record.code.clone(),
            country: record.country.to_string(),
            full_address: record.full_address(),
        }
    }
}

/// A page of the listing.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostalCodeList {
    /// Matches across all pages.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub results: Vec<PostalCodeSummary>,
}

/// Build the postal codes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/postal-codes",
            get(list_postal_codes).post(create_postal_code),
        )
        .route(
            "/v1/postal-codes/:code",
            get(get_postal_code)
                .put(put_postal_code)
                .delete(delete_postal_code),
        )
}

/// GET /v1/postal-codes: List postal codes.
#[utoipa::path(
    get,
    path = "/v1/postal-codes",
    params(
        ("country" = Option<String>, Query, description = "Exact country code"),
        ("district" = Option<String>, Query, description = "District contains (case-insensitive)"),
        ("county" = Option<String>, Query, description = "County contains (case-insensitive)"),
        ("locality" = Option<String>, Query, description = "Locality contains (case-insensitive)"),
        ("limit" = Option<usize>, Query, description = "Max items to return (default 100, max 1000)"),
        ("offset" = Option<usize>, Query, description = "Items to skip (default 0)"),
    ),
    responses(
        (status = 200, description = "Page of postal codes", body = PostalCodeList),
        (status = 400, description = "Malformed query", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid country code", body = crate::error::ErrorBody),
    ),
    tag = "postal-codes"
)]
async fn list_postal_codes(
    State(state): State<AppState>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<PostalCodeList>, AppError> {
    let params = extract_query(query)?;
    let filter = list_filter(
        params.country.as_deref(),
        params.district.as_deref(),
        params.county.as_deref(),
        params.locality.as_deref(),
    )?;
    let limit = params.effective_limit();
    let offset = params.effective_offset();
    let (total, page) = state.postal_codes.list(&filter, limit, offset).await?;
    Ok(Json(PostalCodeList {
        total,
        limit,
        offset,
        results: page.iter().map(PostalCodeSummary::from).collect(),
    }))
}

/// POST /v1/postal-codes: Create a postal code.
#[utoipa::path(
    post,
    path = "/v1/postal-codes",
    request_body = NewPostalCode,
    responses(
        (status = 201, description = "Postal code created", body = PostalCodeRecord),
        (status = 400, description = "Malformed body", body = crate::error::ErrorBody),
        (status = 409, description = "Code already exists", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid postal code", body = crate::error::ErrorBody),
    ),
    tag = "postal-codes"
)]
async fn create_postal_code(
    State(state): State<AppState>,
    body: Result<Json<NewPostalCode>, JsonRejection>,
) -> Result<(StatusCode, Json<PostalCodeRecord>), AppError> {
    let draft = extract_json(body)?;
    let record = draft.validate(state.postal_codes.countries())?;
    let record = state.postal_codes.insert(record).await?;
    tracing::info!(code = %record.code, country = %record.country, "postal code created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/postal-codes/:code: Retrieve a postal code.
#[utoipa::path(
    get,
    path = "/v1/postal-codes/{code}",
    params(("code" = String, Path, description = "Postal code")),
    responses(
        (status = 200, description = "Postal code found", body = PostalCodeRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "postal-codes"
)]
async fn get_postal_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<PostalCodeRecord>, AppError> {
    state
        .postal_codes
        .get(&code)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("postal code {code} not found")))
}

/// PUT /v1/postal-codes/:code: Create or replace a postal code.
///
/// The body's `code` may be omitted; when given it must match the path.
#[utoipa::path(
    put,
    path = "/v1/postal-codes/{code}",
    params(("code" = String, Path, description = "Postal code")),
    request_body = NewPostalCode,
    responses(
        (status = 200, description = "Postal code updated", body = PostalCodeRecord),
        (status = 201, description = "Postal code created", body = PostalCodeRecord),
        (status = 400, description = "Malformed body", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid postal code", body = crate::error::ErrorBody),
    ),
    tag = "postal-codes"
)]
async fn put_postal_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
    body: Result<Json<NewPostalCode>, JsonRejection>,
) -> Result<(StatusCode, Json<PostalCodeRecord>), AppError> {
    let mut draft = extract_json(body)?;
    if draft.code.trim().is_empty() {
        draft.code = code.clone();
    }
    let record = draft.validate(state.postal_codes.countries())?;
    if lookup_key(&record.code) != lookup_key(&code) {
        return Err(AppError::Validation(format!(
            "body code {} does not match path code {code}",
            record.code
        )));
    }

    let (outcome, record) = state.postal_codes.upsert(record).await?;
    tracing::info!(code = %record.code, ?outcome, "postal code written");
    let status = match outcome {
        UpsertOutcome::Inserted => StatusCode::CREATED,
        UpsertOutcome::Updated => StatusCode::OK,
    };
    Ok((status, Json(record)))
}

/// DELETE /v1/postal-codes/:code: Remove a postal code.
#[utoipa::path(
    delete,
    path = "/v1/postal-codes/{code}",
    params(("code" = String, Path, description = "Postal code")),
    responses(
        (status = 204, description = "Postal code deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "postal-codes"
)]
async fn delete_postal_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.postal_codes.remove(&code).await? {
        tracing::info!(code = %code.trim(), "postal code deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("postal code {code} not found")))
    }
}
