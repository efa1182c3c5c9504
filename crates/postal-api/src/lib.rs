//! # postal-api: Postal Code Store and REST API
//!
//! The authoritative [`store::PostalCodeStore`], the bulk importer that
//! fills it, and the Axum application serving it.
//!
//! ## API Surface
//!
//! | Prefix                        | Module                      |
//! |-------------------------------|-----------------------------|
//! | `/v1/postal-codes/*`          | [`routes::postal_codes`]    |
//! | `/v1/geo/near`                | [`routes::geo`]             |
//! | `/v1/countries/*`             | [`routes::countries`]       |
//! | `/v1/districts`, `/v1/counties`, `/v1/localities` | [`routes::regions`] |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros, served at `/openapi.json`.

pub mod db;
pub mod error;
pub mod extractors;
pub mod import;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod store;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::{ApiMetrics, MetricsSnapshot};

pub use error::AppError;
pub use state::{AppConfig, AppState};
pub use store::PostalCodeStore;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();

    let api = Router::new()
        .merge(routes::postal_codes::router())
        .merge(routes::geo::router())
        .merge(routes::countries::router())
        .merge(routes::regions::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(metrics.clone()))
        .with_state(state.clone());

    let ops = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .route("/metrics", axum::routing::get(metrics_json))
        .layer(Extension(metrics))
        .with_state(state);

    Router::new().merge(ops).merge(api)
}

/// GET /metrics: Request counters and record count.
async fn metrics_json(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> Result<Json<MetricsSnapshot>, AppError> {
    let records = state.postal_codes.count().await?;
    Ok(Json(metrics.snapshot(records)))
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 "ready", or 503 when the configured database is
/// unreachable.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = state.postal_codes.ping().await {
        tracing::warn!("Database health check failed: {e}");
        return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
    }
    (StatusCode::OK, "ready").into_response()
}
