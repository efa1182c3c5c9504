//! # Request Metrics
//!
//! In-process request and error counters, exposed as JSON at `/metrics`
//! together with the current record count.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;
use utoipa::ToSchema;

/// Shared metrics state.
#[derive(Debug, Clone)]
pub struct ApiMetrics {
    request_count: Arc<AtomicU64>,
    error_count: Arc<AtomicU64>,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MetricsSnapshot {
    /// Requests served since start-up.
    pub requests: u64,
    /// Requests answered with a 4xx or 5xx status.
    pub errors: u64,
    /// Postal code records currently stored.
    pub records: usize,
}

impl ApiMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self {
            request_count: Arc::new(AtomicU64::new(0)),
            error_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Return current request count.
    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Return current error count.
    pub fn errors(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Counters plus `records`.
    pub fn snapshot(&self, records: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests(),
            errors: self.errors(),
            records,
        }
    }

    fn observe(&self, status: axum::http::StatusCode) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        if status.is_client_error() || status.is_server_error() {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware that increments request and error counters.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.observe(response.status());
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn observe_counts_errors_separately() {
        let metrics = ApiMetrics::new();
        metrics.observe(StatusCode::OK);
        metrics.observe(StatusCode::NOT_FOUND);
        metrics.observe(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(metrics.requests(), 3);
        assert_eq!(metrics.errors(), 2);
    }

    #[test]
    fn clones_share_counters() {
        let metrics = ApiMetrics::new();
        metrics.clone().observe(StatusCode::CREATED);
        let snapshot = metrics.snapshot(5);
        assert_eq!(snapshot.requests, 1);
        assert_eq!(snapshot.errors, 0);
        assert_eq!(snapshot.records, 5);
    }
}
