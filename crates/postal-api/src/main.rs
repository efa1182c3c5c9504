//! # postal-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the postal codes API.
//! Binds to configurable port (default 8080).

use std::sync::Arc;

use postal_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::debug!(?config, "configuration loaded");

    let countries = config.country_registry().map_err(|e| {
        tracing::error!("Country rules could not be loaded: {e}");
        e
    })?;
    tracing::info!(countries = countries.len(), "country registry ready");

    // Initialize database pool (optional; absent means in-memory only).
    let db_pool = postal_api::db::init_pool(config.database_url.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("Database initialization failed: {e}");
            e
        })?;

    let port = config.port;
    let state = AppState::with_config(config, Arc::new(countries), db_pool);
    let records = state.postal_codes.count().await.map_err(|e| {
        tracing::error!("Postal code table could not be read: {e}");
        e
    })?;
    tracing::info!(records, persistent = state.postal_codes.is_persistent(), "store ready");

    let app = postal_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Postal codes API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
