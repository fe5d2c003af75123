//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development when you want the REST server (with OpenAPI/Swagger UI) without the
//! rest of the workspace. The workspace's main `grid-run` binary serves the same router.

use api_rest::{router, AppState};
use grid_core::config::{
    data_dir_from_env_value, export_file_name_from_env_value, storage_key_from_env_value,
};
use grid_core::{CoreConfig, LocalGridStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the grid REST API server
///
/// # Environment Variables
/// - `GRID_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `GRID_DATA_DIR`: Directory for the local grid document (default: "grid_data")
/// - `GRID_STORAGE_KEY`: File stem of the local grid document (default: "gridMakerData")
/// - `GRID_EXPORT_NAME`: Export file name (default: "grid")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the stored grid cannot be loaded,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("grid_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("GRID_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::new(
        data_dir_from_env_value(std::env::var("GRID_DATA_DIR").ok()),
        storage_key_from_env_value(std::env::var("GRID_STORAGE_KEY").ok())?,
        &export_file_name_from_env_value(std::env::var("GRID_EXPORT_NAME").ok()),
    )?);
    let store = Arc::new(LocalGridStore::open(&cfg)?);

    tracing::info!("-- Starting grid REST API on {}", addr);

    let app = router(AppState { store, cfg });
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
