use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use grid_core::config::{
    data_dir_from_env_value, export_file_name_from_env_value, storage_key_from_env_value,
};
use grid_core::{CoreConfig, GridStore, LocalGridStore};

/// Main entry point for the grid maker
///
/// Resolves configuration once, opens the local grid store and serves the REST API until
/// interrupted.
///
/// # Environment Variables
/// - `GRID_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `GRID_DATA_DIR`: Directory for the local grid document (default: "grid_data")
/// - `GRID_STORAGE_KEY`: File stem of the local grid document (default: "gridMakerData")
/// - `GRID_EXPORT_NAME`: Export file name (default: "grid")
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, store loading or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("grid_run=info".parse()?)
                .add_directive("grid_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("GRID_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::new(
        data_dir_from_env_value(std::env::var("GRID_DATA_DIR").ok()),
        storage_key_from_env_value(std::env::var("GRID_STORAGE_KEY").ok())?,
        &export_file_name_from_env_value(std::env::var("GRID_EXPORT_NAME").ok()),
    )?);
    let store = Arc::new(LocalGridStore::open(&cfg)?);

    let mut changes = store.subscribe();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let census = changes.borrow_and_update().census.clone();
            tracing::info!(
                filled = census.filled,
                total = census.total,
                "grid committed"
            );
        }
    });

    tracing::info!("++ Starting grid REST on {}", rest_addr);

    let app = router(AppState {
        store,
        cfg: cfg.clone(),
    });
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    tracing::info!(path = %cfg.storage_path().display(), "-- grid REST stopped");
    Ok(())
}
