//! Canopy Server — application entry point.

use canopy_db::{DbConfig, DbManager};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("canopy=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting canopy server...");

    let config = DbConfig::from_env();
    let manager = match DbManager::connect(&config).await {
        Ok(manager) => manager,
        Err(err) => {
            tracing::error!(error = %err, "Failed to connect to SurrealDB");
            std::process::exit(1);
        }
    };

    if let Err(err) = canopy_db::run_migrations(manager.client()).await {
        tracing::error!(error = %err, "Migrations failed");
        std::process::exit(1);
    }

    // TODO: mount the HTTP request layer once the transport crate lands.

    tracing::info!("Canopy server stopped.");
}
