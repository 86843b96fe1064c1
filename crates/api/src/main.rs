//! Fraud Detection API - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialise logging")?;

    info!("=== Fraud Detection API v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Model manifest: {}", config.model.manifest_path.display());

    run_server(config)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("API server failed")
}
