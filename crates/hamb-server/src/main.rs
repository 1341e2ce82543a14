//! Home Assistant Matter bridge
//!
//! Usage: `hamb [config.yaml]`. Without an argument the path comes from
//! `HAMB_CONFIG`, then falls back to `config.yaml`.

use std::sync::Arc;

use anyhow::Result;
use hamb_config::{AppConfig, DEFAULT_CONFIG_FILE};
use hamb_logging::{init_logging, LogCapture};
use hamb_server::App;
use tracing::info;

const ENV_CONFIG: &str = "HAMB_CONFIG";

fn config_path() -> String {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var(ENV_CONFIG).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path();
    let mut config = AppConfig::load(&path)?;
    config.apply_env()?;

    let logs = Arc::new(LogCapture::default());
    init_logging(&config.logging, logs.clone())?;

    info!("Starting Home Assistant Matter bridge with {}", path);

    let mut app = App::build(config, logs).await?;
    app.start().await?;

    info!("Matter bridge is running");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    app.shutdown().await;
    Ok(())
}
