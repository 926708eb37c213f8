/// algod Mock Server
///
/// A lightweight in-memory Algorand node for local development and tests.

use algod_mock::{run_server, MockConfig};
use anyhow::{Context, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting algod mock server...");

    // Load configuration
    let config = MockConfig::from_env().context("Failed to load configuration")?;

    log::info!(
        "Server will listen on {}:{}",
        config.server_host,
        config.server_port
    );
    log::info!(
        "Min fee {} microalgos, auto-confirm {}",
        config.min_fee,
        config.auto_confirm
    );

    run_server(config).await.context("Server error")?;

    Ok(())
}
