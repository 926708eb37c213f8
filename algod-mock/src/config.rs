/// Mock node configuration
///
/// Loaded from the environment (and a `.env` file if present).

use anyhow::{Context, Result};
use std::env;

/// Real TestNet genesis hash; the mock only compares it byte for byte
pub const DEFAULT_GENESIS_HASH: &str = "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=";

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub server_host: String,
    pub server_port: u16,
    pub genesis_id: String,
    pub genesis_hash: String,
    pub start_round: u64,
    pub min_fee: u64,
    /// Confirm pending transactions whenever a block is produced
    pub auto_confirm: bool,
    pub first_asset_id: u64,
}

impl MockConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present
        let defaults = Self::default();

        let server_host = env::var("SERVER_HOST").unwrap_or(defaults.server_host);

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| defaults.server_port.to_string())
            .parse()
            .context("Invalid SERVER_PORT")?;

        let genesis_id = env::var("GENESIS_ID").unwrap_or(defaults.genesis_id);

        let start_round = env::var("START_ROUND")
            .unwrap_or_else(|_| defaults.start_round.to_string())
            .parse()
            .context("Invalid START_ROUND")?;

        let min_fee = env::var("MIN_FEE")
            .unwrap_or_else(|_| defaults.min_fee.to_string())
            .parse()
            .context("Invalid MIN_FEE")?;

        let auto_confirm = match env::var("AUTO_CONFIRM") {
            Ok(raw) => !matches!(raw.trim().to_lowercase().as_str(), "0" | "false" | "no"),
            Err(_) => defaults.auto_confirm,
        };

        Ok(Self {
            server_host,
            server_port,
            genesis_id,
            start_round,
            min_fee,
            auto_confirm,
            ..defaults
        })
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 4001,
            genesis_id: "devnet-v1".to_string(),
            genesis_hash: DEFAULT_GENESIS_HASH.to_string(),
            start_round: 1000,
            min_fee: 1000,
            auto_confirm: true,
            first_asset_id: 1001,
        }
    }
}
