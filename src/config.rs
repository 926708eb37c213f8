/// AlgoXzen configuration from environment variables
///
/// Controls node, indexer and explorer endpoints plus the platform fee.
/// Defaults to Algorand TestNet via the public AlgoNode endpoints.

use std::env;

use crate::address::Address;

pub const DEFAULT_ALGOD_URL: &str = "https://testnet-api.algonode.cloud";
pub const DEFAULT_INDEXER_URL: &str = "https://testnet-idx.algonode.cloud";
pub const DEFAULT_EXPLORER_URL: &str = "https://testnet.explorer.perawallet.app";
pub const DEFAULT_PLATFORM_ADDRESS: &str =
    "ALGOXZENPLATFORMFEETREASURYAAAAAAAAAAAAAAAAAAAAAAAAIS3B4AE";
/// 0.1 ALGO in microalgos
pub const DEFAULT_PLATFORM_FEE: u64 = 100_000;
pub const DEFAULT_CONFIRMATION_ROUNDS: u64 = 10;

#[derive(Clone, Debug)]
pub struct AlgoXzenConfig {
    /// algod REST base URL
    pub algod_url: String,
    /// Optional `X-Algo-API-Token` value
    pub algod_token: Option<String>,
    /// Indexer REST base URL
    pub indexer_url: String,
    /// Block explorer base URL used for deep links
    pub explorer_url: String,
    /// Base URL of the serverless functions (`{url}/functions/v1/...`)
    pub functions_url: Option<String>,
    /// Bearer key sent to the serverless functions
    pub functions_key: Option<String>,
    /// Receiver of the platform fee payment
    pub platform_address: Address,
    /// Platform fee in microalgos
    pub platform_fee: u64,
    /// Round ceiling for confirmation waits
    pub confirmation_rounds: u64,
}

impl AlgoXzenConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `ALGOD_URL`, `ALGOD_TOKEN`: node endpoint (TestNet by default)
    /// - `INDEXER_URL`: indexer endpoint
    /// - `EXPLORER_URL`: explorer used for transaction/asset links
    /// - `FUNCTIONS_URL`, `FUNCTIONS_KEY`: serverless functions host and key
    /// - `PLATFORM_ADDRESS`, `PLATFORM_FEE`: fee receiver and amount (microalgos)
    /// - `CONFIRMATION_ROUNDS`: how many rounds to wait for confirmation
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let algod_url = env::var("ALGOD_URL").unwrap_or(defaults.algod_url);
        log::info!("Algod URL: {}", algod_url);

        let indexer_url = env::var("INDEXER_URL").unwrap_or(defaults.indexer_url);
        let explorer_url = env::var("EXPLORER_URL").unwrap_or(defaults.explorer_url);

        let functions_url = env::var("FUNCTIONS_URL").ok().filter(|s| !s.is_empty());
        if let Some(ref url) = functions_url {
            log::info!("Functions URL: {}", url);
        }

        let platform_address = match env::var("PLATFORM_ADDRESS") {
            Ok(raw) => match raw.parse::<Address>() {
                Ok(addr) => addr,
                Err(e) => {
                    log::warn!("{}, using default platform address", e);
                    defaults.platform_address
                }
            },
            Err(_) => defaults.platform_address,
        };

        let platform_fee = parse_u64("PLATFORM_FEE", defaults.platform_fee);
        let confirmation_rounds = parse_u64("CONFIRMATION_ROUNDS", defaults.confirmation_rounds);

        Self {
            algod_url,
            algod_token: env::var("ALGOD_TOKEN").ok().filter(|s| !s.is_empty()),
            indexer_url,
            explorer_url,
            functions_url,
            functions_key: env::var("FUNCTIONS_KEY").ok().filter(|s| !s.is_empty()),
            platform_address,
            platform_fee,
            confirmation_rounds,
        }
    }
}

fn parse_u64(var: &str, default: u64) -> u64 {
    match env::var(var) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Invalid {} '{}', defaulting to {}", var, raw, default);
            default
        }),
        Err(_) => default,
    }
}

impl Default for AlgoXzenConfig {
    /// Default configuration (TestNet)
    fn default() -> Self {
        Self {
            algod_url: DEFAULT_ALGOD_URL.to_string(),
            algod_token: None,
            indexer_url: DEFAULT_INDEXER_URL.to_string(),
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
            functions_url: None,
            functions_key: None,
            platform_address: Address::from_str_unchecked(DEFAULT_PLATFORM_ADDRESS),
            platform_fee: DEFAULT_PLATFORM_FEE,
            confirmation_rounds: DEFAULT_CONFIRMATION_ROUNDS,
        }
    }
}
