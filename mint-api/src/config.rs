/// Mint endpoint configuration from environment variables
///
/// Controls the bind address, the node the endpoint fetches suggested
/// params from, CORS origins and the fallback asset URL base.

use std::env;

use algoxzen::config::DEFAULT_ALGOD_URL;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_ASSET_URL_BASE: &str = "https://algoxzen.com";

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub bind_address: String,
    /// algod REST base URL
    pub algod_url: String,
    pub algod_token: Option<String>,
    /// Allowed CORS origins; empty means any origin
    pub allowed_origins: Vec<String>,
    /// Asset URL used when the request carries no `ipfsUrl`
    pub asset_url_base: String,
}

impl ApiConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `BIND_ADDRESS`: listen address (default 0.0.0.0:3000)
    /// - `ALGOD_URL`, `ALGOD_TOKEN`: node endpoint (TestNet by default)
    /// - `ALLOWED_ORIGINS`: comma separated origins, unset for any
    /// - `ASSET_URL_BASE`: base for `<base>/<fileHash>` asset URLs
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_address = env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address);

        let algod_url = env::var("ALGOD_URL").unwrap_or(defaults.algod_url);
        log::info!("📡 Algod URL: {}", algod_url);

        let allowed_origins: Vec<String> = env::var("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let asset_url_base = env::var("ASSET_URL_BASE")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.asset_url_base);

        Self {
            bind_address,
            algod_url,
            algod_token: env::var("ALGOD_TOKEN").ok().filter(|s| !s.is_empty()),
            allowed_origins,
            asset_url_base,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            algod_url: DEFAULT_ALGOD_URL.to_string(),
            algod_token: None,
            allowed_origins: Vec::new(),
            asset_url_base: DEFAULT_ASSET_URL_BASE.to_string(),
        }
    }
}
