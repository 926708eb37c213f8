use mint_api::api::server;
use mint_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger (set RUST_LOG=debug for verbose output, RUST_LOG=info for normal)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    dotenv::dotenv().ok();

    // BIND_ADDRESS=127.0.0.1:3000 for local development
    let config = ApiConfig::from_env();

    log::info!("Starting AlgoXzen mint endpoint on {}", config.bind_address);
    server::start_server(config).await?;
    Ok(())
}
