use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use algoxzen::AlgodClient;

use super::handlers;
use crate::config::ApiConfig;
use crate::minter::Minter;

/// CORS restricted to `origins`, or open when none are configured
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origin_list: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origin_list.is_empty() {
        log::warn!("CORS: Allowing all origins (development mode). Set ALLOWED_ORIGINS env var for production.");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        log::info!("CORS configured for origins: {}", origins.join(","));
        CorsLayer::new()
            .allow_origin(origin_list)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn create_router(minter: Arc<Minter>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/functions/v1/mint-nft", post(handlers::mint_nft_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(minter)
}

pub async fn start_server(config: ApiConfig) -> anyhow::Result<()> {
    let node = Arc::new(AlgodClient::new(&config.algod_url, config.algod_token.clone()));
    let minter = Arc::new(Minter::new(node, &config.asset_url_base));
    let app = create_router(minter, cors_layer(&config.allowed_origins));

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    log::info!("Server listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            log::info!("Received SIGTERM signal");
        },
    }

    log::info!("Shutdown signal received, exiting gracefully...");
}
