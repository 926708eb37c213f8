/// Axum HTTP server setup and routing

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::MockConfig;
use crate::handlers::*;
use crate::ledger::MockLedger;

pub fn create_router(ledger: AppState) -> Router {
    // Configure CORS to allow requests from browser clients/tests
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Node status
        .route("/v2/status", get(get_status))
        .route(
            "/v2/status/wait-for-block-after/:round",
            get(wait_for_block_after),
        )
        // Transaction endpoints
        .route("/v2/transactions/params", get(get_params))
        .route("/v2/transactions", post(submit_transactions))
        .route("/v2/transactions/pending/:txid", get(get_pending))
        // Devnet helper endpoints
        .route("/devnet/advance", post(advance_rounds))
        // Shared state
        .with_state(ledger)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve on an already bound listener until the task is dropped
pub async fn serve(listener: TcpListener, ledger: AppState) -> anyhow::Result<()> {
    axum::serve(listener, create_router(ledger)).await?;
    Ok(())
}

pub async fn run_server(config: MockConfig) -> anyhow::Result<()> {
    let ledger = Arc::new(MockLedger::new(&config));

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;

    log::info!("🚀 algod mock listening on http://{}", addr);
    log::info!(
        "📡 Genesis {} starting at round {}",
        config.genesis_id,
        config.start_round
    );
    log::info!("🔨 Devnet advance endpoint: POST /devnet/advance");

    serve(listener, ledger).await
}

/// A mock node running in the background on an ephemeral local port
pub struct MockNode {
    addr: SocketAddr,
    ledger: AppState,
    task: tokio::task::JoinHandle<()>,
}

impl MockNode {
    /// Bind `127.0.0.1:0` and serve `config` in a spawned task
    pub async fn spawn(config: MockConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let ledger = Arc::new(MockLedger::new(&config));

        let server_ledger = ledger.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = serve(listener, server_ledger).await {
                log::error!("algod mock stopped: {}", e);
            }
        });
        log::debug!("algod mock spawned on {}", addr);

        Ok(Self { addr, ledger, task })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ledger(&self) -> &MockLedger {
        &self.ledger
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        self.task.abort();
    }
}
