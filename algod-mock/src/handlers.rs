/// Axum HTTP handlers for the algod v2 subset

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use algoxzen::node::{NodeStatus, PendingTransactionInfo, SubmitResponse, TransactionParamsResponse};
use algoxzen::transaction::decode_signed_group;

use crate::ledger::{LedgerError, MockLedger};
use crate::types::{AdvanceRequest, AdvanceResponse, ErrorResponse};

/// Shared application state
pub type AppState = Arc<MockLedger>;

/// Custom error type for handlers
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// GET /v2/status
pub async fn get_status(State(ledger): State<AppState>) -> Json<NodeStatus> {
    Json(ledger.status())
}

/// GET /v2/status/wait-for-block-after/{round}
pub async fn wait_for_block_after(
    State(ledger): State<AppState>,
    Path(round): Path<u64>,
) -> Json<NodeStatus> {
    Json(ledger.wait_for_block_after(round))
}

/// GET /v2/transactions/params
pub async fn get_params(State(ledger): State<AppState>) -> Json<TransactionParamsResponse> {
    Json(ledger.params())
}

/// POST /v2/transactions
/// Body is the concatenated msgpack signed transactions of one group
pub async fn submit_transactions(
    State(ledger): State<AppState>,
    body: Bytes,
) -> Result<Json<SubmitResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty request body".to_string()));
    }
    let group = decode_signed_group(&body)
        .map_err(|e| ApiError::BadRequest(format!("failed to decode transactions: {}", e)))?;

    let txid = ledger.submit(group).map_err(|e| {
        log::warn!("Rejected submission: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(SubmitResponse {
        tx_id: txid.to_string(),
    }))
}

/// GET /v2/transactions/pending/{txid}
pub async fn get_pending(
    State(ledger): State<AppState>,
    Path(txid): Path<String>,
) -> Result<Json<PendingTransactionInfo>, ApiError> {
    ledger
        .pending_info(&txid)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("txn not found: {}", txid)))
}

// ============================================================================
// DEVNET HELPER ENDPOINTS (not part of the algod API)
// ============================================================================

/// POST /devnet/advance
pub async fn advance_rounds(
    State(ledger): State<AppState>,
    Json(req): Json<AdvanceRequest>,
) -> Json<AdvanceResponse> {
    log::info!("Advancing {} rounds", req.count);
    let round = ledger.advance(req.count);
    Json(AdvanceResponse { round })
}

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}
