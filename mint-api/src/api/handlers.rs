use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;

use algoxzen::functions::{MintNftRequest, MintNftResponse};

use crate::error::ApiError;
use crate::minter::Minter;

/// POST /functions/v1/mint-nft
pub async fn mint_nft_handler(
    State(minter): State<Arc<Minter>>,
    body: Result<Json<MintNftRequest>, JsonRejection>,
) -> Result<Json<MintNftResponse>, ApiError> {
    let Json(req) = body?;
    let response = minter.prepare(&req).await?;
    Ok(Json(response))
}

/// GET /health
pub async fn health_handler() -> &'static str {
    "OK"
}
