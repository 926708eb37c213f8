use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use algoxzen::AlgoXzenError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Node error: {0}")]
    Node(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AlgoXzenError> for ApiError {
    fn from(err: AlgoXzenError) -> Self {
        match err {
            AlgoXzenError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            AlgoXzenError::Network(_) | AlgoXzenError::InvalidResponse(_) => {
                ApiError::Node(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Node(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("Mint NFT error: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
