//! Node client
//!
//! `NodeClient` is the seam between the flows and the network; `AlgodClient`
//! implements it over the algod v2 REST API with reqwest.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::transaction::{SuggestedParams, TransactionId, VALIDITY_WINDOW};
use crate::{AlgoXzenError, Result};

const TOKEN_HEADER: &str = "X-Algo-API-Token";

/// `GET /v2/transactions/params`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TransactionParamsResponse {
    #[serde(default)]
    pub consensus_version: Option<String>,
    pub fee: u64,
    pub genesis_hash: String,
    pub genesis_id: String,
    pub last_round: u64,
    pub min_fee: u64,
}

impl From<TransactionParamsResponse> for SuggestedParams {
    fn from(resp: TransactionParamsResponse) -> Self {
        SuggestedParams {
            fee: resp.fee,
            min_fee: resp.min_fee,
            first_valid: resp.last_round,
            last_valid: resp.last_round + VALIDITY_WINDOW,
            genesis_id: resp.genesis_id,
            genesis_hash: resp.genesis_hash,
        }
    }
}

/// `GET /v2/status` and `GET /v2/status/wait-for-block-after/{round}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeStatus {
    pub last_round: u64,
}

/// `GET /v2/transactions/pending/{txid}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PendingTransactionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_round: Option<u64>,
    #[serde(default)]
    pub pool_error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<u64>,
}

impl PendingTransactionInfo {
    pub fn confirmed(&self) -> Option<u64> {
        self.confirmed_round.filter(|r| *r > 0)
    }
}

/// `POST /v2/transactions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(rename = "txId")]
    pub tx_id: String,
}

/// algod error body
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Current fee, validity window and genesis fields
    async fn suggested_params(&self) -> Result<SuggestedParams>;

    /// Submit an encoded signed group; returns the first transaction's id
    async fn send_raw_transactions(&self, body: Vec<u8>) -> Result<TransactionId>;

    async fn pending_transaction(&self, txid: &TransactionId) -> Result<PendingTransactionInfo>;

    async fn status(&self) -> Result<NodeStatus>;

    /// Block until the node has seen a round after `round`
    async fn status_after_block(&self, round: u64) -> Result<NodeStatus>;
}

/// algod REST client
#[derive(Clone)]
pub struct AlgodClient {
    base_url: String,
    token: Option<String>,
    /// reqwest::Client is internally Arc-based
    http: reqwest::Client,
}

impl AlgodClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.header(TOKEN_HEADER, token),
            None => builder,
        }
    }
}

/// Decode a JSON body or turn an error status into `Network`
pub(crate) async fn read_json<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.message)
            .unwrap_or(text);
        return Err(AlgoXzenError::network(format!(
            "{} failed ({}): {}",
            what, status, message
        )));
    }
    resp.json::<T>()
        .await
        .map_err(|e| AlgoXzenError::InvalidResponse(format!("{}: {}", what, e)))
}

#[async_trait]
impl NodeClient for AlgodClient {
    async fn suggested_params(&self) -> Result<SuggestedParams> {
        let resp = self
            .request(Method::GET, "/v2/transactions/params")
            .send()
            .await?;
        let params: TransactionParamsResponse = read_json(resp, "Fetching suggested params").await?;
        log::debug!(
            "Suggested params: round={}, min_fee={}, genesis={}",
            params.last_round,
            params.min_fee,
            params.genesis_id
        );
        Ok(params.into())
    }

    async fn send_raw_transactions(&self, body: Vec<u8>) -> Result<TransactionId> {
        let resp = self
            .request(Method::POST, "/v2/transactions")
            .header(reqwest::header::CONTENT_TYPE, "application/x-binary")
            .body(body)
            .send()
            .await?;
        let submitted: SubmitResponse = read_json(resp, "Submitting transactions").await?;
        log::info!("Submitted transaction group, txid: {}", submitted.tx_id);
        Ok(TransactionId::from(submitted.tx_id))
    }

    async fn pending_transaction(&self, txid: &TransactionId) -> Result<PendingTransactionInfo> {
        let resp = self
            .request(Method::GET, &format!("/v2/transactions/pending/{}", txid))
            .send()
            .await?;
        read_json(resp, "Fetching pending transaction").await
    }

    async fn status(&self) -> Result<NodeStatus> {
        let resp = self.request(Method::GET, "/v2/status").send().await?;
        read_json(resp, "Fetching node status").await
    }

    async fn status_after_block(&self, round: u64) -> Result<NodeStatus> {
        let resp = self
            .request(
                Method::GET,
                &format!("/v2/status/wait-for-block-after/{}", round),
            )
            .send()
            .await?;
        read_json(resp, "Waiting for block").await
    }
}
