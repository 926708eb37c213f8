//! Serverless functions client
//!
//! Every function is a `POST {base}/functions/v1/{name}` with a bearer key.
//! Replies are either the function's payload or `{"error": "..."}`; both
//! shapes are decoded here into `FunctionReply` so callers never inspect
//! raw JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AlgoXzenConfig;
use crate::transaction::Transaction;
use crate::{AlgoXzenError, Result};

pub const MINT_NFT: &str = "mint-nft";
pub const AUDIT_FILE: &str = "audit-file";
pub const GENERATE_CONTRACT: &str = "generate-contract";
pub const DEBUG_CONTRACT: &str = "debug-contract";

/// Decoded function reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionReply<T> {
    Success(T),
    Failure { error: String },
}

impl<T: DeserializeOwned> FunctionReply<T> {
    /// An object with a string `error` field is a failure, anything else
    /// must decode as `T`
    pub fn from_value(value: Value) -> Result<Self> {
        if let Some(error) = value.get("error").and_then(Value::as_str) {
            return Ok(Self::Failure {
                error: error.to_string(),
            });
        }
        serde_json::from_value(value)
            .map(Self::Success)
            .map_err(|e| AlgoXzenError::InvalidResponse(e.to_string()))
    }
}

impl<T> FunctionReply<T> {
    /// Collapse a failure into a `Network` error carrying the function name
    pub fn into_result(self, function: &str) -> Result<T> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure { error } => Err(AlgoXzenError::network(format!(
                "{} failed: {}",
                function, error
            ))),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// `mint-nft` request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintNftRequest {
    pub account_address: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub file_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipfs_url: Option<String>,
}

/// `mint-nft` success body: one unsigned asset-creation transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintNftResponse {
    /// base64 of the transaction encoding
    pub transaction: String,
    pub message: String,
}

impl MintNftResponse {
    pub fn decode_transaction(&self) -> Result<Transaction> {
        Transaction::decode_base64(&self.transaction)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRequest {
    pub file_name: String,
    pub file_type: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFinding {
    /// `critical`, `warning` or `info`
    pub severity: String,
    #[serde(default)]
    pub category: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl AuditFinding {
    pub fn is_critical(&self) -> bool {
        self.severity.eq_ignore_ascii_case("critical")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub risk_score: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub findings: Vec<AuditFinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContract {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugRequest {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugIssue {
    /// `error`, `warning` or `info`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugReport {
    #[serde(default)]
    pub issues: Vec<DebugIssue>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Clone)]
pub struct FunctionsClient {
    http: reqwest::Client,
    base_url: String,
    key: Option<String>,
}

impl FunctionsClient {
    pub fn new(base_url: impl Into<String>, key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key,
        }
    }

    /// Build from `FUNCTIONS_URL`/`FUNCTIONS_KEY`; the URL is required
    pub fn from_config(config: &AlgoXzenConfig) -> Result<Self> {
        let url = config
            .functions_url
            .as_deref()
            .ok_or_else(|| AlgoXzenError::invalid_input("FUNCTIONS_URL is not configured"))?;
        Ok(Self::new(url, config.functions_key.clone()))
    }

    fn url(&self, name: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url, name)
    }

    /// Call `name` with `body`.
    ///
    /// An error status with an `{error}` body is a `Failure`; an error status
    /// without one is a `Network` error.
    pub async fn call<B, T>(&self, name: &str, body: &B) -> Result<FunctionReply<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut req = self.http.post(self.url(name)).json(body);
        if let Some(key) = &self.key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        log::debug!("Function {} returned {}", name, status);

        match serde_json::from_str::<Value>(&text) {
            Ok(value) if status.is_success() || value.get("error").is_some() => {
                FunctionReply::from_value(value)
            }
            Err(e) if status.is_success() => {
                Err(AlgoXzenError::InvalidResponse(format!("{}: {}", name, e)))
            }
            _ => Err(AlgoXzenError::network(format!(
                "{} failed ({}): {}",
                name, status, text
            ))),
        }
    }

    pub async fn mint_nft(&self, req: &MintNftRequest) -> Result<FunctionReply<MintNftResponse>> {
        self.call(MINT_NFT, req).await
    }

    pub async fn audit_file(&self, req: &AuditRequest) -> Result<FunctionReply<AuditReport>> {
        self.call(AUDIT_FILE, req).await
    }

    pub async fn generate_contract(
        &self,
        req: &GenerateRequest,
    ) -> Result<FunctionReply<GeneratedContract>> {
        self.call(GENERATE_CONTRACT, req).await
    }

    pub async fn debug_contract(&self, req: &DebugRequest) -> Result<FunctionReply<DebugReport>> {
        self.call(DEBUG_CONTRACT, req).await
    }
}
