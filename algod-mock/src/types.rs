/// Request/response bodies that are specific to the mock
///
/// algod response shapes come from `algoxzen::node` so both sides agree.

use serde::{Deserialize, Serialize};

/// algod-style error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceRequest {
    #[serde(default = "default_count")]
    pub count: u64,
}

fn default_count() -> u64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceResponse {
    pub round: u64,
}
