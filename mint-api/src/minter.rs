//! Builds the unsigned asset-creation transaction for `mint-nft`
//!
//! Stateless: every call fetches fresh suggested params and returns the
//! encoded transaction for the client to sign. Nothing is retried.

use std::sync::Arc;

use algoxzen::functions::{MintNftRequest, MintNftResponse};
use algoxzen::node::NodeClient;
use algoxzen::transaction::{truncate_bytes, AssetParams, Transaction, MAX_NOTE_BYTES};
use algoxzen::Address;

use crate::error::ApiError;

pub const UNIT_NAME: &str = "ALGOXZEN";
pub const READY_MESSAGE: &str = "Transaction ready for signing";
const METADATA_HASH_LEN: usize = 32;

pub struct Minter {
    node: Arc<dyn NodeClient>,
    asset_url_base: String,
}

impl Minter {
    pub fn new(node: Arc<dyn NodeClient>, asset_url_base: impl Into<String>) -> Self {
        Self {
            node,
            asset_url_base: asset_url_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Input checks, done before the node is contacted
    fn validate(req: &MintNftRequest) -> Result<(Address, [u8; METADATA_HASH_LEN]), ApiError> {
        let sender: Address = req
            .account_address
            .parse()
            .map_err(|_| ApiError::InvalidInput("Invalid account address".to_string()))?;

        if req.title.trim().is_empty() {
            return Err(ApiError::InvalidInput("Title is required".to_string()));
        }

        // metadata hash is the first 32 bytes of the hash string itself
        let hash_bytes = req.file_hash.trim().as_bytes();
        let metadata_hash: [u8; METADATA_HASH_LEN] = hash_bytes
            .get(..METADATA_HASH_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| {
                ApiError::InvalidInput(format!(
                    "fileHash must be at least {} characters",
                    METADATA_HASH_LEN
                ))
            })?;

        Ok((sender, metadata_hash))
    }

    fn asset_url(&self, req: &MintNftRequest) -> String {
        match req.ipfs_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!("{}/{}", self.asset_url_base, req.file_hash.trim()),
        }
    }

    pub async fn prepare(&self, req: &MintNftRequest) -> Result<MintNftResponse, ApiError> {
        let (sender, metadata_hash) = Self::validate(req)?;
        let title = req.title.trim();
        log::info!("Preparing asset '{}' for {}", title, sender.short());

        let params = self.node.suggested_params().await?;

        let asset = AssetParams::unique(
            &sender,
            UNIT_NAME,
            title,
            &self.asset_url(req),
            metadata_hash,
        );
        let note = format!("AlgoXzen Verified: {}", title);
        let note = truncate_bytes(&note, MAX_NOTE_BYTES).as_bytes().to_vec();
        let txn = Transaction::asset_create(&params, &sender, asset, Some(note))?;

        log::debug!("Prepared unsigned transaction {}", txn.id()?);
        Ok(MintNftResponse {
            transaction: txn.encode_base64()?,
            message: READY_MESSAGE.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";

    fn request() -> MintNftRequest {
        MintNftRequest {
            account_address: ALICE.to_string(),
            title: "Doc1".to_string(),
            description: String::new(),
            file_hash: "ab".repeat(32),
            ipfs_url: None,
        }
    }

    #[test]
    fn test_validate_takes_hash_prefix() {
        let (_, hash) = Minter::validate(&request()).unwrap();
        assert_eq!(&hash[..], "ab".repeat(16).as_bytes());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let mut req = request();
        req.account_address = "nope".into();
        assert!(matches!(Minter::validate(&req), Err(ApiError::InvalidInput(_))));

        let mut req = request();
        req.title = "  ".into();
        assert!(matches!(Minter::validate(&req), Err(ApiError::InvalidInput(_))));

        let mut req = request();
        req.file_hash = "short".into();
        assert!(matches!(Minter::validate(&req), Err(ApiError::InvalidInput(_))));
    }
}
