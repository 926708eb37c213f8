//! File content digests

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

use crate::{AlgoXzenError, Result};

/// Tag prefixed to the hex digest when it is displayed or embedded
pub const DIGEST_TAG: &str = "SHA256";

/// SHA-256 digest of a file's full contents.
///
/// Immutable once computed; selecting another file produces a new value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDigest {
    bytes: [u8; 32],
}

impl FileDigest {
    pub fn from_bytes(content: &[u8]) -> Self {
        let hash = Sha256::digest(content);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        Self { bytes }
    }

    /// Read the whole file and digest it
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await.map_err(|e| {
            log::warn!("Failed to read {}: {}", path.display(), e);
            AlgoXzenError::Io(e)
        })?;
        log::debug!("Digesting {} ({} bytes)", path.display(), content.len());
        Ok(Self::from_bytes(&content))
    }

    /// Parse either a bare 64-char hex digest or the tagged `SHA256:<hex>` form
    pub fn parse(s: &str) -> Result<Self> {
        let hex_part = s
            .strip_prefix(DIGEST_TAG)
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(s);
        let decoded = hex::decode(hex_part)
            .map_err(|e| AlgoXzenError::invalid_input(format!("Invalid digest hex: {}", e)))?;
        let bytes: [u8; 32] = decoded.try_into().map_err(|_| {
            AlgoXzenError::invalid_input("Digest must be 32 bytes (64 hex characters)")
        })?;
        Ok(Self { bytes })
    }

    pub fn algorithm(&self) -> &'static str {
        "SHA-256"
    }

    /// Lowercase 64-character hex
    pub fn hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// `SHA256:<hex>`
    pub fn tagged(&self) -> String {
        format!("{}:{}", DIGEST_TAG, self.hex())
    }

    /// Raw digest bytes, used as the asset metadata hash
    pub fn metadata_hash(&self) -> [u8; 32] {
        self.bytes
    }
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tagged())
    }
}
