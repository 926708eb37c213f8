//! Mint and anchoring flows
//!
//! Each flow is a straight line: validate, fetch params, build, sign through
//! the session manager, submit, wait for confirmation. Nothing is retried
//! and a failure at any step aborts the flow. There is no rollback once a
//! group has been signed.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::address::Address;
use crate::config::AlgoXzenConfig;
use crate::confirmation::{wait_for_confirmation, CancelSignal};
use crate::digest::FileDigest;
use crate::functions::AuditFinding;
use crate::node::{NodeClient, PendingTransactionInfo};
use crate::session::SessionHandle;
use crate::transaction::{
    encode_signed_group, truncate_bytes, AssetParams, SuggestedParams, Transaction,
    TransactionGroup, TransactionId, MAX_NOTE_BYTES,
};
use crate::{AlgoXzenError, Result};

/// Unit name of assets minted from documents
pub const MINT_UNIT_NAME: &str = "AXNFT";
pub const PLATFORM_FEE_NOTE: &str = "AlgoXzen Platform Fee";

const MAX_NOTE_DESCRIPTION_BYTES: usize = 512;
const MAX_NOTE_FILE_NAME_BYTES: usize = 128;

/// Everything the mint flow needs from the page
#[derive(Clone, Debug)]
pub struct MintRequest {
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub digest: FileDigest,
}

/// Outcome of a confirmed mint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintResult {
    pub transaction_id: TransactionId,
    pub confirmed_round: u64,
    /// Absent when the node did not report the created asset
    pub asset_id: Option<u64>,
}

/// Outcome of a confirmed verification or audit anchor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorResult {
    pub transaction_id: TransactionId,
    pub confirmed_round: u64,
}

pub struct MintFlow {
    node: Arc<dyn NodeClient>,
    session: SessionHandle,
    config: AlgoXzenConfig,
}

impl MintFlow {
    pub fn new(node: Arc<dyn NodeClient>, session: SessionHandle, config: AlgoXzenConfig) -> Self {
        Self {
            node,
            session,
            config,
        }
    }

    pub fn config(&self) -> &AlgoXzenConfig {
        &self.config
    }

    /// Connected account, or `WalletNotConnected`
    fn sender(&self) -> Result<Address> {
        self.session
            .session()
            .address()
            .cloned()
            .ok_or(AlgoXzenError::WalletNotConnected)
    }

    /// Checks that run before any network call: wallet first, then title
    pub fn validate(&self, request: &MintRequest) -> Result<Address> {
        let sender = self.sender()?;
        if request.title.trim().is_empty() {
            return Err(AlgoXzenError::invalid_input("Please enter a title for your NFT"));
        }
        Ok(sender)
    }

    /// `[fee payment, asset create]` sharing one params fetch and group id
    pub fn build_mint_group(
        &self,
        params: &SuggestedParams,
        sender: &Address,
        request: &MintRequest,
    ) -> Result<TransactionGroup> {
        let fee_payment = Transaction::payment(
            params,
            sender,
            &self.config.platform_address,
            self.config.platform_fee,
            Some(PLATFORM_FEE_NOTE.as_bytes().to_vec()),
        )?;

        let asset = AssetParams::unique(
            sender,
            MINT_UNIT_NAME,
            request.title.trim(),
            &format!("ipfs://{}", request.digest.hex()),
            request.digest.metadata_hash(),
        );
        let note = mint_note(
            &request.digest.hex(),
            &request.file_name,
            &request.description,
            &chrono::Utc::now().to_rfc3339(),
        )?;
        let asset_create = Transaction::asset_create(params, sender, asset, Some(note))?;

        TransactionGroup::new(vec![fee_payment, asset_create])
    }

    /// Mint a single-unit asset bound to the document digest
    pub async fn mint(&self, request: &MintRequest, mut cancel: CancelSignal) -> Result<MintResult> {
        let sender = self.validate(request)?;
        log::info!(
            "Minting '{}' ({}) for {}",
            request.title.trim(),
            request.digest,
            sender.short()
        );

        let params = cancel.guard(self.node.suggested_params()).await?;
        let group = self.build_mint_group(&params, &sender, request)?;
        let asset_txid = group
            .transactions()
            .iter()
            .find(|t| t.is_asset_create())
            .map(Transaction::id)
            .transpose()?;
        log::debug!("Built mint group {:?}", group.group_id());

        let (txid, info) = self
            .sign_submit_confirm(group.transactions().to_vec(), cancel)
            .await?;
        let confirmed_round = info.confirmed().unwrap_or_default();

        let asset_id = match asset_txid {
            Some(id) => self.asset_index(&id).await,
            None => None,
        };
        log::info!(
            "Mint confirmed: txid={}, round={}, asset={:?}",
            txid,
            confirmed_round,
            asset_id
        );

        Ok(MintResult {
            transaction_id: txid,
            confirmed_round,
            asset_id,
        })
    }

    /// Anchor a document digest with a zero-amount self-payment
    pub async fn verify_document(
        &self,
        digest: &FileDigest,
        url: &str,
        cancel: CancelSignal,
    ) -> Result<AnchorResult> {
        let note = json!({
            "type": "verification",
            "fileHash": digest.hex(),
            "url": url,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.anchor(note, cancel).await
    }

    /// Anchor an audit outcome for a file digest
    pub async fn submit_audit(
        &self,
        digest: &FileDigest,
        risk_score: &str,
        findings: &[AuditFinding],
        cancel: CancelSignal,
    ) -> Result<AnchorResult> {
        let critical = findings.iter().filter(|f| f.is_critical()).count();
        let note = json!({
            "type": "audit",
            "fileHash": digest.hex(),
            "riskScore": risk_score,
            "findings": findings.len(),
            "critical": critical,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.anchor(note, cancel).await
    }

    /// Sign, submit and confirm a transaction prepared by the mint endpoint
    pub async fn mint_prepared(
        &self,
        unsigned: Transaction,
        cancel: CancelSignal,
    ) -> Result<MintResult> {
        let sender = self.sender()?;
        if unsigned.sender != sender {
            return Err(AlgoXzenError::invalid_input(
                "Prepared transaction was built for another account",
            ));
        }
        if !unsigned.is_asset_create() {
            return Err(AlgoXzenError::invalid_input(
                "Prepared transaction is not an asset creation",
            ));
        }

        let (txid, info) = self.sign_submit_confirm(vec![unsigned], cancel).await?;
        Ok(MintResult {
            transaction_id: txid,
            confirmed_round: info.confirmed().unwrap_or_default(),
            asset_id: info.asset_index,
        })
    }

    async fn anchor(&self, note: serde_json::Value, mut cancel: CancelSignal) -> Result<AnchorResult> {
        let sender = self.sender()?;
        let params = cancel.guard(self.node.suggested_params()).await?;
        let txn = Transaction::payment(&params, &sender, &sender, 0, Some(serde_json::to_vec(&note)?))?;

        let (txid, info) = self.sign_submit_confirm(vec![txn], cancel).await?;
        log::info!("Anchor confirmed: txid={}", txid);
        Ok(AnchorResult {
            transaction_id: txid,
            confirmed_round: info.confirmed().unwrap_or_default(),
        })
    }

    async fn sign_submit_confirm(
        &self,
        txns: Vec<Transaction>,
        mut cancel: CancelSignal,
    ) -> Result<(TransactionId, PendingTransactionInfo)> {
        let signed = cancel.guard(self.session.sign(txns)).await?;
        let body = encode_signed_group(&signed)?;
        let txid = cancel.guard(self.node.send_raw_transactions(body)).await?;

        let info = wait_for_confirmation(
            self.node.as_ref(),
            &txid,
            self.config.confirmation_rounds,
            cancel,
        )
        .await?;
        Ok((txid, info))
    }

    /// Asset index from the creating transaction's pending record
    async fn asset_index(&self, txid: &TransactionId) -> Option<u64> {
        match self.node.pending_transaction(txid).await {
            Ok(info) => info.asset_index,
            Err(e) => {
                log::warn!("Could not read asset id for {}: {}", txid, e);
                None
            }
        }
    }
}

/// JSON note of the asset-create transaction.
///
/// Limits apply to the encoded note, so escaping can force the free-text
/// fields below their own caps: the description gives way first, then the
/// file name.
fn mint_note(
    file_hash: &str,
    file_name: &str,
    description: &str,
    timestamp: &str,
) -> Result<Vec<u8>> {
    let mut file_name = truncate_bytes(file_name, MAX_NOTE_FILE_NAME_BYTES);
    let mut description = truncate_bytes(description, MAX_NOTE_DESCRIPTION_BYTES);
    loop {
        let note = serde_json::to_vec(&json!({
            "fileHash": file_hash,
            "fileName": file_name,
            "description": description,
            "timestamp": timestamp,
        }))?;
        if note.len() <= MAX_NOTE_BYTES {
            return Ok(note);
        }
        let excess = note.len() - MAX_NOTE_BYTES;
        if !description.is_empty() {
            description = shrink_encoded(description, excess);
        } else if !file_name.is_empty() {
            file_name = shrink_encoded(file_name, excess);
        } else {
            return Err(AlgoXzenError::invalid_input(format!(
                "Note is {} bytes, limit is {}",
                note.len(),
                MAX_NOTE_BYTES
            )));
        }
    }
}

/// Drop trailing chars until at least `excess` encoded bytes are gone
fn shrink_encoded(s: &str, excess: usize) -> &str {
    let mut removed = 0;
    let mut end = s.len();
    for (i, c) in s.char_indices().rev() {
        if removed >= excess {
            break;
        }
        removed += json_escaped_len(c);
        end = i;
    }
    &s[..end]
}

/// Bytes `c` occupies inside a JSON string
fn json_escaped_len(c: char) -> usize {
    match c {
        '"' | '\\' | '\u{8}' | '\u{c}' | '\n' | '\r' | '\t' => 2,
        c if (c as u32) < 0x20 => 6,
        c => c.len_utf8(),
    }
}
