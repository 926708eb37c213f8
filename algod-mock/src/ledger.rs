/// In-memory ledger behind the mock node
///
/// Rounds only advance when asked to (explicitly or through a
/// wait-for-block request). Producing a block confirms everything pending
/// unless auto-confirm is turned off.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use algoxzen::node::{NodeStatus, PendingTransactionInfo, TransactionParamsResponse};
use algoxzen::transaction::{compute_group_id, SignedTransaction, TransactionId};

use crate::config::MockConfig;

const SIGNATURE_LEN: usize = 64;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("empty transaction group")]
    EmptyGroup,

    #[error("transaction {0} is missing a signature")]
    MissingSignature(String),

    #[error("transaction {txid} genesis mismatch: got {got}")]
    GenesisMismatch { txid: String, got: String },

    #[error("transaction {txid} fee {fee} below minimum {min_fee}")]
    FeeTooLow { txid: String, fee: u64, min_fee: u64 },

    #[error("transaction {txid} not valid in round {round} (valid {first}..{last})")]
    OutsideValidity {
        txid: String,
        round: u64,
        first: u64,
        last: u64,
    },

    #[error("group id mismatch")]
    GroupMismatch,

    #[error("transaction already in ledger: {0}")]
    Duplicate(String),

    #[error("invalid transaction: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
struct TxRecord {
    confirmed_round: Option<u64>,
    asset_index: Option<u64>,
    is_asset_create: bool,
}

#[derive(Debug)]
struct LedgerState {
    round: u64,
    auto_confirm: bool,
    next_asset_id: u64,
    pending: Vec<String>,
    records: HashMap<String, TxRecord>,
}

/// Shared ledger; all methods lock internally
#[derive(Debug)]
pub struct MockLedger {
    genesis_id: String,
    genesis_hash: String,
    min_fee: u64,
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new(config: &MockConfig) -> Self {
        Self {
            genesis_id: config.genesis_id.clone(),
            genesis_hash: config.genesis_hash.clone(),
            min_fee: config.min_fee,
            state: Mutex::new(LedgerState {
                round: config.start_round,
                auto_confirm: config.auto_confirm,
                next_asset_id: config.first_asset_id,
                pending: Vec::new(),
                records: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // no invariants span a panic point
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn round(&self) -> u64 {
        self.lock().round
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            last_round: self.round(),
        }
    }

    pub fn params(&self) -> TransactionParamsResponse {
        TransactionParamsResponse {
            consensus_version: Some("mock".to_string()),
            fee: 0,
            genesis_hash: self.genesis_hash.clone(),
            genesis_id: self.genesis_id.clone(),
            last_round: self.round(),
            min_fee: self.min_fee,
        }
    }

    pub fn set_auto_confirm(&self, enabled: bool) {
        log::info!("Auto-confirm {}", if enabled { "enabled" } else { "disabled" });
        self.lock().auto_confirm = enabled;
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Validate and queue a signed group; returns the first transaction id
    pub fn submit(&self, group: Vec<SignedTransaction>) -> Result<TransactionId, LedgerError> {
        if group.is_empty() {
            return Err(LedgerError::EmptyGroup);
        }

        let mut state = self.lock();
        let mut ids = Vec::with_capacity(group.len());
        for signed in &group {
            let txn = &signed.txn;
            let txid = txn
                .id()
                .map_err(|e| LedgerError::Invalid(e.to_string()))?
                .to_string();
            if signed.sig.len() != SIGNATURE_LEN {
                return Err(LedgerError::MissingSignature(txid));
            }
            if txn.genesis_id != self.genesis_id || txn.genesis_hash != self.genesis_hash {
                return Err(LedgerError::GenesisMismatch {
                    txid,
                    got: txn.genesis_id.clone(),
                });
            }
            if txn.fee < self.min_fee {
                return Err(LedgerError::FeeTooLow {
                    txid,
                    fee: txn.fee,
                    min_fee: self.min_fee,
                });
            }
            if state.round < txn.first_valid || state.round > txn.last_valid {
                return Err(LedgerError::OutsideValidity {
                    txid,
                    round: state.round,
                    first: txn.first_valid,
                    last: txn.last_valid,
                });
            }
            if state.records.contains_key(&txid) || ids.contains(&txid) {
                return Err(LedgerError::Duplicate(txid));
            }
            ids.push(txid);
        }

        let txns: Vec<_> = group.iter().map(|s| s.txn.clone()).collect();
        let grouped = txns.iter().any(|t| t.group.is_some());
        if grouped || txns.len() > 1 {
            let expected =
                compute_group_id(&txns).map_err(|e| LedgerError::Invalid(e.to_string()))?;
            if txns.iter().any(|t| t.group != Some(expected)) {
                return Err(LedgerError::GroupMismatch);
            }
        }

        for (txid, txn) in ids.iter().zip(&txns) {
            state.records.insert(
                txid.clone(),
                TxRecord {
                    confirmed_round: None,
                    asset_index: None,
                    is_asset_create: txn.is_asset_create(),
                },
            );
            state.pending.push(txid.clone());
        }
        log::info!("Accepted group of {} transaction(s), first {}", ids.len(), ids[0]);
        Ok(TransactionId::from(ids.swap_remove(0)))
    }

    pub fn pending_info(&self, txid: &str) -> Option<PendingTransactionInfo> {
        self.lock().records.get(txid).map(|r| PendingTransactionInfo {
            confirmed_round: r.confirmed_round,
            pool_error: String::new(),
            asset_index: r.asset_index,
        })
    }

    /// Produce `count` blocks; returns the new round.
    ///
    /// Only the first block can confirm anything, so the rest are empty
    /// and the tip jumps straight to its final round.
    pub fn advance(&self, count: u64) -> u64 {
        let mut state = self.lock();
        if count > 0 {
            produce_block(&mut state);
            state.round = state.round.saturating_add(count - 1);
        }
        state.round
    }

    /// Produce blocks until the tip is past `round`
    pub fn wait_for_block_after(&self, round: u64) -> NodeStatus {
        let mut state = self.lock();
        if state.round <= round {
            produce_block(&mut state);
            state.round = state.round.max(round.saturating_add(1));
        }
        NodeStatus {
            last_round: state.round,
        }
    }
}

fn produce_block(state: &mut LedgerState) {
    state.round = state.round.saturating_add(1);
    if !state.auto_confirm {
        return;
    }
    let round = state.round;
    let pending = std::mem::take(&mut state.pending);
    for txid in &pending {
        let asset_id = state.next_asset_id;
        if let Some(record) = state.records.get_mut(txid) {
            record.confirmed_round = Some(round);
            if record.is_asset_create {
                record.asset_index = Some(asset_id);
                state.next_asset_id += 1;
            }
        }
    }
    if !pending.is_empty() {
        log::debug!("Round {} confirmed {} transaction(s)", round, pending.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use algoxzen::transaction::{AssetParams, SuggestedParams, Transaction, TransactionGroup};
    use algoxzen::Address;

    const ALICE: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";

    fn ledger() -> MockLedger {
        MockLedger::new(&MockConfig::default())
    }

    fn params(ledger: &MockLedger) -> SuggestedParams {
        ledger.params().into()
    }

    fn sign(txns: &[Transaction]) -> Vec<SignedTransaction> {
        txns.iter()
            .map(|t| SignedTransaction {
                sig: vec![1u8; SIGNATURE_LEN],
                txn: t.clone(),
            })
            .collect()
    }

    fn mint_group(ledger: &MockLedger) -> TransactionGroup {
        let alice: Address = ALICE.parse().unwrap();
        let p = params(ledger);
        let pay = Transaction::payment(&p, &alice, &alice, 0, None).unwrap();
        let asset = Transaction::asset_create(
            &p,
            &alice,
            AssetParams::unique(&alice, "AXNFT", "Doc", "ipfs://x", [1u8; 32]),
            None,
        )
        .unwrap();
        TransactionGroup::new(vec![pay, asset]).unwrap()
    }

    #[test]
    fn test_block_confirms_and_allocates_asset() {
        let ledger = ledger();
        let group = mint_group(&ledger);
        let ids = group.ids().unwrap();

        let first = ledger.submit(sign(group.transactions())).unwrap();
        assert_eq!(first, ids[0]);
        assert_eq!(ledger.pending_info(first.as_str()).unwrap().confirmed(), None);

        let round = ledger.advance(1);
        let pay = ledger.pending_info(ids[0].as_str()).unwrap();
        let asset = ledger.pending_info(ids[1].as_str()).unwrap();
        assert_eq!(pay.confirmed(), Some(round));
        assert_eq!(pay.asset_index, None);
        assert_eq!(asset.asset_index, Some(MockConfig::default().first_asset_id));
    }

    #[test]
    fn test_rejects_tampered_group() {
        let ledger = ledger();
        let group = mint_group(&ledger);
        let mut signed = sign(group.transactions());
        signed[1].txn.note = Some(b"changed".to_vec());
        assert_eq!(ledger.submit(signed), Err(LedgerError::GroupMismatch));
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_rejects_unsigned_and_empty() {
        let ledger = ledger();
        let group = mint_group(&ledger);
        let mut signed = sign(group.transactions());
        signed[0].sig.clear();
        assert!(matches!(
            ledger.submit(signed),
            Err(LedgerError::MissingSignature(_))
        ));
        assert_eq!(ledger.submit(vec![]), Err(LedgerError::EmptyGroup));
    }

    #[test]
    fn test_auto_confirm_off_keeps_pending() {
        let ledger = ledger();
        ledger.set_auto_confirm(false);
        let group = mint_group(&ledger);
        let first = ledger.submit(sign(group.transactions())).unwrap();
        let start = ledger.round();
        let status = ledger.wait_for_block_after(start);
        assert_eq!(status.last_round, start + 1);
        assert_eq!(ledger.pending_info(first.as_str()).unwrap().confirmed(), None);
        assert_eq!(ledger.pending_count(), 2);
    }

    #[test]
    fn test_large_jumps_return_at_once() {
        let ledger = ledger();
        let group = mint_group(&ledger);
        let first = ledger.submit(sign(group.transactions())).unwrap();
        let start = ledger.round();

        let round = ledger.advance(u64::MAX / 2);
        assert_eq!(round, start + u64::MAX / 2);
        // everything pending lands in the first block of the jump
        let info = ledger.pending_info(first.as_str()).unwrap();
        assert_eq!(info.confirmed(), Some(start + 1));

        let target = round + 1_000_000_000;
        assert_eq!(ledger.wait_for_block_after(target).last_round, target + 1);
        assert_eq!(ledger.wait_for_block_after(0).last_round, target + 1);
        assert_eq!(ledger.advance(u64::MAX), u64::MAX);
        assert_eq!(ledger.wait_for_block_after(u64::MAX).last_round, u64::MAX);
    }
}
