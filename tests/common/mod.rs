//! Common test utilities for AlgoXzen integration tests
//!
//! - `ScriptedConnector`: in-memory wallet connector with switchable
//!   rejections and call counters
//! - `CountingNode` / `StallingNode`: node wrappers for "no network call"
//!   and cancellation scenarios
//! - helpers to start the in-process algod mock

#![allow(dead_code)]

use algod_mock::{MockConfig, MockNode};
use algoxzen::node::{NodeStatus, PendingTransactionInfo};
use algoxzen::transaction::{SignedTransaction, SuggestedParams, Transaction, TransactionId};
use algoxzen::{
    AlgoXzenConfig, AlgodClient, AlgoXzenError, ConnectorError, NodeClient, SessionHandle,
    SessionManager, WalletConnector,
};
use async_trait::async_trait;
use sha2::{Digest, Sha512};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

pub const ALICE: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";
pub const BOB: &str = "BOBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBPMMRZEY";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

// ============================================================================
// Wallet connector
// ============================================================================

pub struct ScriptedConnector {
    accounts: Vec<String>,
    persisted: Mutex<Option<Vec<String>>>,
    reject_connect: AtomicBool,
    reject_sign: AtomicBool,
    connect_delay: Mutex<Option<Duration>>,
    events: broadcast::Sender<()>,
    pub subscriptions: AtomicUsize,
    pub connect_calls: AtomicUsize,
    pub disconnect_calls: AtomicUsize,
    pub sign_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    signed: Mutex<Vec<Transaction>>,
}

impl ScriptedConnector {
    pub fn new(accounts: &[&str]) -> Arc<Self> {
        let (events, _) = broadcast::channel(8);
        Arc::new(Self {
            accounts: accounts.iter().map(|a| a.to_string()).collect(),
            persisted: Mutex::new(None),
            reject_connect: AtomicBool::new(false),
            reject_sign: AtomicBool::new(false),
            connect_delay: Mutex::new(None),
            events,
            subscriptions: AtomicUsize::new(0),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            signed: Mutex::new(Vec::new()),
        })
    }

    /// Connector that resumes a previous session for `accounts`
    pub fn with_persisted(accounts: &[&str]) -> Arc<Self> {
        let connector = Self::new(accounts);
        *connector.persisted.lock().unwrap() =
            Some(accounts.iter().map(|a| a.to_string()).collect());
        connector
    }

    pub fn reject_connect(&self, reject: bool) {
        self.reject_connect.store(reject, Ordering::SeqCst);
    }

    pub fn reject_sign(&self, reject: bool) {
        self.reject_sign.store(reject, Ordering::SeqCst);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock().unwrap() = Some(delay);
    }

    /// Simulate the wallet app ending the session
    pub fn push_disconnect(&self) {
        let _ = self.events.send(());
    }

    /// Every transaction handed to the wallet for signing, in order
    pub fn signed_transactions(&self) -> Vec<Transaction> {
        self.signed.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletConnector for ScriptedConnector {
    async fn reconnect_session(&self) -> Result<Vec<String>, ConnectorError> {
        self.persisted
            .lock()
            .unwrap()
            .clone()
            .ok_or(ConnectorError::NoSession)
    }

    async fn connect(&self) -> Result<Vec<String>, ConnectorError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.connect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.reject_connect.load(Ordering::SeqCst) {
            return Err(ConnectorError::Rejected("Connect modal closed by user".into()));
        }
        Ok(self.accounts.clone())
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_transactions(
        &self,
        txns: &[Transaction],
    ) -> Result<Vec<SignedTransaction>, ConnectorError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_sign.load(Ordering::SeqCst) {
            return Err(ConnectorError::Rejected("Transaction request rejected".into()));
        }
        self.signed.lock().unwrap().extend_from_slice(txns);

        txns.iter()
            .map(|txn| {
                let bytes = txn
                    .encode()
                    .map_err(|e| ConnectorError::Failed(e.to_string()))?;
                Ok(SignedTransaction {
                    sig: Sha512::digest(&bytes).to_vec(),
                    txn: txn.clone(),
                })
            })
            .collect()
    }

    fn disconnect_events(&self) -> broadcast::Receiver<()> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        self.events.subscribe()
    }
}

/// Spawn a session manager and connect it
pub async fn connected_session(connector: Arc<ScriptedConnector>) -> SessionHandle {
    let session = SessionManager::spawn(connector);
    session.connect().await.expect("connect");
    session
}

// ============================================================================
// Node wrappers
// ============================================================================

/// Counts calls; every call fails as if the node were unreachable
#[derive(Default)]
pub struct CountingNode {
    pub calls: AtomicUsize,
}

impl CountingNode {
    fn fail<T>(&self) -> algoxzen::Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AlgoXzenError::network("node unreachable"))
    }
}

#[async_trait]
impl NodeClient for CountingNode {
    async fn suggested_params(&self) -> algoxzen::Result<SuggestedParams> {
        self.fail()
    }

    async fn send_raw_transactions(&self, _body: Vec<u8>) -> algoxzen::Result<TransactionId> {
        self.fail()
    }

    async fn pending_transaction(
        &self,
        _txid: &TransactionId,
    ) -> algoxzen::Result<PendingTransactionInfo> {
        self.fail()
    }

    async fn status(&self) -> algoxzen::Result<NodeStatus> {
        self.fail()
    }

    async fn status_after_block(&self, _round: u64) -> algoxzen::Result<NodeStatus> {
        self.fail()
    }
}

/// Forwards to a real client but never sees another block
pub struct StallingNode {
    pub inner: AlgodClient,
}

#[async_trait]
impl NodeClient for StallingNode {
    async fn suggested_params(&self) -> algoxzen::Result<SuggestedParams> {
        self.inner.suggested_params().await
    }

    async fn send_raw_transactions(&self, body: Vec<u8>) -> algoxzen::Result<TransactionId> {
        self.inner.send_raw_transactions(body).await
    }

    async fn pending_transaction(
        &self,
        txid: &TransactionId,
    ) -> algoxzen::Result<PendingTransactionInfo> {
        self.inner.pending_transaction(txid).await
    }

    async fn status(&self) -> algoxzen::Result<NodeStatus> {
        self.inner.status().await
    }

    async fn status_after_block(&self, _round: u64) -> algoxzen::Result<NodeStatus> {
        std::future::pending().await
    }
}

// ============================================================================
// Mock node
// ============================================================================

pub async fn spawn_mock_node(auto_confirm: bool) -> anyhow::Result<MockNode> {
    let config = MockConfig {
        auto_confirm,
        ..MockConfig::default()
    };
    MockNode::spawn(config).await
}

/// Library config pointing at `node`
pub fn config_for(node: &MockNode, confirmation_rounds: u64) -> AlgoXzenConfig {
    AlgoXzenConfig {
        algod_url: node.url(),
        platform_address: BOB.parse().expect("valid address"),
        confirmation_rounds,
        ..AlgoXzenConfig::default()
    }
}

/// Poll `cond` every 10ms for up to 5s
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
