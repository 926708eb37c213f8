//! Wallet Session Manager
//!
//! A single actor task owns the wallet connector and the session state.
//! Callers talk to it through a cloneable `SessionHandle`; commands run one
//! at a time in arrival order, so connect, disconnect and sign requests
//! never interleave. State changes are published on a `watch` channel.

use async_trait::async_trait;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::address::Address;
use crate::transaction::{SignedTransaction, Transaction};
use crate::{AlgoXzenError, Result};

const COMMAND_BUFFER: usize = 32;

/// Errors reported by a wallet connector implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// The user closed or declined the request in the wallet app
    #[error("{0}")]
    Rejected(String),

    /// There is no persisted session to resume
    #[error("No session to reconnect")]
    NoSession,

    #[error("{0}")]
    Failed(String),
}

impl From<ConnectorError> for AlgoXzenError {
    fn from(err: ConnectorError) -> Self {
        match err {
            ConnectorError::Rejected(msg) => AlgoXzenError::UserRejected(msg),
            ConnectorError::NoSession => AlgoXzenError::WalletNotConnected,
            ConnectorError::Failed(msg) => AlgoXzenError::Connector(msg),
        }
    }
}

/// External wallet connector (QR/relay handshake lives behind this trait)
#[async_trait]
pub trait WalletConnector: Send + Sync + 'static {
    /// Resume a previously persisted session
    async fn reconnect_session(&self) -> std::result::Result<Vec<String>, ConnectorError>;

    /// Interactive handshake; suspends until the user approves or rejects
    async fn connect(&self) -> std::result::Result<Vec<String>, ConnectorError>;

    async fn disconnect(&self) -> std::result::Result<(), ConnectorError>;

    /// Ask the user to sign every transaction of a group
    async fn sign_transactions(
        &self,
        txns: &[Transaction],
    ) -> std::result::Result<Vec<SignedTransaction>, ConnectorError>;

    /// Disconnects pushed by the wallet without a request from this side
    fn disconnect_events(&self) -> broadcast::Receiver<()>;
}

/// Which account, if any, is connected.
///
/// `connected` is derived from `address`, so the two never disagree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletSession {
    address: Option<Address>,
}

impl Serialize for WalletSession {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("WalletSession", 2)?;
        state.serialize_field("address", &self.address)?;
        state.serialize_field("connected", &self.is_connected())?;
        state.end()
    }
}

impl WalletSession {
    pub fn disconnected() -> Self {
        Self { address: None }
    }

    pub fn connected_to(address: Address) -> Self {
        Self {
            address: Some(address),
        }
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }
}

/// Disconnects queued while a handshake was pending belong to the session it replaces
fn drain_stale_disconnects(events: &mut broadcast::Receiver<()>) {
    let mut dropped = 0usize;
    while let Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_)) = events.try_recv() {
        dropped += 1;
    }
    if dropped > 0 {
        log::debug!("Dropped {} stale wallet disconnect event(s)", dropped);
    }
}

enum SessionCommand {
    Initialize(oneshot::Sender<WalletSession>),
    Connect(oneshot::Sender<Result<WalletSession>>),
    Disconnect(oneshot::Sender<WalletSession>),
    Sign {
        txns: Vec<Transaction>,
        reply: oneshot::Sender<Result<Vec<SignedTransaction>>>,
    },
    Shutdown,
}

/// Handle for talking to the session actor
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<SessionCommand>,
    state_rx: watch::Receiver<WalletSession>,
}

pub struct SessionManager;

impl SessionManager {
    /// Spawn the actor for `connector`.
    ///
    /// The connector's disconnect events are subscribed here, once, for the
    /// lifetime of the actor.
    pub fn spawn(connector: Arc<dyn WalletConnector>) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (state_tx, state_rx) = watch::channel(WalletSession::disconnected());
        let events = connector.disconnect_events();

        let actor = SessionActor {
            connector,
            state_tx,
        };
        tokio::spawn(actor.run(command_rx, events));
        log::debug!("Wallet session manager started");

        SessionHandle {
            command_tx,
            state_rx,
        }
    }
}

impl SessionHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(build(tx))
            .await
            .map_err(|_| AlgoXzenError::SessionClosed)?;
        rx.await.map_err(|_| AlgoXzenError::SessionClosed)
    }

    /// Resume a persisted session if there is one.
    ///
    /// A missing or expired session is the normal outcome and leaves the
    /// session disconnected.
    pub async fn initialize(&self) -> WalletSession {
        match self.request(SessionCommand::Initialize).await {
            Ok(session) => session,
            Err(e) => {
                log::warn!("Session initialize skipped: {}", e);
                self.session()
            }
        }
    }

    /// Run the interactive connect handshake.
    ///
    /// On rejection or failure the session is unchanged and the error is
    /// returned for the caller to report.
    pub async fn connect(&self) -> Result<WalletSession> {
        self.request(SessionCommand::Connect).await?
    }

    /// Tear down the connector session; state is reset regardless
    pub async fn disconnect(&self) -> WalletSession {
        match self.request(SessionCommand::Disconnect).await {
            Ok(session) => session,
            Err(e) => {
                log::warn!("Session disconnect skipped: {}", e);
                self.session()
            }
        }
    }

    /// Ask the connected wallet to sign `txns` (all must be sent by the
    /// connected account)
    pub async fn sign(&self, txns: Vec<Transaction>) -> Result<Vec<SignedTransaction>> {
        self.request(|reply| SessionCommand::Sign { txns, reply })
            .await?
    }

    /// Current snapshot
    pub fn session(&self) -> WalletSession {
        self.state_rx.borrow().clone()
    }

    /// Receiver that observes every address change
    pub fn subscribe(&self) -> watch::Receiver<WalletSession> {
        self.state_rx.clone()
    }

    /// Stop the actor; later requests fail with `SessionClosed`
    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(SessionCommand::Shutdown).await;
    }
}

struct SessionActor {
    connector: Arc<dyn WalletConnector>,
    state_tx: watch::Sender<WalletSession>,
}

impl SessionActor {
    async fn run(
        self,
        mut command_rx: mpsc::Receiver<SessionCommand>,
        mut events: broadcast::Receiver<()>,
    ) {
        let mut events_open = true;
        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle(command, &mut events).await,
                },
                event = events.recv(), if events_open => match event {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        log::info!("Wallet disconnected remotely");
                        self.reset();
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        log::debug!("Wallet disconnect events closed");
                        events_open = false;
                    }
                },
            }
        }
        log::debug!("Wallet session manager stopped");
    }

    async fn handle(&self, command: SessionCommand, events: &mut broadcast::Receiver<()>) {
        match command {
            SessionCommand::Initialize(reply) => {
                let _ = reply.send(self.initialize(events).await);
            }
            SessionCommand::Connect(reply) => {
                let _ = reply.send(self.connect(events).await);
            }
            SessionCommand::Disconnect(reply) => {
                let _ = reply.send(self.disconnect().await);
            }
            SessionCommand::Sign { txns, reply } => {
                let _ = reply.send(self.sign(txns).await);
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn current(&self) -> WalletSession {
        self.state_tx.borrow().clone()
    }

    fn set(&self, session: WalletSession) -> WalletSession {
        self.state_tx.send_replace(session.clone());
        session
    }

    fn reset(&self) -> WalletSession {
        self.set(WalletSession::disconnected())
    }

    async fn initialize(&self, events: &mut broadcast::Receiver<()>) -> WalletSession {
        match self.connector.reconnect_session().await {
            Ok(accounts) => match first_account(&accounts) {
                Ok(address) => {
                    log::info!("Reconnected wallet session for {}", address.short());
                    drain_stale_disconnects(events);
                    self.set(WalletSession::connected_to(address))
                }
                Err(e) => {
                    log::debug!("No usable account in previous session: {}", e);
                    self.current()
                }
            },
            Err(e) => {
                log::debug!("No wallet session to resume: {}", e);
                self.current()
            }
        }
    }

    async fn connect(&self, events: &mut broadcast::Receiver<()>) -> Result<WalletSession> {
        let accounts = self.connector.connect().await.map_err(|e| {
            log::warn!("Wallet connection failed: {}", e);
            AlgoXzenError::from(e)
        })?;
        let address = first_account(&accounts).map_err(|e| {
            log::warn!("Wallet connection failed: {}", e);
            e
        })?;
        log::info!("Wallet connected: {}", address.short());
        drain_stale_disconnects(events);
        Ok(self.set(WalletSession::connected_to(address)))
    }

    async fn disconnect(&self) -> WalletSession {
        if let Err(e) = self.connector.disconnect().await {
            log::warn!("Connector disconnect failed: {}", e);
        }
        log::info!("Wallet disconnected");
        self.reset()
    }

    async fn sign(&self, txns: Vec<Transaction>) -> Result<Vec<SignedTransaction>> {
        let session = self.current();
        let address = session.address().ok_or(AlgoXzenError::WalletNotConnected)?;
        if txns.is_empty() {
            return Err(AlgoXzenError::invalid_input("Nothing to sign"));
        }
        if let Some(foreign) = txns.iter().find(|t| &t.sender != address) {
            return Err(AlgoXzenError::invalid_input(format!(
                "Transaction sender {} is not the connected account",
                foreign.sender.short()
            )));
        }

        let signed = self.connector.sign_transactions(&txns).await.map_err(|e| {
            log::info!("Signing did not complete: {}", e);
            AlgoXzenError::from(e)
        })?;
        if signed.len() != txns.len() {
            return Err(AlgoXzenError::Connector(format!(
                "Wallet returned {} signatures for {} transactions",
                signed.len(),
                txns.len()
            )));
        }
        Ok(signed)
    }
}

fn first_account(accounts: &[String]) -> Result<Address> {
    accounts
        .first()
        .ok_or_else(|| AlgoXzenError::Connector("Wallet returned no accounts".to_string()))?
        .parse()
        .map_err(|e: AlgoXzenError| AlgoXzenError::Connector(e.to_string()))
}
