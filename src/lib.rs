//! AlgoXzen: document verification and asset minting on Algorand
//!
//! This crate owns the wallet session and the flows that turn a file into a
//! confirmed on-chain record, while the wallet connector, node and indexer
//! stay behind narrow interfaces.
//!
//! # Architecture
//!
//! - **Session Manager**: single actor owning the wallet connector; state is
//!   published on a watch channel
//! - **Mint Flow**: digest, params fetch, atomic `[fee, asset]` group,
//!   signing, submission and a bounded, cancellable confirmation wait
//! - **Controller**: page state plus the mapping of outcomes to notices
//! - **Explorer / Functions**: indexer search, explorer links and the
//!   serverless function client
//!
//! # Example
//!
//! ```ignore
//! use algoxzen::{AlgodClient, AlgoXzenConfig, CancelSignal, MintFlow, SessionManager};
//!
//! let config = AlgoXzenConfig::from_env();
//! let session = SessionManager::spawn(connector);
//! session.initialize().await;
//!
//! let node = Arc::new(AlgodClient::new(&config.algod_url, config.algod_token.clone()));
//! let flow = MintFlow::new(node, session.clone(), config);
//! let result = flow.mint(&request, CancelSignal::never()).await?;
//! ```

// Public modules
pub mod address;
pub mod config;
pub mod confirmation;
pub mod controller;
pub mod digest;
pub mod error;
pub mod explorer;
pub mod functions;
pub mod mint;
pub mod node;
pub mod session;
pub mod transaction;

// Re-exports for convenience
pub use address::Address;
pub use config::AlgoXzenConfig;
pub use confirmation::{wait_for_confirmation, CancelHandle, CancelSignal};
pub use controller::{MintController, Notice, NoticeLevel, SelectedFile};
pub use digest::FileDigest;
pub use error::{AlgoXzenError, ErrorCategory};
pub use explorer::{summaries_to_csv, ExplorerLinks, IndexerClient, SearchQuery, TransactionSummary};
pub use functions::{
    AuditFinding, AuditReport, DebugReport, FunctionReply, FunctionsClient, GeneratedContract,
    MintNftRequest, MintNftResponse,
};
pub use mint::{AnchorResult, MintFlow, MintRequest, MintResult};
pub use node::{AlgodClient, NodeClient, NodeStatus, PendingTransactionInfo};
pub use session::{ConnectorError, SessionHandle, SessionManager, WalletConnector, WalletSession};
pub use transaction::{
    AssetParams, GroupId, SignedTransaction, SuggestedParams, Transaction, TransactionGroup,
    TransactionId, TransactionKind,
};

// Common result type
pub type Result<T> = std::result::Result<T, AlgoXzenError>;
