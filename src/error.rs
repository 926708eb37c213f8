//! Error types for AlgoXzen operations
//!
//! One error enum covers the wallet session, the node client and the
//! mint/anchor flows. `ErrorCategory` groups variants the way they are
//! reported to a user.

use thiserror::Error;

/// Core error type for AlgoXzen operations
#[derive(Error, Debug)]
pub enum AlgoXzenError {
    /// The user declined a connect or sign request in their wallet
    #[error("Request rejected in wallet: {0}")]
    UserRejected(String),

    /// No wallet account is connected
    #[error("Please connect your wallet first")]
    WalletNotConnected,

    /// Input failed validation before any network call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Wallet connector failed for a reason other than user rejection
    #[error("Wallet connector error: {0}")]
    Connector(String),

    /// Session manager task is no longer running
    #[error("Wallet session manager stopped")]
    SessionClosed,

    /// Node, indexer or function endpoint could not be reached or returned an error status
    #[error("Network error: {0}")]
    Network(String),

    /// Response body could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Node refused the transaction from its pool
    #[error("Transaction rejected: txid={txid}, reason={reason}")]
    TransactionRejected { txid: String, reason: String },

    /// Transaction was not confirmed within the round ceiling
    #[error("Transaction {txid} not confirmed after {rounds} rounds")]
    ConfirmationTimeout { txid: String, rounds: u64 },

    /// Flow was abandoned through its cancellation signal
    #[error("Operation cancelled")]
    Cancelled,

    /// An operation of the same kind is already running
    #[error("Operation already in progress: {0}")]
    Busy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transaction bytes could not be encoded or decoded as msgpack
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// User-facing grouping of errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Wallet rejected connect/sign; expected and non-fatal
    UserCancellation,
    /// Missing file, title, wallet and similar; caught before the network
    Validation,
    /// Node, submission or confirmation failures
    Network,
    /// Everything else
    Unexpected,
}

impl AlgoXzenError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UserRejected(_) | Self::Cancelled => ErrorCategory::UserCancellation,
            Self::WalletNotConnected | Self::InvalidInput(_) | Self::Busy(_) => {
                ErrorCategory::Validation
            }
            Self::Network(_)
            | Self::InvalidResponse(_)
            | Self::TransactionRejected { .. }
            | Self::ConfirmationTimeout { .. } => ErrorCategory::Network,
            Self::Connector(_)
            | Self::SessionClosed
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Encoding(_)
            | Self::Internal(_) => ErrorCategory::Unexpected,
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }
}

impl From<reqwest::Error> for AlgoXzenError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<rmp_serde::encode::Error> for AlgoXzenError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for AlgoXzenError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<base64::DecodeError> for AlgoXzenError {
    fn from(err: base64::DecodeError) -> Self {
        Self::InvalidResponse(format!("base64: {}", err))
    }
}
