/// algod Mock Server Library
///
/// This crate provides both a standalone binary and library components
/// for an in-memory Algorand node: enough of the algod v2 API to submit
/// groups and wait for confirmation, plus a devnet helper to advance rounds.

pub mod config;
pub mod handlers;
pub mod ledger;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use config::MockConfig;
pub use ledger::{LedgerError, MockLedger};
pub use server::{create_router, run_server, serve, MockNode};
pub use types::*;
