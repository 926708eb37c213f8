//! Page controller for the verify/mint screen
//!
//! Holds what the user has entered so far and turns every flow outcome,
//! success or failure, into a `Notice`. Errors never escape this layer.

use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::confirmation::CancelSignal;
use crate::digest::FileDigest;
use crate::error::ErrorCategory;
use crate::explorer::ExplorerLinks;
use crate::mint::{AnchorResult, MintFlow, MintRequest, MintResult};
use crate::session::SessionHandle;
use crate::AlgoXzenError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// User-facing notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }

    /// Map an error to its notice by category
    pub fn from_error(err: &AlgoXzenError) -> Self {
        match (err, err.category()) {
            (AlgoXzenError::WalletNotConnected, _) => {
                Self::error("Wallet Not Connected", err.to_string())
            }
            (AlgoXzenError::Busy(_), _) => Self::error("Please Wait", err.to_string()),
            (AlgoXzenError::InvalidInput(msg), _) => Self::error("Missing Information", msg.clone()),
            (_, ErrorCategory::UserCancellation) => Self::info("Request Cancelled", err.to_string()),
            (_, ErrorCategory::Validation) => Self::error("Missing Information", err.to_string()),
            (_, ErrorCategory::Network) => Self::error("Transaction Failed", err.to_string()),
            (_, ErrorCategory::Unexpected) => {
                log::error!("Unexpected failure: {}", err);
                Self::error("Error", "Something went wrong. Please try again.")
            }
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// The file the user picked
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub digest: FileDigest,
}

#[derive(Default)]
struct PageState {
    file: Option<SelectedFile>,
    title: String,
    description: String,
    last_mint: Option<MintResult>,
    last_verification: Option<AnchorResult>,
}

/// Clears the in-flight flag when the flow finishes
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct MintController {
    flow: Arc<MintFlow>,
    session: SessionHandle,
    links: ExplorerLinks,
    state: Mutex<PageState>,
    busy: AtomicBool,
}

impl MintController {
    pub fn new(flow: Arc<MintFlow>, session: SessionHandle, links: ExplorerLinks) -> Self {
        Self {
            flow,
            session,
            links,
            state: Mutex::new(PageState::default()),
            busy: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, PageState> {
        // state holds plain values; a poisoned lock still has consistent data
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, what: &str) -> Result<BusyGuard<'_>, AlgoXzenError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| BusyGuard(&self.busy))
            .map_err(|_| AlgoXzenError::Busy(format!("{} is already running", what)))
    }

    /// Digest the file at `path`; replaces any previous file and results
    pub async fn select_file(&self, path: impl AsRef<Path>) -> Notice {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match FileDigest::from_path(path).await {
            Ok(digest) => self.accept_file(name, digest),
            Err(e) => {
                log::warn!("File selection failed: {}", e);
                let mut state = self.state();
                state.file = None;
                state.last_mint = None;
                state.last_verification = None;
                Notice::error("Error", "Failed to process file")
            }
        }
    }

    /// Same as `select_file` for content already in memory
    pub fn select_bytes(&self, name: impl Into<String>, content: &[u8]) -> Notice {
        self.accept_file(name.into(), FileDigest::from_bytes(content))
    }

    fn accept_file(&self, name: String, digest: FileDigest) -> Notice {
        let notice = Notice::success(
            "File Uploaded",
            format!("Hash: {}", digest.tagged()),
        );
        let mut state = self.state();
        state.file = Some(SelectedFile { name, digest });
        state.last_mint = None;
        state.last_verification = None;
        notice
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.state().title = title.into();
    }

    pub fn set_description(&self, description: impl Into<String>) {
        self.state().description = description.into();
    }

    pub fn selected_file(&self) -> Option<SelectedFile> {
        self.state().file.clone()
    }

    pub fn last_mint(&self) -> Option<MintResult> {
        self.state().last_mint.clone()
    }

    pub fn last_verification(&self) -> Option<AnchorResult> {
        self.state().last_verification.clone()
    }

    /// Whether the mint action should be enabled
    pub fn can_mint(&self) -> bool {
        let state = self.state();
        state.file.is_some() && !state.title.trim().is_empty() && !self.busy.load(Ordering::Acquire)
    }

    fn mint_request(&self) -> Result<MintRequest, AlgoXzenError> {
        let state = self.state();
        let file = state
            .file
            .as_ref()
            .ok_or_else(|| AlgoXzenError::invalid_input("Please upload a file first"))?;
        Ok(MintRequest {
            title: state.title.clone(),
            description: state.description.clone(),
            file_name: file.name.clone(),
            digest: file.digest.clone(),
        })
    }

    pub async fn mint(&self, cancel: CancelSignal) -> Notice {
        let _guard = match self.begin("Minting") {
            Ok(guard) => guard,
            Err(e) => return Notice::from_error(&e),
        };

        let request = match self.mint_request() {
            Ok(request) => request,
            Err(e) => return Notice::from_error(&e),
        };

        match self.flow.mint(&request, cancel).await {
            Ok(result) => {
                let description = match result.asset_id {
                    Some(id) => format!(
                        "Asset ID: {}. View: {}",
                        id,
                        self.links.asset(id)
                    ),
                    None => format!(
                        "Transaction: {}",
                        self.links.transaction(result.transaction_id.as_str())
                    ),
                };
                self.state().last_mint = Some(result);
                Notice::success("NFT Minted!", description)
            }
            Err(e) => {
                log::warn!("Mint failed: {}", e);
                Notice::from_error(&e)
            }
        }
    }

    /// Anchor the selected file's digest on chain
    pub async fn verify(&self, cancel: CancelSignal) -> Notice {
        let _guard = match self.begin("Verification") {
            Ok(guard) => guard,
            Err(e) => return Notice::from_error(&e),
        };

        let digest = match self.state().file.as_ref() {
            Some(file) => file.digest.clone(),
            None => {
                return Notice::from_error(&AlgoXzenError::invalid_input(
                    "Please upload a file and connect wallet",
                ))
            }
        };
        let url = format!("ipfs://algoxzen/{}", digest.hex());

        match self.flow.verify_document(&digest, &url, cancel).await {
            Ok(result) => {
                let description = format!(
                    "Transaction: {}",
                    self.links.transaction(result.transaction_id.as_str())
                );
                self.state().last_verification = Some(result);
                Notice::success("Document Verified!", description)
            }
            Err(e) => {
                log::warn!("Verification failed: {}", e);
                Notice::from_error(&e)
            }
        }
    }

    pub async fn connect_wallet(&self) -> Notice {
        match self.session.connect().await {
            Ok(session) => {
                let short = session.address().map(|a| a.short()).unwrap_or_default();
                Notice::success("Wallet Connected", format!("Connected to {}", short))
            }
            Err(e) => Notice::from_error(&e),
        }
    }

    pub async fn disconnect_wallet(&self) -> Notice {
        self.session.disconnect().await;
        Notice::info("Wallet Disconnected", "Your wallet has been disconnected")
    }
}
