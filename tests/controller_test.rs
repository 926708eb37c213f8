//! Verify/Mint Page Controller Tests
//!
//! Every user action must end in exactly one notice; these tests drive the
//! controller through file selection, validation failures, a full mint
//! against the algod mock and the single-flight guard.
//!
//! Run with: cargo test --test controller_test -- --nocapture

mod common;

use algoxzen::{
    AlgodClient, CancelHandle, CancelSignal, ExplorerLinks, MintController, MintFlow, NodeClient,
    NoticeLevel, SessionHandle, SessionManager,
};
use common::{
    config_for, connected_session, init_logging, spawn_mock_node, CountingNode, ScriptedConnector,
    StallingNode, ALICE,
};
use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;

const HELLO_DIGEST: &str = "d49fd1eedc040230e4956506575c8f4a82ed879eea7704adc8d22fde59145a10";

fn controller(node: Arc<dyn NodeClient>, session: SessionHandle) -> MintController {
    let flow = Arc::new(MintFlow::new(node, session.clone(), Default::default()));
    MintController::new(flow, session, ExplorerLinks::new("https://explorer.test/"))
}

#[tokio::test]
async fn test_select_file_reports_digest() {
    init_logging();
    let session = SessionManager::spawn(ScriptedConnector::new(&[ALICE]));
    let page = controller(Arc::new(CountingNode::default()), session);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"hello9000x").unwrap();

    let notice = page.select_file(file.path()).await;
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(notice.title, "File Uploaded");
    assert_eq!(notice.description, format!("Hash: SHA256:{}", HELLO_DIGEST));

    let selected = page.selected_file().unwrap();
    assert_eq!(selected.digest.hex(), HELLO_DIGEST);
    assert!(!page.can_mint());

    page.set_title("Doc1");
    assert!(page.can_mint());
}

#[tokio::test]
async fn test_unreadable_file_clears_selection() {
    init_logging();
    let session = SessionManager::spawn(ScriptedConnector::new(&[ALICE]));
    let page = controller(Arc::new(CountingNode::default()), session);

    page.select_bytes("a.txt", b"first");
    let dir = tempfile::tempdir().unwrap();
    let notice = page.select_file(dir.path().join("missing.pdf")).await;
    assert!(notice.is_error());
    assert_eq!(notice.description, "Failed to process file");
    assert!(page.selected_file().is_none());
}

#[tokio::test]
async fn test_mint_without_wallet_makes_no_calls() {
    init_logging();
    let node = Arc::new(CountingNode::default());
    let session = SessionManager::spawn(ScriptedConnector::new(&[ALICE]));
    let page = controller(node.clone(), session);

    page.select_bytes("doc.txt", b"hello9000x");
    page.set_title("Doc1");
    let notice = page.mint(CancelSignal::never()).await;

    assert!(notice.is_error());
    assert_eq!(notice.title, "Wallet Not Connected");
    assert_eq!(notice.description, "Please connect your wallet first");
    assert_eq!(node.calls.load(Ordering::SeqCst), 0);
    assert!(page.last_mint().is_none());
}

#[tokio::test]
async fn test_mint_requires_title_and_file() {
    init_logging();
    let node = Arc::new(CountingNode::default());
    let session = connected_session(ScriptedConnector::new(&[ALICE])).await;
    let page = controller(node.clone(), session);

    let notice = page.mint(CancelSignal::never()).await;
    assert_eq!(notice.title, "Missing Information");
    assert_eq!(notice.description, "Please upload a file first");

    page.select_bytes("doc.txt", b"hello9000x");
    page.set_title("  ");
    let notice = page.mint(CancelSignal::never()).await;
    assert_eq!(notice.title, "Missing Information");
    assert_eq!(notice.description, "Please enter a title for your NFT");

    assert_eq!(node.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_mint_success_links_asset() {
    init_logging();
    if !common::can_bind_localhost() {
        return;
    }
    let node = spawn_mock_node(true).await.unwrap();
    let session = connected_session(ScriptedConnector::new(&[ALICE])).await;
    let flow = Arc::new(MintFlow::new(
        Arc::new(AlgodClient::new(node.url(), None)),
        session.clone(),
        config_for(&node, 10),
    ));
    let page = MintController::new(flow, session, ExplorerLinks::new("https://explorer.test"));

    page.select_bytes("doc.txt", b"hello9000x");
    page.set_title("Doc1");
    page.set_description("Signed lease");
    let notice = page.mint(CancelSignal::never()).await;

    assert_eq!(notice.level, NoticeLevel::Success, "{:?}", notice);
    assert_eq!(notice.title, "NFT Minted!");
    assert!(notice.description.contains("https://explorer.test/asset/1001"));
    assert_eq!(page.last_mint().unwrap().asset_id, Some(1001));

    // a new file clears the previous result
    page.select_bytes("other.txt", b"other");
    assert!(page.last_mint().is_none());
}

#[tokio::test]
async fn test_verify_anchors_selected_file() {
    init_logging();
    if !common::can_bind_localhost() {
        return;
    }
    let node = spawn_mock_node(true).await.unwrap();
    let connector = ScriptedConnector::new(&[ALICE]);
    let session = connected_session(connector.clone()).await;
    let flow = Arc::new(MintFlow::new(
        Arc::new(AlgodClient::new(node.url(), None)),
        session.clone(),
        config_for(&node, 10),
    ));
    let page = MintController::new(flow, session, ExplorerLinks::new("https://explorer.test"));

    let notice = page.verify(CancelSignal::never()).await;
    assert_eq!(notice.title, "Missing Information");

    page.select_bytes("doc.txt", b"hello9000x");
    let notice = page.verify(CancelSignal::never()).await;
    assert_eq!(notice.title, "Document Verified!");

    let verification = page.last_verification().unwrap();
    assert!(notice
        .description
        .ends_with(&format!("/tx/{}", verification.transaction_id)));

    let signed = connector.signed_transactions();
    let note: serde_json::Value =
        serde_json::from_slice(signed[0].note.as_ref().unwrap()).unwrap();
    assert_eq!(note["type"], "verification");
    assert_eq!(note["url"], format!("ipfs://algoxzen/{}", HELLO_DIGEST));
}

#[tokio::test]
async fn test_second_mint_while_running_is_refused() {
    init_logging();
    if !common::can_bind_localhost() {
        return;
    }
    let node = spawn_mock_node(true).await.unwrap();
    let session = connected_session(ScriptedConnector::new(&[ALICE])).await;
    let flow = Arc::new(MintFlow::new(
        Arc::new(StallingNode {
            inner: AlgodClient::new(node.url(), None),
        }),
        session.clone(),
        config_for(&node, 10),
    ));
    let page = Arc::new(MintController::new(
        flow,
        session,
        ExplorerLinks::new("https://explorer.test"),
    ));
    page.select_bytes("doc.txt", b"hello9000x");
    page.set_title("Doc1");

    let (handle, signal) = CancelHandle::new();
    let first = {
        let page = page.clone();
        tokio::spawn(async move { page.mint(signal).await })
    };
    assert!(common::eventually(|| node.ledger().pending_count() == 2).await);
    assert!(!page.can_mint());

    let notice = page.mint(CancelSignal::never()).await;
    assert_eq!(notice.title, "Please Wait");
    assert_eq!(node.ledger().pending_count(), 2);

    handle.cancel();
    let notice = first.await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Info);
    assert_eq!(notice.title, "Request Cancelled");
    assert!(page.can_mint());
}

#[tokio::test]
async fn test_wallet_notices() {
    init_logging();
    let connector = ScriptedConnector::new(&[ALICE]);
    let session = SessionManager::spawn(connector.clone());
    let page = controller(Arc::new(CountingNode::default()), session);

    let notice = page.connect_wallet().await;
    assert_eq!(notice.title, "Wallet Connected");
    assert_eq!(notice.description, "Connected to AAAAAA...HFKQ");

    let notice = page.disconnect_wallet().await;
    assert_eq!(notice.level, NoticeLevel::Info);
    assert_eq!(notice.title, "Wallet Disconnected");

    connector.reject_connect(true);
    let notice = page.connect_wallet().await;
    assert_eq!(notice.level, NoticeLevel::Info);
    assert_eq!(notice.title, "Request Cancelled");
}
