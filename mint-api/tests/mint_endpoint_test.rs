/// Endpoint tests for POST /functions/v1/mint-nft
///
/// Requests go through the router with `tower::ServiceExt::oneshot`; the
/// node behind the endpoint is the in-process algod mock.
use algod_mock::{MockConfig, MockNode};
use algoxzen::transaction::{Transaction, TransactionKind};
use algoxzen::AlgodClient;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use mint_api::api::server::{cors_layer, create_router};
use mint_api::minter::{Minter, READY_MESSAGE, UNIT_NAME};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const ALICE: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn app_for(node_url: &str) -> Router {
    let node = Arc::new(AlgodClient::new(node_url, None));
    let minter = Arc::new(Minter::new(node, "https://algoxzen.com"));
    create_router(minter, cors_layer(&[]))
}

async fn post_mint(app: Router, body: Value) -> (StatusCode, Value) {
    let resp = app
        .oneshot(
            Request::post("/functions/v1/mint-nft")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn file_hash() -> String {
    "0123456789abcdef".repeat(4)
}

#[tokio::test]
async fn test_builds_unsigned_asset_create() {
    init_logging();
    if !can_bind_localhost() {
        return;
    }
    let node = MockNode::spawn(MockConfig::default()).await.unwrap();

    let (status, body) = post_mint(
        app_for(&node.url()),
        json!({
            "accountAddress": ALICE,
            "title": "Doc1",
            "description": "A document",
            "fileHash": file_hash(),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], READY_MESSAGE);

    let txn = Transaction::decode_base64(body["transaction"].as_str().unwrap()).unwrap();
    assert_eq!(txn.sender.as_str(), ALICE);
    assert!(txn.group.is_none());
    assert_eq!(txn.first_valid, 1000);
    assert_eq!(txn.last_valid, 2000);
    assert_eq!(txn.note.as_deref(), Some(&b"AlgoXzen Verified: Doc1"[..]));

    match txn.kind {
        TransactionKind::AssetCreate { params } => {
            assert_eq!(params.total, 1);
            assert_eq!(params.decimals, 0);
            assert_eq!(params.unit_name, UNIT_NAME);
            assert_eq!(params.asset_name, "Doc1");
            assert_eq!(params.url, format!("https://algoxzen.com/{}", file_hash()));
            assert_eq!(params.metadata_hash, file_hash().as_bytes()[..32].to_vec());
            assert_eq!(params.manager.as_str(), ALICE);
            assert_eq!(params.clawback.as_str(), ALICE);
        }
        other => panic!("expected asset create, got {:?}", other),
    }
}

#[tokio::test]
async fn test_truncates_title_and_prefers_ipfs_url() {
    init_logging();
    if !can_bind_localhost() {
        return;
    }
    let node = MockNode::spawn(MockConfig::default()).await.unwrap();

    let (status, body) = post_mint(
        app_for(&node.url()),
        json!({
            "accountAddress": ALICE,
            "title": "T".repeat(50),
            "description": "",
            "fileHash": file_hash(),
            "ipfsUrl": "ipfs://bafy-doc",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let txn = Transaction::decode_base64(body["transaction"].as_str().unwrap()).unwrap();
    let TransactionKind::AssetCreate { params } = txn.kind else {
        panic!("expected asset create");
    };
    assert_eq!(params.asset_name.len(), 32);
    assert_eq!(params.url, "ipfs://bafy-doc");
}

#[tokio::test]
async fn test_bad_address_is_400() {
    init_logging();
    // validation fails before the node is contacted
    let (status, body) = post_mint(
        app_for("http://127.0.0.1:9"),
        json!({
            "accountAddress": "not-an-address",
            "title": "Doc1",
            "fileHash": file_hash(),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid account address");
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    init_logging();
    let (status, body) = post_mint(app_for("http://127.0.0.1:9"), json!({"title": 5})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_node_failure_is_500() {
    init_logging();
    if !can_bind_localhost() {
        return;
    }
    // bind then drop to get a port with nothing listening
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let (status, body) = post_mint(
        app_for(&format!("http://127.0.0.1:{}", port)),
        json!({
            "accountAddress": ALICE,
            "title": "Doc1",
            "fileHash": file_hash(),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Node error"));
}

#[tokio::test]
async fn test_health() {
    let resp = app_for("http://127.0.0.1:9")
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
