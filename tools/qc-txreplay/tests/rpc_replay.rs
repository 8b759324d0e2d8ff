//! RPC-mode replay against an in-process JSON-RPC node.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use qc_txreplay::adapters::{JsonRpcClient, RemoteDispatcher};
use qc_txreplay::domain::ExportWriter;
use qc_txreplay::error::RpcError;
use qc_txreplay::ports::{BlockRef, RemoteSubmitter};
use qc_txreplay::{PoolConfig, ReplayDriver, RpcConfig};
use shared_types::Transaction;

#[derive(Default)]
struct MockNode {
    block_count: u32,
    rejected: HashSet<String>,
    received: Mutex<Vec<Value>>,
}

async fn handle(State(node): State<Arc<MockNode>>, Json(request): Json<Value>) -> Json<Value> {
    node.received.lock().push(request.clone());
    let params = request["params"].as_array().cloned().unwrap_or_default();

    let response = match request["method"].as_str() {
        Some("getblockcount") => json!({"error": 0, "desc": "SUCCESS", "result": node.block_count}),
        Some("getblock") => match params.first() {
            Some(Value::Number(_)) => json!({"error": 0, "desc": "SUCCESS", "result": "c0ffee"}),
            _ => json!({"error": 44001, "desc": "unknown block", "result": ""}),
        },
        Some("sendrawtransaction") => {
            let raw = params.first().and_then(Value::as_str).unwrap_or_default();
            if node.rejected.contains(raw) {
                json!({"error": 43001, "desc": "duplicated tx", "result": ""})
            } else {
                json!({"error": 0, "desc": "SUCCESS", "result": "ok"})
            }
        }
        _ => json!({"error": 42001, "desc": "method not found", "result": ""}),
    };
    Json(response)
}

async fn spawn_node(node: Arc<MockNode>) -> SocketAddr {
    let app = Router::new().route("/", post(handle)).with_state(node);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr) -> JsonRpcClient {
    let config = RpcConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        ..Default::default()
    };
    JsonRpcClient::new(&config).unwrap()
}

fn tx(nonce: u64) -> Transaction {
    Transaction {
        version: 0,
        nonce,
        payer: [5; 20],
        payload: format!("transfer #{nonce}").into_bytes(),
        signature: vec![0xab; 64],
    }
}

#[tokio::test]
async fn test_client_methods() {
    let node = Arc::new(MockNode {
        block_count: 17,
        ..Default::default()
    });
    let client = client_for(spawn_node(node.clone()).await);

    assert_eq!(client.count().await.unwrap(), 17);
    assert_eq!(
        client.fetch_block(BlockRef::Height(3)).await.unwrap(),
        vec![0xc0, 0xff, 0xee]
    );
    assert!(matches!(
        client.fetch_block(BlockRef::Hash([1; 32])).await,
        Err(RpcError::Remote { code: 44001, .. })
    ));
    client.submit("00ff").await.unwrap();

    let received = node.received.lock();
    assert_eq!(received.len(), 4);
    assert_eq!(received[0]["jsonrpc"], "2.0");
    assert_eq!(received[0]["id"], "cli");
    assert_eq!(received[3]["method"], "sendrawtransaction");
    assert_eq!(received[3]["params"], json!(["00ff"]));
}

#[tokio::test]
async fn test_unreachable_node() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(addr);
    assert!(client.submit("00").await.is_err());
}

#[tokio::test]
async fn test_replay_counts_rejections() {
    let transactions: Vec<Transaction> = (0..6).map(tx).collect();
    let rejected_raw = transactions[4].encode_hex().unwrap();

    let node = Arc::new(MockNode {
        block_count: 1,
        rejected: HashSet::from([rejected_raw.clone()]),
        ..Default::default()
    });
    let submitter: Arc<dyn RemoteSubmitter> = Arc::new(client_for(spawn_node(node.clone()).await));

    let mut writer = ExportWriter::new(Vec::new());
    writer.write_section(10, &transactions[..2]).unwrap();
    writer.write_section(11, &[]).unwrap();
    writer.write_section(12, &transactions[2..]).unwrap();
    let input = writer.finish().unwrap();

    let pool = PoolConfig {
        workers: 3,
        ..Default::default()
    };
    let dispatcher = RemoteDispatcher::start(&pool, Duration::ZERO, submitter)
        .await
        .unwrap();
    let mut driver = ReplayDriver::new(dispatcher, Duration::ZERO);
    let summary = driver.run(input.as_slice()).await.unwrap();

    assert_eq!(summary.sections, 3);
    assert_eq!(summary.transactions_read, 6);
    assert_eq!(summary.sent_or_packed, 5);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.blocks_committed, 0);
    assert_eq!(summary.final_height, None);

    let submitted: HashSet<String> = node
        .received
        .lock()
        .iter()
        .filter(|r| r["method"] == "sendrawtransaction")
        .filter_map(|r| r["params"][0].as_str().map(str::to_string))
        .collect();
    assert_eq!(submitted.len(), 6);
    assert!(submitted.contains(&rejected_raw));
}
