// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lift_txn::{Module, StateCell, TransactionManager, TxnId};
use serde::{Deserialize, Serialize};

use super::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EchoState {
    seen: u32,
}

/// Test module: counts packets, echoes the payload back, refuses when
/// the payload says so.
struct EchoModule {
    cell: StateCell<EchoState>,
}

impl EchoModule {
    fn new(txm: Arc<TransactionManager>) -> Arc<Self> {
        Arc::new(Self { cell: StateCell::new("echo", txm, EchoState::default()) })
    }
}

lift_txn::impl_resource!(EchoModule, cell);

#[async_trait]
impl PacketHandler for EchoModule {
    async fn handle(
        &self,
        tid: TxnId,
        _kind: &str,
        _src: std::net::SocketAddr,
        data: serde_json::Value,
    ) -> serde_json::Value {
        self.cell.with(tid, |state| state.seen += 1);
        if data.get("refuse").is_some() {
            self.cell.set_can_commit(tid, false);
        }
        data
    }
}

fn config(port: u16) -> lift_core::Config {
    let text = format!(
        "[network]\nport = {port}\ntimeout = 0.2\nbuffer_size = 1024\n"
    );
    lift_core::Config::from_table(text.parse().unwrap(), "test_node")
}

async fn started_network(txm: &Arc<TransactionManager>) -> Arc<Network> {
    // Port 0: the OS picks a free port, local_addr reports it.
    let net = Arc::new(Network::new(&config(0), Arc::clone(txm)).unwrap());
    let tid = txm.start().await;
    net.start(tid).await;
    txm.finish(tid).await;
    net
}

#[tokio::test]
async fn request_reply_roundtrip() {
    let txm = Arc::new(TransactionManager::new());
    let echo = EchoModule::new(Arc::clone(&txm));
    txm.register(&echo);

    let net = started_network(&txm).await;
    net.add_packet_handler("echo", &echo);
    let addr = net.local_addr().unwrap();

    let reply = net
        .send_packet(addr, "echo", serde_json::json!({"floor": 2}))
        .await
        .unwrap();

    assert_eq!(reply, serde_json::json!({"floor": 2}));
    assert_eq!(echo.cell.peek(|s| s.seen), 1);
}

#[tokio::test]
async fn aborted_transaction_replies_false_and_rolls_back() {
    let txm = Arc::new(TransactionManager::new());
    let echo = EchoModule::new(Arc::clone(&txm));
    txm.register(&echo);

    let net = started_network(&txm).await;
    net.add_packet_handler("echo", &echo);
    let addr = net.local_addr().unwrap();

    let reply = net
        .send_packet(addr, "echo", serde_json::json!({"refuse": true}))
        .await
        .unwrap();

    assert_eq!(reply, serde_json::Value::Bool(false));
    // The counter increment was rolled back with the abort.
    assert_eq!(echo.cell.peek(|s| s.seen), 0);
}

#[tokio::test]
async fn unknown_packet_type_times_out() {
    let txm = Arc::new(TransactionManager::new());
    let net = started_network(&txm).await;
    let addr = net.local_addr().unwrap();

    let err = net.send_packet(addr, "no_such_type", serde_json::json!(true)).await;
    assert!(matches!(err, Err(NetError::Timeout)));
}

#[tokio::test]
async fn unreachable_peer_times_out() {
    let txm = Arc::new(TransactionManager::new());
    let net = Arc::new(Network::new(&config(0), Arc::clone(&txm)).unwrap());

    // Nothing listens on this port.
    let dead: std::net::SocketAddr = "127.0.0.1:9".parse().unwrap();
    let started = std::time::Instant::now();
    let err = net.send_packet(dead, "echo", serde_json::json!(true)).await;

    assert!(matches!(err, Err(NetError::Timeout)));
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn dropped_handler_means_unknown_packet() {
    let txm = Arc::new(TransactionManager::new());
    let echo = EchoModule::new(Arc::clone(&txm));

    let net = started_network(&txm).await;
    net.add_packet_handler("echo", &echo);
    let addr = net.local_addr().unwrap();
    drop(echo);

    let err = net.send_packet(addr, "echo", serde_json::json!(true)).await;
    assert!(matches!(err, Err(NetError::Timeout)));
}
