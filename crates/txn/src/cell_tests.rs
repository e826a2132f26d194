// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::*;
use crate::TransactionManager;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Lamp {
    lit: bool,
}

fn cell() -> (Arc<TransactionManager>, StateCell<Lamp>) {
    let txm = Arc::new(TransactionManager::new());
    let cell = StateCell::new("lamp", Arc::clone(&txm), Lamp::default());
    (txm, cell)
}

#[tokio::test]
async fn abort_restores_join_time_snapshot() {
    let (txm, cell) = cell();

    let tid = txm.start().await;
    cell.with(tid, |lamp| lamp.lit = true);
    assert!(cell.peek(|lamp| lamp.lit));

    cell.abort(tid);
    assert!(!cell.peek(|lamp| lamp.lit));
    txm.finish(tid).await;
}

#[tokio::test]
async fn commit_keeps_mutation() {
    let (txm, cell) = cell();

    let tid = txm.start().await;
    cell.with(tid, |lamp| lamp.lit = true);
    cell.commit(tid);
    assert!(cell.peek(|lamp| lamp.lit));
    txm.finish(tid).await;
}

#[tokio::test]
async fn can_commit_defaults_true_and_sticks() {
    let (txm, cell) = cell();

    let tid = txm.start().await;
    assert!(cell.can_commit(tid));
    cell.set_can_commit(tid, false);
    assert!(!cell.can_commit(tid));
    txm.finish(tid).await;
}

#[tokio::test]
async fn read_joins_so_snapshot_is_first_touch() {
    let (txm, cell) = cell();

    let tid = txm.start().await;
    let lit = cell.read(tid, |lamp| lamp.lit);
    assert!(!lit);
    cell.with(tid, |lamp| lamp.lit = true);
    cell.abort(tid);
    assert!(!cell.peek(|lamp| lamp.lit));
    txm.finish(tid).await;
}

#[tokio::test]
async fn malformed_import_leaves_state_alone() {
    let (txm, cell) = cell();

    let tid = txm.start().await;
    cell.with(tid, |lamp| lamp.lit = true);
    cell.import(tid, serde_json::json!({"lit": "not-a-bool"}));
    assert!(cell.read(tid, |lamp| lamp.lit));
    txm.finish(tid).await;
}

#[tokio::test]
async fn import_is_transactional() {
    let (txm, cell) = cell();

    let tid = txm.start().await;
    cell.import(tid, serde_json::json!({"lit": true}));
    cell.abort(tid);
    assert!(!cell.peek(|lamp| lamp.lit));
    txm.finish(tid).await;
}
