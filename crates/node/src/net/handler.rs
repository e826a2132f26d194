// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::net::SocketAddr;

use async_trait::async_trait;
use lift_txn::TxnId;

/// A module's entry point for inbound packets.
///
/// Handlers run inside the per-packet transaction the server opened.
/// The returned JSON value is the reply; return `false` (or doom the
/// transaction via the module's cell) to signal refusal — an aborted
/// transaction forces the reply to `false` regardless of what the
/// handler returned.
#[async_trait]
pub trait PacketHandler: Send + Sync {
    async fn handle(
        &self,
        tid: TxnId,
        kind: &str,
        src: SocketAddr,
        data: serde_json::Value,
    ) -> serde_json::Value;
}
