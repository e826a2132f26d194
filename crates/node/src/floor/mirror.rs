// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The read-only mirror board: every floor's hall lamps on one panel.
//!
//! A display-only node. Each round it asks every floor panel for its
//! pending calls and copies them onto its own lamps; a floor that does
//! not answer keeps its last shown state until the next round.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use lift_core::{Config, ConfigError};
use lift_driver::{ButtonKind, Driver};
use lift_txn::{Module, StateCell, TransactionManager, TxnId};
use lift_wire::FLOOR_GET_ALL_REQUESTS;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::net::Network;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct MirrorState {}

pub struct MirrorPanel {
    cell: StateCell<MirrorState>,
    txm: Arc<TransactionManager>,
    net: Arc<Network>,
    driver: Arc<Driver>,
    period: Duration,
    floor_addrs: Vec<SocketAddr>,
    me: Weak<Self>,
    started: AtomicBool,
}

impl MirrorPanel {
    pub fn new(
        config: &Config,
        txm: Arc<TransactionManager>,
        net: Arc<Network>,
        driver: Arc<Driver>,
    ) -> Result<Arc<Self>, ConfigError> {
        let period = config.get_duration("floor", "readonly_period")?;
        let floor_count = config.get_usize("core", "floor_number")?;
        let floor_addrs = (0..floor_count)
            .map(|index| config.peer_addr(&format!("floor_{index}")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Arc::new_cyclic(|me| Self {
            cell: StateCell::new("floor_readonly", Arc::clone(&txm), MirrorState::default()),
            txm,
            net,
            driver,
            period,
            floor_addrs,
            me: me.clone(),
            started: AtomicBool::new(false),
        }))
    }

    async fn show_lamps(self: Arc<Self>) {
        loop {
            let tid = self.txm.start().await;

            for (floor, addr) in self.floor_addrs.iter().enumerate() {
                let reply = self
                    .net
                    .send_packet(*addr, FLOOR_GET_ALL_REQUESTS, serde_json::Value::Bool(true))
                    .await;

                let calls: (bool, bool) = match reply.map(serde_json::from_value) {
                    Ok(Ok(calls)) => calls,
                    _ => {
                        debug!(floor, "no answer from floor panel");
                        continue;
                    }
                };

                // Display only: written straight through, nothing to
                // roll back.
                let (up, down) = calls;
                if let Err(err) = self.driver.set_button_lamp(ButtonKind::CallUp, floor, up).await
                {
                    debug!(floor, %err, "lamp write failed");
                }
                if let Err(err) =
                    self.driver.set_button_lamp(ButtonKind::CallDown, floor, down).await
                {
                    debug!(floor, %err, "lamp write failed");
                }
            }

            self.txm.finish(tid).await;
            tokio::time::sleep(self.period).await;
        }
    }
}

lift_txn::impl_resource!(MirrorPanel, cell);

#[async_trait]
impl Module for MirrorPanel {
    fn name(&self) -> &'static str {
        "floor_readonly"
    }

    async fn start(&self, tid: TxnId) {
        self.cell.read(tid, |_| ());
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(me) = self.me.upgrade() {
            tokio::spawn(me.show_lamps());
        }
    }

    fn export_state(&self, tid: TxnId) -> serde_json::Value {
        self.cell.export(tid)
    }

    fn import_state(&self, tid: TxnId, state: serde_json::Value) {
        self.cell.import(tid, state);
    }
}

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod tests;
