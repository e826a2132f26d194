// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cabin's request ledger.
//!
//! Owns the cabin bits and mirrors the hall bits that floor panels have
//! delegated to this elevator. Serving a floor clears the bits, clears
//! the cabin lamp and tells the owning floor panel.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use lift_core::{Config, ConfigError, Direction, Floor, RequestRow};
use lift_txn::{StateCell, TransactionManager, TxnId};
use lift_wire::{ElevRequestAdd, FloorRequestServed, FLOOR_REQUEST_SERVED};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::elevator::CabinPanel;
use crate::net::{Network, PacketHandler};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerState {
    pub floors: Vec<RequestRow>,
}

pub struct RequestManager {
    cell: StateCell<LedgerState>,
    net: Arc<Network>,
    /// Back-capability to the cabin panel, installed by the composer.
    panel: OnceLock<Weak<CabinPanel>>,
    elevator_index: usize,
    floor_addrs: Vec<SocketAddr>,
}

impl RequestManager {
    pub fn new(
        config: &Config,
        txm: Arc<TransactionManager>,
        net: Arc<Network>,
    ) -> Result<Arc<Self>, ConfigError> {
        let floor_count = config.get_usize("core", "floor_number")?;
        let elevator_index = config.get_usize("elevator", "elevator")?;
        let floor_addrs = (0..floor_count)
            .map(|index| config.peer_addr(&format!("floor_{index}")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Arc::new(Self {
            cell: StateCell::new(
                "request_manager",
                txm,
                LedgerState { floors: vec![RequestRow::default(); floor_count] },
            ),
            net,
            panel: OnceLock::new(),
            elevator_index,
            floor_addrs,
        }))
    }

    pub fn attach_panel(&self, panel: &Arc<CabinPanel>) {
        let _ = self.panel.set(Arc::downgrade(panel));
    }

    /// A destination button inside the cabin.
    pub fn add_cabin_request(&self, tid: TxnId, floor: Floor) {
        info!(floor, "cabin request added");
        self.cell.with(tid, |state| {
            if let Some(row) = state.floors.get_mut(floor) {
                row.cabin = true;
            }
        });
    }

    pub fn current_requests(&self, tid: TxnId) -> Vec<RequestRow> {
        self.cell.read(tid, |state| state.floors.clone())
    }

    /// The cabin has served `floor` in `direction`: clear the bits,
    /// clear the cabin lamp, tell the floor panel. A lost notification
    /// is not fatal — the floor's monitor reconciles on its next poll.
    pub async fn set_request_served(&self, tid: TxnId, floor: Floor, direction: Direction) {
        let mut had_cabin = false;
        self.cell.with(tid, |state| {
            let Some(row) = state.floors.get_mut(floor) else { return };
            match direction {
                Direction::Up => row.call_up = false,
                Direction::Down => row.call_down = false,
                Direction::Stop => {}
            }
            if row.cabin {
                row.cabin = false;
                had_cabin = true;
            }
        });

        if had_cabin {
            if let Some(panel) = self.panel.get().and_then(Weak::upgrade) {
                panel.turn_button_light_off(tid, floor);
            }
        }

        let Some(addr) = self.floor_addrs.get(floor) else { return };
        let served = FloorRequestServed { elevator: self.elevator_index, direction };
        let Ok(data) = serde_json::to_value(served) else { return };
        if let Err(err) = self.net.send_packet(*addr, FLOOR_REQUEST_SERVED, data).await {
            error!(floor, %err, "cannot notify floor panel");
        }
    }
}

lift_txn::impl_resource!(RequestManager, cell);

#[async_trait]
impl lift_txn::Module for RequestManager {
    fn name(&self) -> &'static str {
        "request_manager"
    }

    async fn start(&self, tid: TxnId) {
        self.cell.read(tid, |_| ());
    }

    fn export_state(&self, tid: TxnId) -> serde_json::Value {
        self.cell.export(tid)
    }

    fn import_state(&self, tid: TxnId, state: serde_json::Value) {
        self.cell.import(tid, state);
    }
}

/// `elev_request_add`: a floor panel delegating a hall call. Setting an
/// already-set bit is fine, so redelivery is harmless.
#[async_trait]
impl PacketHandler for RequestManager {
    async fn handle(
        &self,
        tid: TxnId,
        kind: &str,
        src: SocketAddr,
        data: serde_json::Value,
    ) -> serde_json::Value {
        let request: ElevRequestAdd = match serde_json::from_value(data) {
            Ok(request) => request,
            Err(err) => {
                warn!(%src, kind, %err, "bad request packet");
                return serde_json::Value::Bool(false);
            }
        };

        info!(floor = request.floor, direction = %request.direction, "hall call delegated");
        let accepted = self.cell.with(tid, |state| {
            let Some(row) = state.floors.get_mut(request.floor) else {
                return false;
            };
            match request.direction {
                Direction::Up => row.call_up = true,
                Direction::Down => row.call_down = true,
                Direction::Stop => return false,
            }
            true
        });

        serde_json::Value::Bool(accepted)
    }
}

#[cfg(test)]
#[path = "requests_tests.rs"]
mod tests;
