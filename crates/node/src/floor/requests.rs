// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The floor panel's pending hall calls and their serving elevators.
//!
//! This module is the authority for its floor's two hall bits. A raised
//! call is delegated to the best-scoring elevator; the monitor feeds
//! back elevator health so a dead or stuck elevator's calls are
//! reassigned, and an elevator that lost the delegation gets it again.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use lift_core::{Config, ConfigError, Direction, Floor};
use lift_txn::{StateCell, TransactionManager, TxnId};
use lift_wire::{ElevRequestAdd, FloorRequestServed, ELEV_REQUEST_ADD};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::floor::{ElevatorMonitor, HallPanel, ObservedElevator};
use crate::net::{Network, PacketHandler};

/// One direction's pending call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirSlot {
    pub pending: bool,
    pub serving: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HallCalls {
    pub up: DirSlot,
    pub down: DirSlot,
}

impl HallCalls {
    fn slot(&self, direction: Direction) -> Option<&DirSlot> {
        match direction {
            Direction::Up => Some(&self.up),
            Direction::Down => Some(&self.down),
            Direction::Stop => None,
        }
    }

    fn slot_mut(&mut self, direction: Direction) -> Option<&mut DirSlot> {
        match direction {
            Direction::Up => Some(&mut self.up),
            Direction::Down => Some(&mut self.down),
            Direction::Stop => None,
        }
    }
}

pub struct RequestManager {
    cell: StateCell<HallCalls>,
    net: Arc<Network>,
    /// Back-capabilities, installed by the composer.
    panel: OnceLock<Weak<HallPanel>>,
    monitor: OnceLock<Weak<ElevatorMonitor>>,
    floor: Floor,
    elevator_addrs: Vec<SocketAddr>,
}

impl RequestManager {
    pub fn new(
        config: &Config,
        txm: Arc<TransactionManager>,
        net: Arc<Network>,
    ) -> Result<Arc<Self>, ConfigError> {
        let floor = config.get_usize("floor", "floor")?;
        let elevator_count = config.get_usize("core", "elevator_number")?;
        let elevator_addrs = (0..elevator_count)
            .map(|index| config.peer_addr(&format!("elevator_{index}")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Arc::new(Self {
            cell: StateCell::new("request_manager", txm, HallCalls::default()),
            net,
            panel: OnceLock::new(),
            monitor: OnceLock::new(),
            floor,
            elevator_addrs,
        }))
    }

    pub fn attach(&self, panel: &Arc<HallPanel>, monitor: &Arc<ElevatorMonitor>) {
        let _ = self.panel.set(Arc::downgrade(panel));
        let _ = self.monitor.set(Arc::downgrade(monitor));
    }

    fn monitor(&self) -> Option<Arc<ElevatorMonitor>> {
        self.monitor.get().and_then(Weak::upgrade)
    }

    fn panel(&self) -> Option<Arc<HallPanel>> {
        self.panel.get().and_then(Weak::upgrade)
    }

    /// A hall button press. Allocates an elevator and delegates the
    /// call. No elevator reachable at all ⇒ the call is dropped on the
    /// spot (lamp off, user retries); a refused or unanswered dispatch
    /// ⇒ the whole transaction aborts, so the press leaves no trace.
    pub async fn add_request(&self, tid: TxnId, direction: Direction) {
        let already = self
            .cell
            .read(tid, |calls| calls.slot(direction).map_or(true, |slot| slot.pending));
        if already {
            return;
        }

        info!(floor = self.floor, %direction, "hall call raised");
        self.cell.with(tid, |calls| {
            if let Some(slot) = calls.slot_mut(direction) {
                *slot = DirSlot { pending: true, serving: None };
            }
        });

        match self.monitor().and_then(|monitor| monitor.best_elevator(tid, direction)) {
            Some(elevator) => {
                if self.dispatch(direction, elevator).await {
                    self.cell.with(tid, |calls| {
                        if let Some(slot) = calls.slot_mut(direction) {
                            slot.serving = Some(elevator);
                        }
                    });
                } else {
                    self.cell.set_can_commit(tid, false);
                }
            }
            None => {
                error!(%direction, "no elevator available, dropping the call");
                self.cell.with(tid, |calls| {
                    if let Some(slot) = calls.slot_mut(direction) {
                        slot.pending = false;
                    }
                });
                if let Some(panel) = self.panel() {
                    panel.turn_button_light_off(tid, direction);
                }
            }
        }
    }

    /// Monitor feedback. Reassignment is gated on `pending`: a call
    /// already served never gets resent.
    pub async fn on_elevator_state_changed(
        &self,
        tid: TxnId,
        elevator: usize,
        state: &ObservedElevator,
    ) {
        for direction in [Direction::Up, Direction::Down] {
            let assigned = self.cell.read(tid, |calls| {
                calls
                    .slot(direction)
                    .map_or(false, |slot| slot.pending && slot.serving == Some(elevator))
            });
            if !assigned {
                continue;
            }

            if !state.is_connected || state.motor_stuck {
                self.reassign(tid, direction, elevator).await;
            } else if !state.serving_requests.contains(&direction) {
                // The elevator is alive but lost the call (restart,
                // failover): send it again.
                warn!(elevator, %direction, "elevator dropped the call, resending");
                if !self.dispatch(direction, elevator).await {
                    self.cell.set_can_commit(tid, false);
                }
            }
        }
    }

    async fn reassign(&self, tid: TxnId, direction: Direction, dead: usize) {
        match self.monitor().and_then(|monitor| monitor.best_elevator(tid, direction)) {
            Some(next) => {
                info!(from = dead, to = next, %direction, "reassigning hall call");
                if self.dispatch(direction, next).await {
                    self.cell.with(tid, |calls| {
                        if let Some(slot) = calls.slot_mut(direction) {
                            slot.serving = Some(next);
                        }
                    });
                } else {
                    self.cell.set_can_commit(tid, false);
                }
            }
            None => {
                error!(%direction, "no elevator left, dropping the call");
                self.cell.with(tid, |calls| {
                    if let Some(slot) = calls.slot_mut(direction) {
                        *slot = DirSlot::default();
                    }
                });
                if let Some(panel) = self.panel() {
                    panel.turn_button_light_off(tid, direction);
                }
            }
        }
    }

    /// Delegate the call; true only when the elevator answered `true`.
    async fn dispatch(&self, direction: Direction, elevator: usize) -> bool {
        let Some(addr) = self.elevator_addrs.get(elevator) else {
            return false;
        };
        let request = ElevRequestAdd { floor: self.floor, direction };
        let Ok(data) = serde_json::to_value(request) else {
            return false;
        };

        match self.net.send_packet(*addr, ELEV_REQUEST_ADD, data).await {
            Ok(serde_json::Value::Bool(true)) => {
                info!(elevator, %direction, "call delegated");
                true
            }
            Ok(reply) => {
                error!(elevator, ?reply, "elevator refused the call");
                false
            }
            Err(err) => {
                error!(elevator, %err, "cannot reach the elevator");
                false
            }
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

/// `floor_request_served` and `floor_get_all_requests`.
#[async_trait]
impl PacketHandler for RequestManager {
    async fn handle(
        &self,
        tid: TxnId,
        kind: &str,
        src: SocketAddr,
        data: serde_json::Value,
    ) -> serde_json::Value {
        match kind {
            lift_wire::FLOOR_REQUEST_SERVED => {
                let served: FloorRequestServed = match serde_json::from_value(data) {
                    Ok(served) => served,
                    Err(err) => {
                        warn!(%src, kind, %err, "bad served packet");
                        return serde_json::Value::Bool(false);
                    }
                };

                info!(elevator = served.elevator, direction = %served.direction, "call served");
                // Idempotent: clearing a clear slot changes nothing.
                self.cell.with(tid, |calls| {
                    if let Some(slot) = calls.slot_mut(served.direction) {
                        *slot = DirSlot::default();
                    }
                });
                if let Some(panel) = self.panel() {
                    panel.turn_button_light_off(tid, served.direction);
                }
                serde_json::Value::Bool(true)
            }

            lift_wire::FLOOR_GET_ALL_REQUESTS => {
                let (up, down) = self.cell.read(tid, |calls| (calls.up.pending, calls.down.pending));
                serde_json::json!([up, down])
            }

            _ => {
                warn!(%src, kind, "unexpected packet kind");
                serde_json::Value::Bool(false)
            }
        }
    }
}

#[cfg(test)]
#[path = "requests_tests.rs"]
mod tests;
