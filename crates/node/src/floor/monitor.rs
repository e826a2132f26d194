// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Elevator health and position tracking on the floor side.
//!
//! One poll task per elevator asks `elev_state_get` every period. The
//! answer (or the crossing of the failure threshold) is folded into the
//! observed state and pushed to the request manager inside the same
//! transaction, so reassignment is atomic with the observation that
//! caused it.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use lift_core::{Config, ConfigError, Direction, Floor};
use lift_txn::{Module, StateCell, TransactionManager, TxnId};
use lift_wire::{ElevStateReply, ELEV_STATE_GET};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::floor::RequestManager;
use crate::net::Network;

/// What this floor believes about one elevator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedElevator {
    pub position: Floor,
    pub direction: Direction,
    pub is_connected: bool,
    pub motor_stuck: bool,
    /// Hall-call directions of this floor the elevator has accepted.
    pub serving_requests: Vec<Direction>,
}

impl Default for ObservedElevator {
    fn default() -> Self {
        Self {
            position: 0,
            direction: Direction::Stop,
            is_connected: false,
            motor_stuck: false,
            serving_requests: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorState {
    pub elevators: Vec<ObservedElevator>,
}

pub struct ElevatorMonitor {
    cell: StateCell<MonitorState>,
    txm: Arc<TransactionManager>,
    net: Arc<Network>,
    requests: Arc<RequestManager>,
    floor: Floor,
    floor_count: usize,
    period: Duration,
    max_attempts: u32,
    elevator_addrs: Vec<SocketAddr>,
    me: Weak<Self>,
    started: AtomicBool,
}

impl ElevatorMonitor {
    pub fn new(
        config: &Config,
        txm: Arc<TransactionManager>,
        net: Arc<Network>,
        requests: Arc<RequestManager>,
    ) -> Result<Arc<Self>, ConfigError> {
        let floor = config.get_usize("floor", "floor")?;
        let floor_count = config.get_usize("core", "floor_number")?;
        let elevator_count = config.get_usize("core", "elevator_number")?;
        let period = config.get_duration("floor", "elevator_monitor_period")?;
        let max_attempts = config.get_int("floor", "elevator_monitor_attempts")? as u32;
        let elevator_addrs = (0..elevator_count)
            .map(|index| config.peer_addr(&format!("elevator_{index}")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Arc::new_cyclic(|me| Self {
            cell: StateCell::new(
                "elevator_monitor",
                Arc::clone(&txm),
                MonitorState {
                    elevators: vec![ObservedElevator::default(); elevator_count],
                },
            ),
            txm,
            net,
            requests,
            floor,
            floor_count,
            period,
            max_attempts,
            elevator_addrs,
            me: me.clone(),
            started: AtomicBool::new(false),
        }))
    }

    /// The connected, non-stuck elevator with the smallest worst-case
    /// travel to this floor in `direction`. Ties go to the lowest index.
    pub fn best_elevator(&self, tid: TxnId, direction: Direction) -> Option<usize> {
        self.cell.read(tid, |state| {
            best_elevator(&state.elevators, self.floor, self.floor_count, direction)
        })
    }

    async fn poll_elevator(self: Arc<Self>, index: usize, addr: SocketAddr) {
        let query = serde_json::json!({ "floor": self.floor });
        let mut attempts: u32 = 0;

        loop {
            let reply = self.net.send_packet(addr, ELEV_STATE_GET, query.clone()).await;
            // `false` (refused or aborted on the elevator) fails the
            // parse and counts as a failed attempt, like a timeout.
            let parsed: Option<ElevStateReply> = match reply {
                Ok(value) => serde_json::from_value(value).ok(),
                Err(_) => None,
            };

            let tid = self.txm.start().await;
            attempts += 1;

            match parsed {
                Some(reply) => {
                    attempts = 0;
                    self.cell.with(tid, |state| {
                        if let Some(observed) = state.elevators.get_mut(index) {
                            observed.is_connected = true;
                            observed.position = reply.position;
                            observed.direction = reply.direction;
                            observed.motor_stuck = reply.motor_stuck;
                            observed.serving_requests = reply.serving_requests.clone();
                        }
                    });
                }
                None => {
                    warn!(elevator = index, attempts, "no state from elevator");
                    if attempts > self.max_attempts {
                        self.cell.with(tid, |state| {
                            if let Some(observed) = state.elevators.get_mut(index) {
                                observed.is_connected = false;
                            }
                        });
                    }
                }
            }

            let observed = self
                .cell
                .read(tid, |state| state.elevators.get(index).cloned())
                .unwrap_or_default();
            self.requests.on_elevator_state_changed(tid, index, &observed).await;
            self.txm.finish(tid).await;

            tokio::time::sleep(self.period).await;
        }
    }
}

/// Worst-case floors to travel for an elevator to reach `floor` going
/// `direction`, treating its current direction as a commitment.
pub(crate) fn worst_case_distance(
    observed: &ObservedElevator,
    floor: Floor,
    floor_count: usize,
    direction: Direction,
) -> usize {
    let top = floor_count - 1;
    // A peer could report anything; clamp so the arithmetic below
    // cannot underflow.
    let position = observed.position.min(top);

    match observed.direction {
        Direction::Up => {
            if direction == Direction::Up {
                if position < floor {
                    // On its way here already.
                    floor - position
                } else {
                    // Top, all the way down, back up to here.
                    (top - position) + top + floor
                }
            } else {
                // Finish the up leg, then down to here.
                (top - position) + (top - floor)
            }
        }
        Direction::Down => {
            if direction == Direction::Up {
                // Bottom, then up to here.
                position + floor
            } else if position > floor {
                position - floor
            } else {
                // Bottom, top, back down to here.
                position + top + (top - floor)
            }
        }
        Direction::Stop => {
            if position > floor {
                position - floor
            } else {
                floor - position
            }
        }
    }
}

pub(crate) fn best_elevator(
    elevators: &[ObservedElevator],
    floor: Floor,
    floor_count: usize,
    direction: Direction,
) -> Option<usize> {
    let mut best = None;
    let mut min_distance = floor_count * 4;

    for (index, observed) in elevators.iter().enumerate() {
        if !observed.is_connected || observed.motor_stuck {
            continue;
        }
        let distance = worst_case_distance(observed, floor, floor_count, direction);
        if distance < min_distance {
            min_distance = distance;
            best = Some(index);
        }
    }

    best
}

lift_txn::impl_resource!(ElevatorMonitor, cell);

#[async_trait]
impl Module for ElevatorMonitor {
    fn name(&self) -> &'static str {
        "elevator_monitor"
    }

    async fn start(&self, tid: TxnId) {
        self.cell.read(tid, |_| ());
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        for (index, addr) in self.elevator_addrs.iter().enumerate() {
            if let Some(me) = self.me.upgrade() {
                tokio::spawn(me.poll_elevator(index, *addr));
            }
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
#[path = "monitor_tests.rs"]
mod tests;
