// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The elevator finite-state machine.
//!
//! Stop: idle, door closed. Move: under way to a destination. Stay:
//! arrived, door open, dwell timer running. Each control tick fetches
//! the request table and the motor state, picks the next destination
//! with a direction-preserving scan, and advances the machine. The
//! cabin serves everything ahead of it before it reverses.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use lift_core::{Clock, Config, ConfigError, Direction, Floor, RequestRow};
use lift_txn::{Module, Resource, StateCell, TransactionManager, TxnId};
use lift_wire::{ElevStateGet, ElevStateReply};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::elevator::{CabinPanel, MotorController, RequestManager};
use crate::net::PacketHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Stop,
    Move,
    Stay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtrlState {
    pub phase: Phase,
    pub direction: Direction,
    /// Dwell-timer start, epoch milliseconds. Present only in Stay.
    pub stay_since: Option<u64>,
}

impl Default for CtrlState {
    fn default() -> Self {
        Self { phase: Phase::Stop, direction: Direction::Stop, stay_since: None }
    }
}

pub struct ElevatorController<C: Clock> {
    cell: StateCell<CtrlState>,
    txm: Arc<TransactionManager>,
    requests: Arc<RequestManager>,
    motor: Arc<MotorController>,
    panel: Arc<CabinPanel>,
    clock: C,
    period: Duration,
    stay_time: Duration,
    me: Weak<Self>,
    started: AtomicBool,
}

impl<C: Clock + 'static> ElevatorController<C> {
    pub fn new(
        config: &Config,
        txm: Arc<TransactionManager>,
        requests: Arc<RequestManager>,
        motor: Arc<MotorController>,
        panel: Arc<CabinPanel>,
        clock: C,
    ) -> Result<Arc<Self>, ConfigError> {
        let period = config.get_duration("elevator", "elevator_control_period")?;
        let stay_time = config.get_duration("elevator", "stay_time")?;

        Ok(Arc::new_cyclic(|me| Self {
            cell: StateCell::new("elevator_controller", Arc::clone(&txm), CtrlState::default()),
            txm,
            requests,
            motor,
            panel,
            clock,
            period,
            stay_time,
            me: me.clone(),
            started: AtomicBool::new(false),
        }))
    }

    async fn run(self: Arc<Self>) {
        loop {
            let tid = self.txm.start().await;
            self.tick(tid).await;
            self.txm.finish(tid).await;
            tokio::time::sleep(self.period).await;
        }
    }

    /// One FSM step.
    pub(crate) async fn tick(&self, tid: TxnId) {
        let requests = self.requests.current_requests(tid);
        let (position, motor_direction) = self.motor.position_direction(tid);
        let Some(position) = position else {
            // Still finding the first floor; nothing to decide yet.
            return;
        };

        let (phase, direction, stay_since) =
            self.cell.read(tid, |s| (s.phase, s.direction, s.stay_since));
        let target = next_destination(phase, direction, position, &requests);
        let row = requests.get(position).copied().unwrap_or_default();

        match phase {
            Phase::Move => {
                self.panel.set_floor_indicator(tid, position);

                if motor_direction == Direction::Stop {
                    // Arrived. Reverse here only when nothing is ahead
                    // but the opposite call waits at this very floor.
                    let direction = match direction {
                        Direction::Up if target.is_none() && !row.call_up && row.call_down => {
                            Direction::Down
                        }
                        Direction::Down if target.is_none() && !row.call_down && row.call_up => {
                            Direction::Up
                        }
                        kept => kept,
                    };

                    info!(floor = position, %direction, "elevator stays");
                    let now = self.clock.epoch_ms();
                    self.cell.with(tid, |s| {
                        s.phase = Phase::Stay;
                        s.direction = direction;
                        s.stay_since = Some(now);
                    });
                    self.requests.set_request_served(tid, position, direction).await;
                } else if let Some(target) = target {
                    self.motor.set_target_floor(tid, target);
                }
            }

            Phase::Stay => {
                let now = self.clock.epoch_ms();
                let dwell_ms = self.stay_time.as_millis() as u64;
                let timed_out =
                    stay_since.map_or(true, |since| now.saturating_sub(since) >= dwell_ms);
                self.panel.set_door_open_light(tid, true);

                match target {
                    // The current floor was requested again: hold the
                    // door and restart the dwell timer.
                    Some(target) if target == position => {
                        self.cell.with(tid, |s| s.stay_since = Some(now));
                        self.requests.set_request_served(tid, position, direction).await;
                    }
                    Some(target) if timed_out => {
                        info!(from = position, to = target, "elevator starts moving");
                        let direction = toward(position, target);
                        self.cell.with(tid, |s| {
                            s.phase = Phase::Move;
                            s.direction = direction;
                            s.stay_since = None;
                        });
                        self.panel.set_door_open_light(tid, false);
                        self.motor.set_target_floor(tid, target);
                    }
                    None if timed_out => {
                        info!(floor = position, "elevator stops");
                        self.cell.with(tid, |s| {
                            s.phase = Phase::Stop;
                            s.direction = Direction::Stop;
                            s.stay_since = None;
                        });
                        self.panel.set_door_open_light(tid, false);
                    }
                    _ => {}
                }
            }

            Phase::Stop => {
                let Some(target) = target else { return };

                if target == position {
                    // Serve in place: open the door, pick the direction
                    // the waiting call asks for.
                    info!(floor = position, "elevator stays");
                    let now = self.clock.epoch_ms();
                    self.cell.with(tid, |s| {
                        s.phase = Phase::Stay;
                        s.stay_since = Some(now);
                    });
                    self.panel.set_door_open_light(tid, true);

                    let served = if row.call_up {
                        Direction::Up
                    } else if row.call_down {
                        Direction::Down
                    } else {
                        Direction::Stop
                    };
                    self.requests.set_request_served(tid, position, served).await;
                } else {
                    info!(from = position, to = target, "elevator starts moving");
                    let direction = toward(position, target);
                    self.cell.with(tid, |s| {
                        s.phase = Phase::Move;
                        s.direction = direction;
                    });
                    self.motor.set_target_floor(tid, target);
                }
            }
        }
    }
}

fn toward(position: Floor, target: Floor) -> Direction {
    if target > position {
        Direction::Up
    } else {
        Direction::Down
    }
}

/// Direction-preserving scan for the next destination.
///
/// A request at the current floor wins while the cabin is not moving;
/// then the nearest request ahead in the travel direction; then the
/// farthest opposite-direction call beyond, so the cabin sweeps the
/// whole leg before turning around. `None` means nothing to do.
pub(crate) fn next_destination(
    phase: Phase,
    direction: Direction,
    current: Floor,
    requests: &[RequestRow],
) -> Option<Floor> {
    let top = requests.len();
    let row = requests.get(current).copied()?;

    if phase != Phase::Move {
        if direction == Direction::Up && row.call_up {
            return Some(current);
        }
        if direction == Direction::Down && row.call_down {
            return Some(current);
        }
        if row.cabin {
            return Some(current);
        }
        if phase == Phase::Stop && (row.call_up || row.call_down) {
            return Some(current);
        }
    }

    if direction != Direction::Down {
        // Nearest onward request above, else the farthest down-call.
        for floor in current + 1..top {
            if requests[floor].call_up || requests[floor].cabin {
                return Some(floor);
            }
        }
        for floor in (current + 1..top).rev() {
            if requests[floor].call_down {
                return Some(floor);
            }
        }
    }

    if direction != Direction::Up {
        // Nearest onward request below, else the farthest up-call.
        for floor in (0..current).rev() {
            if requests[floor].call_down || requests[floor].cabin {
                return Some(floor);
            }
        }
        for floor in 0..current {
            if requests[floor].call_up {
                return Some(floor);
            }
        }
    }

    None
}

#[async_trait]
impl<C: Clock + 'static> Resource for ElevatorController<C> {
    fn name(&self) -> &'static str {
        self.cell.name()
    }

    async fn prepare_to_commit(&self, tid: TxnId) -> bool {
        self.cell.can_commit(tid)
    }

    async fn commit(&self, tid: TxnId) {
        self.cell.commit(tid);
    }

    async fn abort(&self, tid: TxnId) {
        self.cell.abort(tid);
    }
}

#[async_trait]
impl<C: Clock + 'static> Module for ElevatorController<C> {
    fn name(&self) -> &'static str {
        "elevator_controller"
    }

    async fn start(&self, tid: TxnId) {
        self.cell.read(tid, |_| ());
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(me) = self.me.upgrade() {
            tokio::spawn(me.run());
        }
    }

    fn export_state(&self, tid: TxnId) -> serde_json::Value {
        self.cell.export(tid)
    }

    fn import_state(&self, tid: TxnId, state: serde_json::Value) {
        self.cell.import(tid, state);
    }
}

/// `elev_state_get`: a floor panel asking where this cabin is and what
/// it has accepted for that floor.
#[async_trait]
impl<C: Clock + 'static> PacketHandler for ElevatorController<C> {
    async fn handle(
        &self,
        tid: TxnId,
        kind: &str,
        src: SocketAddr,
        data: serde_json::Value,
    ) -> serde_json::Value {
        let query: ElevStateGet = match serde_json::from_value(data) {
            Ok(query) => query,
            Err(err) => {
                warn!(%src, kind, %err, "bad state query");
                return serde_json::Value::Bool(false);
            }
        };

        let requests = self.requests.current_requests(tid);
        let row = requests.get(query.floor).copied().unwrap_or_default();
        let mut serving_requests = Vec::new();
        if row.call_up {
            serving_requests.push(Direction::Up);
        }
        if row.call_down {
            serving_requests.push(Direction::Down);
        }

        let (position, _) = self.motor.position_direction(tid);
        let reply = ElevStateReply {
            position: position.unwrap_or(0),
            direction: self.cell.read(tid, |s| s.direction),
            serving_requests,
            motor_stuck: self.motor.is_stuck(tid),
        };

        serde_json::to_value(reply).unwrap_or(serde_json::Value::Bool(false))
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
