// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Motor control and position tracking.
//!
//! A dedicated task drives the motor toward `target_floor` and keeps
//! `prev_floor`, the last floor the sensor reported, as the cabin's
//! best-known position. While commanded to move, a stagnant sensor
//! reading for longer than `motor_stuck_timeout` raises the advertised
//! stuck flag; any movement or a stop command clears it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use lift_core::{Config, ConfigError, Direction, Floor};
use lift_driver::{Driver, DriverError};
use lift_txn::{Module, StateCell, TransactionManager, TxnId};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorState {
    pub target_floor: Floor,
    /// Last floor the sensor reported; `None` until initialization has
    /// found one.
    pub prev_floor: Option<Floor>,
    pub direction: Direction,
    pub stuck_counter: u32,
    pub is_stuck: bool,
}

impl Default for MotorState {
    fn default() -> Self {
        Self {
            target_floor: 0,
            prev_floor: None,
            direction: Direction::Stop,
            stuck_counter: 0,
            is_stuck: false,
        }
    }
}

pub struct MotorController {
    cell: StateCell<MotorState>,
    txm: Arc<TransactionManager>,
    driver: Arc<Driver>,
    period: Duration,
    stuck_timeout: Duration,
    me: Weak<Self>,
    started: AtomicBool,
}

impl MotorController {
    pub fn new(
        config: &Config,
        txm: Arc<TransactionManager>,
        driver: Arc<Driver>,
    ) -> Result<Arc<Self>, ConfigError> {
        let period = config.get_duration("elevator", "motor_controller_period")?;
        let stuck_timeout = config.get_duration("elevator", "motor_stuck_timeout")?;

        Ok(Arc::new_cyclic(|me| Self {
            cell: StateCell::new("motor_controller", Arc::clone(&txm), MotorState::default()),
            txm,
            driver,
            period,
            stuck_timeout,
            me: me.clone(),
            started: AtomicBool::new(false),
        }))
    }

    /// Change the destination. The control task converges on it
    /// asynchronously; a moving cabin just keeps going the new way.
    pub fn set_target_floor(&self, tid: TxnId, floor: Floor) {
        debug!(floor, "setting target floor");
        self.cell.with(tid, |state| state.target_floor = floor);
    }

    pub fn position_direction(&self, tid: TxnId) -> (Option<Floor>, Direction) {
        self.cell.read(tid, |state| (state.prev_floor, state.direction))
    }

    pub fn is_stuck(&self, tid: TxnId) -> bool {
        self.cell.read(tid, |state| state.is_stuck)
    }

    async fn run(self: Arc<Self>) {
        // Position unknown: drive down until the sensor names a floor.
        // The transaction stays open for the whole descent, so the rest
        // of the node observes initialization as one atomic step.
        let tid = self.txm.start().await;
        if self.cell.read(tid, |state| state.prev_floor).is_none() {
            info!("position unknown, driving down to find a floor");
            if let Err(err) = self.driver.set_motor_direction(Direction::Down).await {
                error!(%err, "motor command failed");
            }
            self.cell.with(tid, |state| state.direction = Direction::Down);

            loop {
                match self.driver.floor_sensor_signal().await {
                    Ok(Some(floor)) => {
                        info!(floor, "found a floor");
                        self.cell.with(tid, |state| state.prev_floor = Some(floor));
                        break;
                    }
                    Ok(None) => {}
                    Err(err) => error!(%err, "floor sensor read failed"),
                }
                tokio::time::sleep(self.period).await;
            }
        }
        self.txm.finish(tid).await;

        // `prev_sensor` is deliberately task-local: stagnation is judged
        // against what this loop last saw, not against replicated state.
        let mut prev_sensor: Option<Floor> = None;
        loop {
            let tid = self.txm.start().await;
            if let Err(err) = self.tick(tid, &mut prev_sensor).await {
                error!(%err, "motor tick failed");
                self.cell.set_can_commit(tid, false);
            }
            self.txm.finish(tid).await;
            tokio::time::sleep(self.period).await;
        }
    }

    /// One control-loop iteration.
    pub(crate) async fn tick(
        &self,
        tid: TxnId,
        prev_sensor: &mut Option<Floor>,
    ) -> Result<(), DriverError> {
        let (prev_floor, target, direction) = self
            .cell
            .read(tid, |state| (state.prev_floor, state.target_floor, state.direction));
        let Some(prev_floor) = prev_floor else {
            return Ok(());
        };

        // Command toward the target from the last reached floor.
        if prev_floor < target && direction != Direction::Up {
            self.driver.set_motor_direction(Direction::Up).await?;
            self.cell.with(tid, |state| state.direction = Direction::Up);
        } else if prev_floor > target && direction != Direction::Down {
            self.driver.set_motor_direction(Direction::Down).await?;
            self.cell.with(tid, |state| state.direction = Direction::Down);
        }

        let sensor = self.driver.floor_sensor_signal().await?;
        if sensor == Some(target) && self.cell.read(tid, |state| state.direction) != Direction::Stop
        {
            self.driver.set_motor_direction(Direction::Stop).await?;
            self.cell.with(tid, |state| state.direction = Direction::Stop);
        }

        // Stuck detection: moving but the sensor does not change.
        let period = self.period;
        let stuck_timeout = self.stuck_timeout;
        self.cell.with(tid, |state| {
            if state.direction == Direction::Stop {
                state.stuck_counter = 0;
                state.is_stuck = false;
            } else if sensor == *prev_sensor {
                if period.as_secs_f64() * f64::from(state.stuck_counter)
                    > stuck_timeout.as_secs_f64()
                {
                    if !state.is_stuck {
                        error!("motor cannot move");
                    }
                    state.is_stuck = true;
                }
                state.stuck_counter += 1;
            } else {
                state.stuck_counter = 0;
                state.is_stuck = false;
            }

            if let Some(floor) = sensor {
                state.prev_floor = Some(floor);
            }
        });
        *prev_sensor = sensor;

        Ok(())
    }
}

lift_txn::impl_resource!(MotorController, cell);

#[async_trait]
impl Module for MotorController {
    fn name(&self) -> &'static str {
        "motor_controller"
    }

    /// Forget the synced position estimate: after a failover the cabin
    /// may be anywhere between floors, so the control task re-finds a
    /// floor before serving anything.
    async fn start(&self, tid: TxnId) {
        self.cell.with(tid, |state| state.prev_floor = None);

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

#[cfg(test)]
#[path = "motor_tests.rs"]
mod tests;
