// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The driver module: backend access with the power-loss guard.

use std::sync::Arc;

use async_trait::async_trait;
use lift_core::{Direction, Floor};
use lift_txn::{Module, StateCell, TransactionManager, TxnId};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{Backend, ButtonKind, DriverError};

/// The driver has no state worth replicating; the cell exists so it can
/// take part in transactions like every other module.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct DriverState {}

pub struct Driver {
    cell: StateCell<DriverState>,
    backend: Arc<dyn Backend>,
}

impl Driver {
    pub fn new(txm: Arc<TransactionManager>, backend: Arc<dyn Backend>) -> Self {
        Self {
            cell: StateCell::new("driver", txm, DriverState::default()),
            backend,
        }
    }

    pub async fn set_motor_direction(&self, direction: Direction) -> Result<(), DriverError> {
        self.backend.set_motor_direction(direction).await
    }

    pub async fn set_button_lamp(
        &self,
        button: ButtonKind,
        floor: Floor,
        on: bool,
    ) -> Result<(), DriverError> {
        self.backend.set_button_lamp(button, floor, on).await
    }

    pub async fn set_floor_indicator(&self, floor: Floor) -> Result<(), DriverError> {
        self.backend.set_floor_indicator(floor).await
    }

    pub async fn set_door_open_lamp(&self, on: bool) -> Result<(), DriverError> {
        self.backend.set_door_open_lamp(on).await
    }

    pub async fn set_stop_lamp(&self, on: bool) -> Result<(), DriverError> {
        self.backend.set_stop_lamp(on).await
    }

    pub async fn button_signal(&self, button: ButtonKind, floor: Floor) -> Result<bool, DriverError> {
        if self.unpowered().await? {
            return Ok(false);
        }
        self.backend.button_signal(button, floor).await
    }

    pub async fn floor_sensor_signal(&self) -> Result<Option<Floor>, DriverError> {
        if self.unpowered().await? {
            return Ok(None);
        }
        self.backend.floor_sensor_signal().await
    }

    pub async fn stop_signal(&self) -> Result<bool, DriverError> {
        if self.unpowered().await? {
            return Ok(false);
        }
        self.backend.stop_signal().await
    }

    pub async fn obstruction_signal(&self) -> Result<bool, DriverError> {
        if self.unpowered().await? {
            return Ok(false);
        }
        self.backend.obstruction_signal().await
    }

    /// The stop lamp is forced off at start, so a raw stop signal reads
    /// as set only while the motor box has lost power. Every read above
    /// substitutes its safe value in that case.
    async fn unpowered(&self) -> Result<bool, DriverError> {
        self.backend.stop_signal().await
    }
}

lift_txn::impl_resource!(Driver, cell);

#[async_trait]
impl Module for Driver {
    fn name(&self) -> &'static str {
        "driver"
    }

    async fn start(&self, tid: TxnId) {
        self.cell.read(tid, |_| ());
        debug!("connecting driver backend");

        if let Err(err) = self.backend.connect().await {
            error!(%err, "driver backend connect failed");
            return;
        }
        // Stop lamp off: the power-loss probe baseline.
        if let Err(err) = self.backend.set_stop_lamp(false).await {
            error!(%err, "cannot clear stop lamp");
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
#[path = "driver_tests.rs"]
mod tests;
