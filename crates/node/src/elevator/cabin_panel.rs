// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The panel inside the cabin: destination buttons, their lamps, the
//! door lamp and the floor indicator.
//!
//! Lamp state is queued in the transaction and flushed to the driver in
//! `commit`, so a button press that fails to register leaves the lamp
//! dark. Nothing is flushed before the panel is started — a backup
//! importing snapshots never touches the hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use lift_core::{Config, ConfigError, Floor};
use lift_driver::{ButtonKind, Driver, DriverError};
use lift_txn::{Module, Resource, StateCell, TransactionManager, TxnId};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::elevator::RequestManager;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelState {
    /// One destination-button lamp per floor.
    pub lamps: Vec<bool>,
    pub door_open: bool,
    pub indicator: Floor,
}

pub struct CabinPanel {
    cell: StateCell<PanelState>,
    txm: Arc<TransactionManager>,
    driver: Arc<Driver>,
    requests: Arc<RequestManager>,
    floor_count: usize,
    period: Duration,
    me: Weak<Self>,
    started: AtomicBool,
}

impl CabinPanel {
    pub fn new(
        config: &Config,
        txm: Arc<TransactionManager>,
        driver: Arc<Driver>,
        requests: Arc<RequestManager>,
    ) -> Result<Arc<Self>, ConfigError> {
        let floor_count = config.get_usize("core", "floor_number")?;
        let period = config.get_duration_or("elevator", "ui_monitor_period", Duration::from_millis(100))?;

        Ok(Arc::new_cyclic(|me| Self {
            cell: StateCell::new(
                "user_interface",
                Arc::clone(&txm),
                PanelState { lamps: vec![false; floor_count], door_open: false, indicator: 0 },
            ),
            txm,
            driver,
            requests,
            floor_count,
            period,
            me: me.clone(),
            started: AtomicBool::new(false),
        }))
    }

    pub fn turn_button_light_off(&self, tid: TxnId, floor: Floor) {
        self.cell.with(tid, |state| {
            if let Some(lamp) = state.lamps.get_mut(floor) {
                *lamp = false;
            }
        });
    }

    pub fn set_door_open_light(&self, tid: TxnId, open: bool) {
        self.cell.with(tid, |state| state.door_open = open);
    }

    pub fn set_floor_indicator(&self, tid: TxnId, floor: Floor) {
        self.cell.with(tid, |state| state.indicator = floor);
    }

    /// Poll the destination buttons; each rising edge becomes one
    /// transaction raising the lamp and the request together.
    async fn poll_buttons(self: Arc<Self>) {
        let mut pressed = vec![false; self.floor_count];
        loop {
            for floor in 0..self.floor_count {
                let value = match self.driver.button_signal(ButtonKind::Command, floor).await {
                    Ok(value) => value,
                    Err(err) => {
                        debug!(floor, %err, "button read failed");
                        continue;
                    }
                };

                if value && !pressed[floor] {
                    info!(floor, "cabin button pressed");
                    let tid = self.txm.start().await;
                    self.cell.with(tid, |state| {
                        if let Some(lamp) = state.lamps.get_mut(floor) {
                            *lamp = true;
                        }
                    });
                    self.requests.add_cabin_request(tid, floor);
                    self.txm.finish(tid).await;
                }
                pressed[floor] = value;
            }
            tokio::time::sleep(self.period).await;
        }
    }

    async fn flush(&self, state: &PanelState) -> Result<(), DriverError> {
        for (floor, lit) in state.lamps.iter().enumerate() {
            self.driver.set_button_lamp(ButtonKind::Command, floor, *lit).await?;
        }
        self.driver.set_door_open_lamp(state.door_open).await?;
        self.driver.set_floor_indicator(state.indicator).await?;
        Ok(())
    }
}

#[async_trait]
impl Resource for CabinPanel {
    fn name(&self) -> &'static str {
        self.cell.name()
    }

    async fn prepare_to_commit(&self, tid: TxnId) -> bool {
        self.cell.can_commit(tid)
    }

    /// Committing is what lights the lamps.
    async fn commit(&self, tid: TxnId) {
        let state = self.cell.read(tid, |state| state.clone());
        self.cell.commit(tid);

        if self.started.load(Ordering::SeqCst) {
            if let Err(err) = self.flush(&state).await {
                error!(%err, "cabin lamp flush failed");
            }
        }
    }

    async fn abort(&self, tid: TxnId) {
        self.cell.abort(tid);
    }
}

#[async_trait]
impl Module for CabinPanel {
    fn name(&self) -> &'static str {
        "user_interface"
    }

    async fn start(&self, tid: TxnId) {
        self.cell.read(tid, |_| ());
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(me) = self.me.upgrade() {
            tokio::spawn(me.poll_buttons());
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
#[path = "cabin_panel_tests.rs"]
mod tests;
