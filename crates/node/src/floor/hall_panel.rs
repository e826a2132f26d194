// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The hall panel: the up/down buttons and their lamps for one floor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use lift_core::{Config, ConfigError, Direction, Floor};
use lift_driver::{ButtonKind, Driver, DriverError};
use lift_txn::{Module, Resource, StateCell, TransactionManager, TxnId};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::floor::RequestManager;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HallLamps {
    pub light_up: bool,
    pub light_down: bool,
}

pub struct HallPanel {
    cell: StateCell<HallLamps>,
    txm: Arc<TransactionManager>,
    driver: Arc<Driver>,
    requests: Arc<RequestManager>,
    floor: Floor,
    period: Duration,
    me: Weak<Self>,
    started: AtomicBool,
}

impl HallPanel {
    pub fn new(
        config: &Config,
        txm: Arc<TransactionManager>,
        driver: Arc<Driver>,
        requests: Arc<RequestManager>,
    ) -> Result<Arc<Self>, ConfigError> {
        let floor = config.get_usize("floor", "floor")?;
        let period =
            config.get_duration_or("floor", "ui_monitor_period", Duration::from_millis(100))?;

        Ok(Arc::new_cyclic(|me| Self {
            cell: StateCell::new("user_interface", Arc::clone(&txm), HallLamps::default()),
            txm,
            driver,
            requests,
            floor,
            period,
            me: me.clone(),
            started: AtomicBool::new(false),
        }))
    }

    pub fn turn_button_light_off(&self, tid: TxnId, direction: Direction) {
        self.cell.with(tid, |lamps| match direction {
            Direction::Up => lamps.light_up = false,
            Direction::Down => lamps.light_down = false,
            Direction::Stop => {}
        });
    }

    /// Poll both hall buttons; each rising edge becomes one transaction
    /// raising the lamp and delegating the call together.
    async fn poll_buttons(self: Arc<Self>) {
        let mut pressed_up = false;
        let mut pressed_down = false;

        loop {
            for (button, direction) in [
                (ButtonKind::CallUp, Direction::Up),
                (ButtonKind::CallDown, Direction::Down),
            ] {
                let value = match self.driver.button_signal(button, self.floor).await {
                    Ok(value) => value,
                    Err(err) => {
                        debug!(%err, "button read failed");
                        continue;
                    }
                };

                let pressed = match direction {
                    Direction::Up => &mut pressed_up,
                    _ => &mut pressed_down,
                };

                if value && !*pressed {
                    info!(floor = self.floor, %direction, "hall button pressed");
                    let tid = self.txm.start().await;
                    self.cell.with(tid, |lamps| match direction {
                        Direction::Up => lamps.light_up = true,
                        _ => lamps.light_down = true,
                    });
                    self.requests.add_request(tid, direction).await;
                    self.txm.finish(tid).await;
                }
                *pressed = value;
            }
            tokio::time::sleep(self.period).await;
        }
    }

    async fn flush(&self, lamps: &HallLamps) -> Result<(), DriverError> {
        self.driver
            .set_button_lamp(ButtonKind::CallUp, self.floor, lamps.light_up)
            .await?;
        self.driver
            .set_button_lamp(ButtonKind::CallDown, self.floor, lamps.light_down)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Resource for HallPanel {
    fn name(&self) -> &'static str {
        self.cell.name()
    }

    async fn prepare_to_commit(&self, tid: TxnId) -> bool {
        self.cell.can_commit(tid)
    }

    /// Committing is what lights the lamps.
    async fn commit(&self, tid: TxnId) {
        let lamps = self.cell.read(tid, |lamps| *lamps);
        self.cell.commit(tid);

        if self.started.load(Ordering::SeqCst) {
            if let Err(err) = self.flush(&lamps).await {
                error!(%err, "hall lamp flush failed");
            }
        }
    }

    async fn abort(&self, tid: TxnId) {
        self.cell.abort(tid);
    }
}

#[async_trait]
impl Module for HallPanel {
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
#[path = "hall_panel_tests.rs"]
mod tests;
