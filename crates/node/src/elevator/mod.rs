// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The elevator node: one cabin, its motor, its panel, its ledger.

mod cabin_panel;
mod controller;
mod motor;
mod requests;
#[cfg(test)]
pub(crate) mod test_rig;

pub use cabin_panel::CabinPanel;
pub use controller::{CtrlState, ElevatorController, Phase};
pub use motor::{MotorController, MotorState};
pub use requests::RequestManager;

use std::sync::Arc;

use lift_core::{Config, SystemClock};
use lift_driver::Driver;
use lift_txn::{Module, TransactionManager};
use lift_wire::{ELEV_REQUEST_ADD, ELEV_STATE_GET};
use tracing::info;

use crate::net::Network;
use crate::pair::{Mode, ProcessPair};
use crate::NodeError;

/// Compose and run an elevator node. Returns only when process pairs
/// are disabled; the caller keeps the process alive.
pub async fn run(config: Config, mode: Mode) -> Result<(), NodeError> {
    info!(node = config.node_name(), "elevator node starting");

    let txm = Arc::new(TransactionManager::new());
    let net = Arc::new(Network::new(&config, Arc::clone(&txm))?);
    let backend = crate::backend_from_config(&config)?;
    let driver = Arc::new(Driver::new(Arc::clone(&txm), backend));

    let requests = RequestManager::new(&config, Arc::clone(&txm), Arc::clone(&net))?;
    let panel = CabinPanel::new(&config, Arc::clone(&txm), Arc::clone(&driver), Arc::clone(&requests))?;
    requests.attach_panel(&panel);
    let motor = MotorController::new(&config, Arc::clone(&txm), Arc::clone(&driver))?;
    let controller = ElevatorController::new(
        &config,
        Arc::clone(&txm),
        Arc::clone(&requests),
        Arc::clone(&motor),
        Arc::clone(&panel),
        SystemClock,
    )?;

    net.add_packet_handler(ELEV_REQUEST_ADD, &requests);
    net.add_packet_handler(ELEV_STATE_GET, &controller);

    txm.register(&driver);
    txm.register(&panel);
    txm.register(&requests);
    txm.register(&controller);
    txm.register(&motor);

    let modules: Vec<Arc<dyn Module>> = vec![
        Arc::clone(&net) as Arc<dyn Module>,
        Arc::clone(&driver) as Arc<dyn Module>,
        Arc::clone(&panel) as Arc<dyn Module>,
        Arc::clone(&requests) as Arc<dyn Module>,
        Arc::clone(&controller) as Arc<dyn Module>,
        Arc::clone(&motor) as Arc<dyn Module>,
    ];

    let pair = ProcessPair::new(&config, txm, modules)?;
    pair.run(mode).await?;
    Ok(())
}
