// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The floor-panel node: hall buttons, allocation, elevator monitoring.

mod hall_panel;
mod mirror;
mod monitor;
mod requests;
#[cfg(test)]
pub(crate) mod test_rig;

pub use hall_panel::{HallLamps, HallPanel};
pub use mirror::MirrorPanel;
pub use monitor::{ElevatorMonitor, MonitorState, ObservedElevator};
pub use requests::{DirSlot, HallCalls, RequestManager};

use std::sync::Arc;

use lift_core::Config;
use lift_driver::Driver;
use lift_txn::{Module, TransactionManager};
use lift_wire::{FLOOR_GET_ALL_REQUESTS, FLOOR_REQUEST_SERVED};
use tracing::info;

use crate::net::Network;
use crate::pair::{Mode, ProcessPair};
use crate::NodeError;

/// Compose and run a floor-panel node. Returns only when process pairs
/// are disabled; the caller keeps the process alive.
pub async fn run(config: Config, mode: Mode) -> Result<(), NodeError> {
    info!(node = config.node_name(), "floor node starting");

    let txm = Arc::new(TransactionManager::new());
    let net = Arc::new(Network::new(&config, Arc::clone(&txm))?);
    let backend = crate::backend_from_config(&config)?;
    let driver = Arc::new(Driver::new(Arc::clone(&txm), backend));

    let requests = RequestManager::new(&config, Arc::clone(&txm), Arc::clone(&net))?;
    let panel = HallPanel::new(&config, Arc::clone(&txm), Arc::clone(&driver), Arc::clone(&requests))?;
    let monitor = ElevatorMonitor::new(&config, Arc::clone(&txm), Arc::clone(&net), Arc::clone(&requests))?;
    requests.attach(&panel, &monitor);

    net.add_packet_handler(FLOOR_REQUEST_SERVED, &requests);
    net.add_packet_handler(FLOOR_GET_ALL_REQUESTS, &requests);

    txm.register(&driver);
    txm.register(&panel);
    txm.register(&requests);
    txm.register(&monitor);

    let modules: Vec<Arc<dyn Module>> = vec![
        Arc::clone(&net) as Arc<dyn Module>,
        Arc::clone(&driver) as Arc<dyn Module>,
        Arc::clone(&panel) as Arc<dyn Module>,
        Arc::clone(&requests) as Arc<dyn Module>,
        Arc::clone(&monitor) as Arc<dyn Module>,
    ];

    let pair = ProcessPair::new(&config, txm, modules)?;
    pair.run(mode).await?;
    Ok(())
}

/// Compose and run a read-only mirror node.
pub async fn run_mirror(config: Config, mode: Mode) -> Result<(), NodeError> {
    info!(node = config.node_name(), "mirror node starting");

    let txm = Arc::new(TransactionManager::new());
    let net = Arc::new(Network::new(&config, Arc::clone(&txm))?);
    let backend = crate::backend_from_config(&config)?;
    let driver = Arc::new(Driver::new(Arc::clone(&txm), backend));
    let mirror = MirrorPanel::new(&config, Arc::clone(&txm), Arc::clone(&net), Arc::clone(&driver))?;

    txm.register(&driver);
    txm.register(&mirror);

    let modules: Vec<Arc<dyn Module>> = vec![
        Arc::clone(&net) as Arc<dyn Module>,
        Arc::clone(&driver) as Arc<dyn Module>,
        Arc::clone(&mirror) as Arc<dyn Module>,
    ];

    let pair = ProcessPair::new(&config, txm, modules)?;
    pair.run(mode).await?;
    Ok(())
}
