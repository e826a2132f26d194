// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lift-node: the elevator-bank node processes.
//!
//! One binary, three node kinds: `elevator` (cabin, motor, FSM),
//! `floor` (hall panel, allocation, elevator monitor) and `mirror`
//! (read-only lamp board). Every node runs its modules under the
//! transaction manager and, when enabled, as a primary/backup process
//! pair.

mod error;

pub mod elevator;
pub mod floor;
pub mod net;
pub mod pair;

use std::sync::Arc;

use lift_core::Config;
use lift_driver::{Backend, SimBackend};

pub use error::NodeError;
pub use pair::Mode;

/// Pick the hardware backend named by `driver.type`.
///
/// Only the network simulator is linkable in this build; `Comedi` names
/// the lab's C driver and is refused at startup.
pub(crate) fn backend_from_config(config: &Config) -> Result<Arc<dyn Backend>, NodeError> {
    match config.get_str("driver", "type")? {
        "Simulation" => {
            let addr = config.addr("driver", "")?;
            Ok(Arc::new(SimBackend::new(addr)))
        }
        other => Err(NodeError::Driver(lift_driver::DriverError::Unsupported(
            other.to_string(),
        ))),
    }
}
