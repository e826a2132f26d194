// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Fatal node-startup errors. Everything after startup is handled in
/// place: RPC faults are values, transaction aborts roll back, pair
/// partners are respawned or promoted.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] lift_core::ConfigError),

    #[error(transparent)]
    Driver(#[from] lift_driver::DriverError),

    #[error(transparent)]
    Pair(#[from] crate::pair::PairError),
}
