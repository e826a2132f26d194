// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed payloads for the packet types nodes exchange.
//!
//! | type                     | direction        | reply                |
//! |--------------------------|------------------|----------------------|
//! | `elev_request_add`       | floor → elevator | `true` on accept     |
//! | `elev_state_get`         | floor → elevator | [`ElevStateReply`]   |
//! | `floor_request_served`   | elevator → floor | `true`               |
//! | `floor_get_all_requests` | mirror → floor   | `[call_up, call_down]` |

use lift_core::{Direction, Floor};
use serde::{Deserialize, Serialize};

pub const ELEV_REQUEST_ADD: &str = "elev_request_add";
pub const ELEV_STATE_GET: &str = "elev_state_get";
pub const FLOOR_REQUEST_SERVED: &str = "floor_request_served";
pub const FLOOR_GET_ALL_REQUESTS: &str = "floor_get_all_requests";

/// A hall call delegated by a floor panel to an elevator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElevRequestAdd {
    pub floor: Floor,
    pub direction: Direction,
}

/// A floor panel asking an elevator for its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElevStateGet {
    pub floor: Floor,
}

/// An elevator's answer to [`ElevStateGet`].
///
/// `serving_requests` holds the hall-call directions of the asking floor
/// that this elevator has accepted; `position` is the last reached floor
/// (0 until the motor has found one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElevStateReply {
    pub position: Floor,
    pub direction: Direction,
    pub serving_requests: Vec<Direction>,
    pub motor_stuck: bool,
}

/// An elevator reporting a hall call as served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorRequestServed {
    pub elevator: usize,
    pub direction: Direction,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
