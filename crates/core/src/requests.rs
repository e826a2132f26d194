// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-floor request bookkeeping shared by both node kinds.

use serde::{Deserialize, Serialize};

use crate::Direction;

/// Requests outstanding for one floor, as seen by an elevator node.
///
/// `call_up`/`call_down` mirror the hall buttons delegated by floor
/// panels; `cabin` is the destination button inside this cabin.
/// The top floor never has `call_up` set, floor 0 never `call_down`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRow {
    pub call_up: bool,
    pub call_down: bool,
    pub cabin: bool,
}

impl RequestRow {
    /// True if the hall call in `direction` is set.
    pub fn hall_call(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.call_up,
            Direction::Down => self.call_down,
            Direction::Stop => false,
        }
    }
}
