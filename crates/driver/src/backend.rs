// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The hardware operations every backend must provide.

use async_trait::async_trait;
use lift_core::{Direction, Floor};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("driver not started")]
    NotConnected,

    #[error("short response from simulator")]
    ShortResponse,

    #[error("unsupported driver backend: {0}")]
    Unsupported(String),
}

/// The three button groups on the boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonKind {
    /// Hall panel "up" button
    CallUp,
    /// Hall panel "down" button
    CallDown,
    /// Cabin destination button
    Command,
}

impl ButtonKind {
    pub fn as_u8(self) -> u8 {
        match self {
            ButtonKind::CallUp => 0,
            ButtonKind::CallDown => 1,
            ButtonKind::Command => 2,
        }
    }
}

/// Raw hardware operations.
///
/// Backends do not apply the power-loss guard; [`Driver`](crate::Driver)
/// layers it on top.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Bring the link to the hardware up. Called once, at module start.
    async fn connect(&self) -> Result<(), DriverError>;

    async fn set_motor_direction(&self, direction: Direction) -> Result<(), DriverError>;

    async fn set_button_lamp(
        &self,
        button: ButtonKind,
        floor: Floor,
        on: bool,
    ) -> Result<(), DriverError>;

    async fn set_floor_indicator(&self, floor: Floor) -> Result<(), DriverError>;

    async fn set_door_open_lamp(&self, on: bool) -> Result<(), DriverError>;

    async fn set_stop_lamp(&self, on: bool) -> Result<(), DriverError>;

    async fn button_signal(&self, button: ButtonKind, floor: Floor) -> Result<bool, DriverError>;

    /// The floor sensor: `Some(floor)` at a floor, `None` between floors.
    async fn floor_sensor_signal(&self) -> Result<Option<Floor>, DriverError>;

    async fn stop_signal(&self) -> Result<bool, DriverError>;

    async fn obstruction_signal(&self) -> Result<bool, DriverError>;
}
