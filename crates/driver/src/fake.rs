// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory backend for tests: records every write, serves scripted
//! sensor and button values.

use std::collections::HashMap;

use async_trait::async_trait;
use lift_core::{Direction, Floor};
use parking_lot::Mutex;

use crate::{Backend, ButtonKind, DriverError};

#[derive(Default)]
struct FakeState {
    connected: bool,
    motor: Direction,
    motor_log: Vec<Direction>,
    button_lamps: HashMap<(ButtonKind, Floor), bool>,
    floor_indicator: Option<Floor>,
    door_lamp: bool,
    stop_lamp: bool,
    buttons: HashMap<(ButtonKind, Floor), bool>,
    floor_sensor: Option<Floor>,
    stop_signal: bool,
    obstruction: bool,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fake whose floor sensor starts parked at `floor`.
    pub fn at_floor(floor: Floor) -> Self {
        let fake = Self::new();
        fake.set_floor_sensor(Some(floor));
        fake
    }

    // Scripting ---------------------------------------------------------

    pub fn set_floor_sensor(&self, floor: Option<Floor>) {
        self.state.lock().floor_sensor = floor;
    }

    pub fn press_button(&self, button: ButtonKind, floor: Floor) {
        self.state.lock().buttons.insert((button, floor), true);
    }

    pub fn release_button(&self, button: ButtonKind, floor: Floor) {
        self.state.lock().buttons.insert((button, floor), false);
    }

    /// Emulate motor-box power loss: the raw stop signal floats high.
    pub fn set_unpowered(&self, unpowered: bool) {
        self.state.lock().stop_signal = unpowered;
    }

    pub fn set_obstruction(&self, on: bool) {
        self.state.lock().obstruction = on;
    }

    // Assertions --------------------------------------------------------

    pub fn motor(&self) -> Direction {
        self.state.lock().motor
    }

    pub fn motor_log(&self) -> Vec<Direction> {
        self.state.lock().motor_log.clone()
    }

    pub fn button_lamp(&self, button: ButtonKind, floor: Floor) -> bool {
        *self.state.lock().button_lamps.get(&(button, floor)).unwrap_or(&false)
    }

    pub fn door_lamp(&self) -> bool {
        self.state.lock().door_lamp
    }

    pub fn stop_lamp(&self) -> bool {
        self.state.lock().stop_lamp
    }

    pub fn floor_indicator(&self) -> Option<Floor> {
        self.state.lock().floor_indicator
    }

    pub fn floor_sensor(&self) -> Option<Floor> {
        self.state.lock().floor_sensor
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn connect(&self) -> Result<(), DriverError> {
        self.state.lock().connected = true;
        Ok(())
    }

    async fn set_motor_direction(&self, direction: Direction) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.motor = direction;
        state.motor_log.push(direction);
        Ok(())
    }

    async fn set_button_lamp(
        &self,
        button: ButtonKind,
        floor: Floor,
        on: bool,
    ) -> Result<(), DriverError> {
        self.state.lock().button_lamps.insert((button, floor), on);
        Ok(())
    }

    async fn set_floor_indicator(&self, floor: Floor) -> Result<(), DriverError> {
        self.state.lock().floor_indicator = Some(floor);
        Ok(())
    }

    async fn set_door_open_lamp(&self, on: bool) -> Result<(), DriverError> {
        self.state.lock().door_lamp = on;
        Ok(())
    }

    async fn set_stop_lamp(&self, on: bool) -> Result<(), DriverError> {
        self.state.lock().stop_lamp = on;
        Ok(())
    }

    async fn button_signal(&self, button: ButtonKind, floor: Floor) -> Result<bool, DriverError> {
        Ok(*self.state.lock().buttons.get(&(button, floor)).unwrap_or(&false))
    }

    async fn floor_sensor_signal(&self) -> Result<Option<Floor>, DriverError> {
        Ok(self.state.lock().floor_sensor)
    }

    async fn stop_signal(&self) -> Result<bool, DriverError> {
        Ok(self.state.lock().stop_signal)
    }

    async fn obstruction_signal(&self) -> Result<bool, DriverError> {
        Ok(self.state.lock().obstruction)
    }
}
