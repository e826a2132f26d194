// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Elevator simulator backend.
//!
//! Wire format (TCP): 4-byte request `[opcode, a, b, c]`. Reads are
//! answered with a 4-byte little-endian frame carrying the value in
//! byte 1 (the floor sensor uses byte 1 as "at a floor" and byte 2 as
//! the floor number). Writes are fire-and-forget.
//!
//! Opcodes: 1 set motor, 2 set button lamp, 3 set floor indicator,
//! 4 set door lamp, 5 set stop lamp, 6 read button, 7 read floor,
//! 8 read stop, 9 read obstruction.

use std::net::SocketAddr;

use async_trait::async_trait;
use lift_core::{Direction, Floor};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{Backend, ButtonKind, DriverError};

pub struct SimBackend {
    addr: SocketAddr,
    /// One request/response round trip at a time on the shared stream.
    stream: Mutex<Option<TcpStream>>,
}

impl SimBackend {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, stream: Mutex::new(None) }
    }

    async fn send(&self, msg: [u8; 4]) -> Result<(), DriverError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(DriverError::NotConnected)?;
        stream.write_all(&msg).await?;
        Ok(())
    }

    async fn send_and_receive(&self, msg: [u8; 4]) -> Result<[u8; 4], DriverError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(DriverError::NotConnected)?;
        stream.write_all(&msg).await?;

        let mut resp = [0u8; 4];
        stream
            .read_exact(&mut resp)
            .await
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::UnexpectedEof => DriverError::ShortResponse,
                _ => DriverError::Io(err),
            })?;
        Ok(resp)
    }
}

#[async_trait]
impl Backend for SimBackend {
    async fn connect(&self) -> Result<(), DriverError> {
        debug!(addr = %self.addr, "connecting to elevator simulator");
        let stream = TcpStream::connect(self.addr).await?;
        *self.stream.lock().await = Some(stream);
        Ok(())
    }

    async fn set_motor_direction(&self, direction: Direction) -> Result<(), DriverError> {
        // Two's-complement byte: Down (-1) goes on the wire as 0xff.
        self.send([1, direction.as_i8() as u8, 0, 0]).await
    }

    async fn set_button_lamp(
        &self,
        button: ButtonKind,
        floor: Floor,
        on: bool,
    ) -> Result<(), DriverError> {
        self.send([2, button.as_u8(), floor as u8, u8::from(on)]).await
    }

    async fn set_floor_indicator(&self, floor: Floor) -> Result<(), DriverError> {
        self.send([3, floor as u8, 0, 0]).await
    }

    async fn set_door_open_lamp(&self, on: bool) -> Result<(), DriverError> {
        self.send([4, u8::from(on), 0, 0]).await
    }

    async fn set_stop_lamp(&self, on: bool) -> Result<(), DriverError> {
        self.send([5, u8::from(on), 0, 0]).await
    }

    async fn button_signal(&self, button: ButtonKind, floor: Floor) -> Result<bool, DriverError> {
        let resp = self.send_and_receive([6, button.as_u8(), floor as u8, 0]).await?;
        Ok(resp[1] != 0)
    }

    async fn floor_sensor_signal(&self) -> Result<Option<Floor>, DriverError> {
        let resp = self.send_and_receive([7, 0, 0, 0]).await?;
        if resp[1] != 0 {
            Ok(Some(resp[2] as Floor))
        } else {
            Ok(None)
        }
    }

    async fn stop_signal(&self) -> Result<bool, DriverError> {
        let resp = self.send_and_receive([8, 0, 0, 0]).await?;
        Ok(resp[1] != 0)
    }

    async fn obstruction_signal(&self) -> Result<bool, DriverError> {
        let resp = self.send_and_receive([9, 0, 0, 0]).await?;
        Ok(resp[1] != 0)
    }
}

#[cfg(test)]
#[path = "sim_tests.rs"]
mod tests;
