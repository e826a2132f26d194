// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lift_core::Direction;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::*;
use crate::{Backend, ButtonKind};

/// A one-connection scripted simulator: records request frames, answers
/// reads from a canned table.
async fn spawn_simulator() -> (std::net::SocketAddr, tokio::sync::mpsc::UnboundedReceiver<[u8; 4]>)
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        loop {
            let mut req = [0u8; 4];
            if stream.read_exact(&mut req).await.is_err() {
                return;
            }
            tx.send(req).ok();
            let reply: Option<[u8; 4]> = match req[0] {
                6 => Some([6, u8::from(req[1] == 2 && req[2] == 3), 0, 0]),
                7 => Some([7, 1, 2, 0]), // at floor 2
                8 => Some([8, 0, 0, 0]),
                9 => Some([9, 1, 0, 0]),
                _ => None, // writes have no response
            };
            if let Some(frame) = reply {
                stream.write_all(&frame).await.unwrap();
            }
        }
    });

    (addr, rx)
}

#[tokio::test]
async fn writes_use_documented_opcodes() {
    let (addr, mut frames) = spawn_simulator().await;
    let sim = SimBackend::new(addr);
    sim.connect().await.unwrap();

    sim.set_motor_direction(Direction::Down).await.unwrap();
    sim.set_button_lamp(ButtonKind::CallDown, 1, true).await.unwrap();
    sim.set_floor_indicator(3).await.unwrap();
    sim.set_door_open_lamp(true).await.unwrap();
    sim.set_stop_lamp(false).await.unwrap();
    // A read forces all writes to have been flushed in order.
    sim.stop_signal().await.unwrap();

    assert_eq!(frames.recv().await.unwrap(), [1, 0xff, 0, 0]); // Down as two's complement
    assert_eq!(frames.recv().await.unwrap(), [2, 1, 1, 1]);
    assert_eq!(frames.recv().await.unwrap(), [3, 3, 0, 0]);
    assert_eq!(frames.recv().await.unwrap(), [4, 1, 0, 0]);
    assert_eq!(frames.recv().await.unwrap(), [5, 0, 0, 0]);
    assert_eq!(frames.recv().await.unwrap(), [8, 0, 0, 0]);
}

#[tokio::test]
async fn reads_decode_reply_frames() {
    let (addr, _frames) = spawn_simulator().await;
    let sim = SimBackend::new(addr);
    sim.connect().await.unwrap();

    assert!(sim.button_signal(ButtonKind::Command, 3).await.unwrap());
    assert!(!sim.button_signal(ButtonKind::CallUp, 0).await.unwrap());
    assert_eq!(sim.floor_sensor_signal().await.unwrap(), Some(2));
    assert!(!sim.stop_signal().await.unwrap());
    assert!(sim.obstruction_signal().await.unwrap());
}

#[tokio::test]
async fn operations_before_connect_fail() {
    let (addr, _frames) = spawn_simulator().await;
    let sim = SimBackend::new(addr);

    let err = sim.set_motor_direction(Direction::Up).await.unwrap_err();
    assert!(matches!(err, DriverError::NotConnected));
}
