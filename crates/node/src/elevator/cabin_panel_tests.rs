// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use lift_core::Direction;
use lift_driver::ButtonKind;

use super::*;
use crate::elevator::test_rig::ElevatorRig;

async fn start_panel(rig: &ElevatorRig) {
    let tid = rig.txm.start().await;
    Module::start(&*rig.panel, tid).await;
    rig.txm.finish(tid).await;
}

#[tokio::test]
async fn commit_flushes_queued_lamp_state() {
    let rig = ElevatorRig::new().await;
    start_panel(&rig).await;

    let tid = rig.txm.start().await;
    rig.panel.set_door_open_light(tid, true);
    rig.panel.set_floor_indicator(tid, 2);
    assert!(rig.txm.finish(tid).await);

    assert!(rig.fake.door_lamp());
    assert_eq!(rig.fake.floor_indicator(), Some(2));
}

#[tokio::test]
async fn abort_leaves_the_hardware_alone() {
    let rig = ElevatorRig::new().await;
    start_panel(&rig).await;

    // Another joined resource vetoes: nothing queued here may reach the
    // driver, and the queued state rolls back.
    let tid = rig.txm.start().await;
    rig.panel.set_door_open_light(tid, true);
    rig.panel.set_floor_indicator(tid, 3);
    rig.saboteur.doom(tid);
    assert!(!rig.txm.finish(tid).await);

    assert!(!rig.fake.door_lamp());
    assert_eq!(rig.fake.floor_indicator(), None);
    assert!(!rig.door_open().await);
}

#[tokio::test]
async fn unstarted_panel_never_touches_the_driver() {
    let rig = ElevatorRig::new().await;

    let tid = rig.txm.start().await;
    rig.panel.set_door_open_light(tid, true);
    assert!(rig.txm.finish(tid).await);

    assert!(!rig.fake.door_lamp());
}

#[tokio::test]
async fn button_edge_raises_lamp_and_request_together() {
    let rig = ElevatorRig::new().await;
    start_panel(&rig).await;

    rig.fake.press_button(ButtonKind::Command, 2);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(rig.request_row(2).await.cabin);
    assert!(rig.cabin_lamp(2).await);
    assert!(rig.fake.button_lamp(ButtonKind::Command, 2));
}

#[tokio::test]
async fn holding_the_button_fires_once() {
    let rig = ElevatorRig::new().await;
    start_panel(&rig).await;

    rig.fake.press_button(ButtonKind::Command, 1);
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Clear the bit behind the panel's back; a held button must not
    // re-raise it.
    let tid = rig.txm.start().await;
    rig.requests.set_request_served(tid, 1, Direction::Stop).await;
    rig.txm.finish(tid).await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(!rig.request_row(1).await.cabin);

    // Release and press again: a new edge, a new request.
    rig.fake.release_button(ButtonKind::Command, 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    rig.fake.press_button(ButtonKind::Command, 1);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(rig.request_row(1).await.cabin);
}

#[tokio::test]
async fn turn_button_light_off_clears_on_commit() {
    let rig = ElevatorRig::new().await;
    start_panel(&rig).await;

    rig.delegate_cabin_with_lamp(3).await;
    let tid = rig.txm.start().await;
    rig.panel.turn_button_light_off(tid, 3);
    rig.txm.finish(tid).await;

    assert!(!rig.cabin_lamp(3).await);
    assert!(!rig.fake.button_lamp(ButtonKind::Command, 3));
}
