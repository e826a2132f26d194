// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composed floor-node fixture plus a scripted elevator peer. No loops
//! are started unless a test starts a module explicitly.

use std::net::SocketAddr;
use std::sync::Arc;

use lift_core::{Config, Direction, Floor};
use lift_driver::{Backend, Driver, FakeBackend};
use lift_txn::{Module, TransactionManager};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::floor::{ElevatorMonitor, HallPanel, ObservedElevator, RequestManager};
use crate::net::Network;

/// The floor the rig's panel sits on.
pub(crate) const RIG_FLOOR: Floor = 1;
pub(crate) const FLOOR_COUNT: usize = 4;

pub(crate) fn dead_addr() -> SocketAddr {
    // Nothing listens on the discard port.
    "127.0.0.1:9".parse().expect("addr")
}

pub(crate) fn floor_config(e0: SocketAddr, e1: SocketAddr) -> Config {
    let text = format!(
        r#"
[core]
floor_number = {FLOOR_COUNT}
elevator_number = 2

[floor]
floor = {RIG_FLOOR}
ui_monitor_period = 0.02
elevator_monitor_period = 0.02
elevator_monitor_attempts = 2
readonly_period = 0.02

[network]
port = 0
timeout = 0.05
buffer_size = 1024

[network.elevator_0]
ip_address = "127.0.0.1"
port = {p0}

[network.elevator_1]
ip_address = "127.0.0.1"
port = {p1}
"#,
        p0 = e0.port(),
        p1 = e1.port(),
    );
    Config::from_table(text.parse().expect("test config parses"), "floor_1")
}

/// A scripted elevator: answers every packet with a fixed reply and
/// records what it received.
pub(crate) struct FakeElevator {
    pub addr: SocketAddr,
    pub received: mpsc::UnboundedReceiver<lift_wire::Packet>,
}

impl FakeElevator {
    pub async fn spawn(reply: serde_json::Value) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
        let addr = socket.local_addr().expect("local addr");
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 1024];
            loop {
                let Ok((len, src)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                if let Ok(packet) = lift_wire::decode(&buf[..len]) {
                    tx.send(packet).ok();
                }
                if let Ok(bytes) = serde_json::to_vec(&reply) {
                    socket.send_to(&bytes, src).await.ok();
                }
            }
        });

        Self { addr, received: rx }
    }

    /// Next recorded packet, or panic if none arrives in time.
    pub async fn expect_packet(&mut self) -> lift_wire::Packet {
        tokio::time::timeout(std::time::Duration::from_millis(500), self.received.recv())
            .await
            .expect("peer saw a packet")
            .expect("recorder alive")
    }

    pub fn no_packet(&mut self) -> bool {
        self.received.try_recv().is_err()
    }
}

pub(crate) struct FloorRig {
    pub txm: Arc<TransactionManager>,
    pub fake: Arc<FakeBackend>,
    pub requests: Arc<RequestManager>,
    pub panel: Arc<HallPanel>,
    pub monitor: Arc<ElevatorMonitor>,
}

impl FloorRig {
    pub async fn new(e0: SocketAddr, e1: SocketAddr) -> Self {
        let config = floor_config(e0, e1);
        let txm = Arc::new(TransactionManager::new());
        let net = Arc::new(Network::new(&config, Arc::clone(&txm)).expect("network"));
        let fake = Arc::new(FakeBackend::new());
        let driver = Arc::new(Driver::new(
            Arc::clone(&txm),
            Arc::clone(&fake) as Arc<dyn Backend>,
        ));
        let requests =
            RequestManager::new(&config, Arc::clone(&txm), Arc::clone(&net)).expect("requests");
        let panel = HallPanel::new(
            &config,
            Arc::clone(&txm),
            Arc::clone(&driver),
            Arc::clone(&requests),
        )
        .expect("panel");
        let monitor = ElevatorMonitor::new(
            &config,
            Arc::clone(&txm),
            Arc::clone(&net),
            Arc::clone(&requests),
        )
        .expect("monitor");
        requests.attach(&panel, &monitor);

        txm.register(&driver);
        txm.register(&panel);
        txm.register(&requests);
        txm.register(&monitor);

        Self { txm, fake, requests, panel, monitor }
    }

    /// Seed what the monitor believes about the two elevators.
    pub async fn seed_monitor(&self, elevators: Vec<ObservedElevator>) {
        let tid = self.txm.start().await;
        self.monitor.import_state(tid, serde_json::json!({ "elevators": elevators }));
        self.txm.finish(tid).await;
    }

    pub fn observed(position: Floor, direction: Direction) -> ObservedElevator {
        ObservedElevator {
            position,
            direction,
            is_connected: true,
            motor_stuck: false,
            serving_requests: Vec::new(),
        }
    }

    /// Raise a hall call the way the panel would: lamp and request in
    /// one transaction. Returns whether the transaction committed.
    pub async fn press(&self, direction: Direction) -> bool {
        let tid = self.txm.start().await;
        self.panel.import_state(
            tid,
            serde_json::json!({
                "light_up": direction == Direction::Up,
                "light_down": direction == Direction::Down,
            }),
        );
        self.requests.add_request(tid, direction).await;
        self.txm.finish(tid).await
    }

    pub async fn calls(&self) -> crate::floor::HallCalls {
        let tid = self.txm.start().await;
        let state = self.requests.export_state(tid);
        self.txm.finish(tid).await;
        serde_json::from_value(state).expect("hall calls")
    }

    pub async fn lamps(&self) -> crate::floor::HallLamps {
        let tid = self.txm.start().await;
        let state = self.panel.export_state(tid);
        self.txm.finish(tid).await;
        serde_json::from_value(state).expect("hall lamps")
    }

    pub async fn state_changed(&self, elevator: usize, state: &ObservedElevator) -> bool {
        let tid = self.txm.start().await;
        self.requests.on_elevator_state_changed(tid, elevator, state).await;
        self.txm.finish(tid).await
    }
}
