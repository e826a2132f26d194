// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composed elevator-node fixture for module tests. No loops are
//! started; tests drive ticks and handlers directly.

use std::sync::Arc;

use lift_core::{Config, Direction, FakeClock, Floor, RequestRow};
use lift_driver::{Backend, Driver, FakeBackend};
use lift_txn::{Module, TransactionManager, TxnId};
use lift_wire::ELEV_REQUEST_ADD;

use crate::elevator::{CabinPanel, CtrlState, ElevatorController, MotorController, Phase, RequestManager};
use crate::net::{Network, PacketHandler};

const FLOOR_COUNT: usize = 4;

const CONFIG: &str = r#"
[core]
floor_number = 4
elevator_number = 1

[elevator]
elevator = 0
elevator_control_period = 0.02
stay_time = 3.0
motor_controller_period = 0.05
motor_stuck_timeout = 0.2
ui_monitor_period = 0.02

[network]
port = 0
timeout = 0.05
buffer_size = 1024

[network.floor_0]
ip_address = "127.0.0.1"
port = 1

[network.floor_1]
ip_address = "127.0.0.1"
port = 1

[network.floor_2]
ip_address = "127.0.0.1"
port = 1

[network.floor_3]
ip_address = "127.0.0.1"
port = 1
"#;

pub(crate) fn elevator_config() -> Config {
    Config::from_table(CONFIG.parse().expect("test config parses"), "elevator_0")
}

pub(crate) fn row(call_up: bool, call_down: bool, cabin: bool) -> RequestRow {
    RequestRow { call_up, call_down, cabin }
}

/// A registered resource that can doom any transaction, standing in for
/// "some other module's work failed".
pub(crate) struct Saboteur {
    cell: lift_txn::StateCell<bool>,
}

impl Saboteur {
    fn new(txm: Arc<TransactionManager>) -> Arc<Self> {
        Arc::new(Self { cell: lift_txn::StateCell::new("saboteur", txm, false) })
    }

    pub fn doom(&self, tid: TxnId) {
        self.cell.set_can_commit(tid, false);
    }
}

lift_txn::impl_resource!(Saboteur, cell);

pub(crate) struct ElevatorRig {
    pub txm: Arc<TransactionManager>,
    pub fake: Arc<FakeBackend>,
    pub driver: Arc<Driver>,
    pub requests: Arc<RequestManager>,
    pub panel: Arc<CabinPanel>,
    pub motor: Arc<MotorController>,
    pub controller: Arc<ElevatorController<FakeClock>>,
    pub clock: FakeClock,
    pub saboteur: Arc<Saboteur>,
}

impl ElevatorRig {
    pub async fn new() -> Self {
        let config = elevator_config();
        let txm = Arc::new(TransactionManager::new());
        let net = Arc::new(Network::new(&config, Arc::clone(&txm)).expect("network"));
        let fake = Arc::new(FakeBackend::new());
        let driver = Arc::new(Driver::new(
            Arc::clone(&txm),
            Arc::clone(&fake) as Arc<dyn Backend>,
        ));
        let requests =
            RequestManager::new(&config, Arc::clone(&txm), Arc::clone(&net)).expect("requests");
        let panel = CabinPanel::new(
            &config,
            Arc::clone(&txm),
            Arc::clone(&driver),
            Arc::clone(&requests),
        )
        .expect("panel");
        requests.attach_panel(&panel);
        let motor =
            MotorController::new(&config, Arc::clone(&txm), Arc::clone(&driver)).expect("motor");
        let clock = FakeClock::new();
        let controller = ElevatorController::new(
            &config,
            Arc::clone(&txm),
            Arc::clone(&requests),
            Arc::clone(&motor),
            Arc::clone(&panel),
            clock.clone(),
        )
        .expect("controller");

        let saboteur = Saboteur::new(Arc::clone(&txm));

        txm.register(&driver);
        txm.register(&panel);
        txm.register(&requests);
        txm.register(&controller);
        txm.register(&motor);
        txm.register(&saboteur);

        Self { txm, fake, driver, requests, panel, motor, controller, clock, saboteur }
    }

    pub async fn controller_tick(&self) {
        let tid = self.txm.start().await;
        self.controller.tick(tid).await;
        self.txm.finish(tid).await;
    }

    /// Put the motor at `floor` with the given commanded direction.
    pub async fn set_motor(&self, floor: Floor, direction: Direction) {
        let tid = self.txm.start().await;
        self.motor.import_state(
            tid,
            serde_json::json!({
                "target_floor": floor,
                "prev_floor": floor,
                "direction": direction.as_i8(),
                "stuck_counter": 0,
                "is_stuck": false,
            }),
        );
        self.txm.finish(tid).await;
    }

    pub async fn set_ctrl(&self, phase: Phase, direction: Direction, stay_since: Option<u64>) {
        let state = CtrlState { phase, direction, stay_since };
        let tid = self.txm.start().await;
        self.controller
            .import_state(tid, serde_json::to_value(state).expect("ctrl state"));
        self.txm.finish(tid).await;
    }

    pub async fn ctrl_state(&self) -> CtrlState {
        let tid = self.txm.start().await;
        let state = self.controller.export_state(tid);
        self.txm.finish(tid).await;
        serde_json::from_value(state).expect("ctrl state")
    }

    pub async fn motor_target(&self) -> Floor {
        let tid = self.txm.start().await;
        let state = self.motor.export_state(tid);
        self.txm.finish(tid).await;
        serde_json::from_value(state["target_floor"].clone()).expect("target floor")
    }

    pub async fn delegate_cabin(&self, floor: Floor) {
        let tid = self.txm.start().await;
        self.requests.add_cabin_request(tid, floor);
        self.txm.finish(tid).await;
    }

    /// Cabin request with its button lamp lit, as the panel would do it.
    pub async fn delegate_cabin_with_lamp(&self, floor: Floor) {
        let mut lamps = vec![false; FLOOR_COUNT];
        lamps[floor] = true;

        let tid = self.txm.start().await;
        self.panel.import_state(
            tid,
            serde_json::json!({"lamps": lamps, "door_open": false, "indicator": 0}),
        );
        self.requests.add_cabin_request(tid, floor);
        self.txm.finish(tid).await;
    }

    /// Deliver an `elev_request_add` packet through the real handler.
    pub async fn delegate_hall_call(&self, floor: Floor, direction: Direction) {
        let tid = self.txm.start().await;
        let reply = PacketHandler::handle(
            &*self.requests,
            tid,
            ELEV_REQUEST_ADD,
            "127.0.0.1:9".parse().expect("addr"),
            serde_json::json!({"floor": floor, "direction": direction.as_i8()}),
        )
        .await;
        assert_eq!(reply, serde_json::Value::Bool(true));
        self.txm.finish(tid).await;
    }

    pub async fn request_row(&self, floor: Floor) -> RequestRow {
        let tid = self.txm.start().await;
        let rows = self.requests.current_requests(tid);
        self.txm.finish(tid).await;
        rows[floor]
    }

    async fn panel_state(&self) -> serde_json::Value {
        let tid = self.txm.start().await;
        let state = self.panel.export_state(tid);
        self.txm.finish(tid).await;
        state
    }

    pub async fn door_open(&self) -> bool {
        self.panel_state().await["door_open"].as_bool().unwrap_or(false)
    }

    pub async fn cabin_lamp(&self, floor: Floor) -> bool {
        self.panel_state().await["lamps"][floor].as_bool().unwrap_or(false)
    }

    pub async fn indicator(&self) -> Floor {
        self.panel_state().await["indicator"].as_u64().unwrap_or(0) as Floor
    }
}
