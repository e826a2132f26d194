// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write as _;
use std::time::Duration;

use super::*;

const SAMPLE: &str = r#"
[core]
floor_number = 4
elevator_number = 2

[network]
timeout = 0.5
buffer_size = 1024

[network.elevator_0]
ip_address = "127.0.0.1"
port = 17100

[network.floor_1]
ip_address = "127.0.0.1"
port = 17201

[elevator]
stay_time = 3.0

[elevator.elevator_0]
stay_time = 5
"#;

fn sample(node: &str) -> Config {
    let table = SAMPLE.parse::<toml::Table>().unwrap();
    Config::from_table(table, node)
}

#[test]
fn load_reads_file_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();

    let config = Config::load(file.path(), "floor_0").unwrap();
    assert_eq!(config.get_int("core", "floor_number").unwrap(), 4);
    assert_eq!(config.node_name(), "floor_0");
}

#[test]
fn load_missing_file_is_fatal() {
    let err = Config::load(std::path::Path::new("/nonexistent/liftbank.toml"), "floor_0");
    assert!(matches!(err, Err(ConfigError::Read { .. })));
}

#[test]
fn load_rejects_malformed_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"[core\nfloor_number = ").unwrap();

    let err = Config::load(file.path(), "floor_0");
    assert!(matches!(err, Err(ConfigError::Parse { .. })));
}

#[test]
fn node_override_beats_generic_section() {
    let config = sample("elevator_0");
    assert_eq!(config.get_float("elevator", "stay_time").unwrap(), 5.0);

    let other = sample("elevator_1");
    assert_eq!(other.get_float("elevator", "stay_time").unwrap(), 3.0);
}

#[test]
fn dotted_keys_reach_peer_tables() {
    let config = sample("floor_0");
    assert_eq!(config.get_str("network", "elevator_0.ip_address").unwrap(), "127.0.0.1");
    assert_eq!(config.get_int("network", "elevator_0.port").unwrap(), 17100);
}

#[test]
fn peer_addr_builds_socket_addr() {
    let config = sample("floor_0");
    let addr = config.peer_addr("floor_1").unwrap();
    assert_eq!(addr.to_string(), "127.0.0.1:17201");
}

#[test]
fn peer_addr_rejects_bad_ip() {
    let table = r#"
[network]
"bad.ip_address" = "not-an-ip"
"bad.port" = 1
"#
    .parse::<toml::Table>()
    .unwrap();
    let config = Config::from_table(table, "floor_0");
    assert!(matches!(config.peer_addr("bad"), Err(ConfigError::BadAddress { .. })));
}

#[test]
fn missing_key_errors() {
    let config = sample("floor_0");
    let err = config.get_int("core", "no_such_key");
    assert!(matches!(err, Err(ConfigError::Missing { .. })));
}

#[test]
fn wrong_type_errors() {
    let config = sample("floor_0");
    let err = config.get_int("network", "elevator_0.ip_address");
    assert!(matches!(err, Err(ConfigError::WrongType { .. })));
}

#[test]
fn defaults_apply_only_when_missing() {
    let config = sample("floor_0");
    assert_eq!(config.get_float_or("network", "timeout", 9.0).unwrap(), 0.5);
    assert_eq!(config.get_int_or("network", "retries", 3).unwrap(), 3);

    // Present but mistyped still errors
    assert!(config.get_int_or("network", "elevator_0.ip_address", 3).is_err());
}

#[test]
fn durations_accept_floats_and_integers() {
    let config = sample("elevator_1");
    assert_eq!(
        config.get_duration("elevator", "stay_time").unwrap(),
        Duration::from_secs(3)
    );
    assert_eq!(
        config
            .get_duration_or("elevator", "door_time", Duration::from_millis(250))
            .unwrap(),
        Duration::from_millis(250)
    );
}

#[test]
fn get_usize_rejects_negative() {
    let table = "[core]\nfloor_number = -1\n".parse::<toml::Table>().unwrap();
    let config = Config::from_table(table, "floor_0");
    assert!(config.get_usize("core", "floor_number").is_err());
}
