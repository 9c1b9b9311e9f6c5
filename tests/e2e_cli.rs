//! CLI end-to-end tests
//!
//! Tests for the bitrate-scaler command-line interface.

mod common;

use predicates::prelude::*;
use std::fs;
use assert_cmd::Command;
use tempfile::tempdir;

/// Get a command for the bitrate-scaler binary
#[allow(deprecated)]
fn scaler_cmd() -> Command {
    Command::cargo_bin("bitrate-scaler").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = scaler_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = scaler_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bitrate-scaler"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_flag() {
    let mut cmd = scaler_cmd();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bitrate-scaler"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = scaler_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_run_help() {
    let mut cmd = scaler_cmd();
    cmd.args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from stdin"));
}

#[test]
fn test_cli_convert_dynamic() {
    let mut cmd = scaler_cmd();
    cmd.args(["convert", "500000", "--mode", "dynamic_unit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("500.00 kbit/s"));
}

#[test]
fn test_cli_convert_dynamic_at_threshold() {
    let mut cmd = scaler_cmd();
    cmd.args(["convert", "1000000", "--mode", "dynamic", "--precision", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0 Mbit/s"));
}

#[test]
fn test_cli_convert_fixed_shows_attribute() {
    let mut cmd = scaler_cmd();
    cmd.args(["convert", "2500000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2500.00 kbit/s"))
        .stdout(predicate::str::contains("megabits_per_second: 2.5"));
}

#[test]
fn test_cli_convert_json() {
    let output = scaler_cmd()
        .args(["convert", "2500", "--mode", "dynamic_unit", "--precision", "0", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["display_value"], 3.0);
    assert_eq!(json["unit"], "kbit/s");
}

#[test]
fn test_cli_convert_unavailable() {
    let mut cmd = scaler_cmd();
    cmd.args(["convert", "unknown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unavailable"));
}

#[test]
fn test_cli_convert_negative_fails() {
    let mut cmd = scaler_cmd();
    cmd.args(["convert", "-5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid reading"));
}

#[test]
fn test_cli_convert_bad_mode_fails() {
    let mut cmd = scaler_cmd();
    cmd.args(["convert", "1000", "--mode", "sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sideways"));
}

#[test]
fn test_cli_sources_lists_rx_tx() {
    let temp = tempdir().unwrap();
    let states = common::write_states(
        temp.path(),
        &[
            ("sensor.router.tx", "1"),
            ("sensor.router.rx", "1"),
            ("sensor.uptime", "5"),
            ("binary_sensor.link.rx", "on"),
        ],
    );

    let mut cmd = scaler_cmd();
    cmd.arg("sources")
        .arg("--states")
        .arg(&states)
        .assert()
        .success()
        .stdout(predicate::eq("sensor.router.rx\nsensor.router.tx\n"));
}

#[test]
fn test_cli_validate_config() {
    let temp = tempdir().unwrap();
    let config = common::write_config(
        temp.path(),
        r#"
[runtime]
event_capacity = 32

[[entries]]
entry_id = "6f1c2f5e-8d0c-4b7a-9a55-0d6f4c1b2e3a"
sources = ["sensor.wan.rx", "sensor.wan.tx"]
mode = "dynamic_unit"
precision = 1
"#,
    );

    let mut cmd = scaler_cmd();
    cmd.arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"))
        .stdout(predicate::str::contains("Entries: 1"));
}

#[test]
fn test_cli_validate_rejects_bad_precision() {
    let temp = tempdir().unwrap();
    let config = common::write_config(
        temp.path(),
        r#"
[[entries]]
sources = ["sensor.wan.rx"]
precision = 9
"#,
    );

    let mut cmd = scaler_cmd();
    cmd.arg("validate").arg(&config).assert().failure();
}

#[test]
fn test_cli_setup_writes_config() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("nested").join("config.toml");

    let mut cmd = scaler_cmd();
    cmd.arg("--config")
        .arg(&config)
        .arg("setup")
        .write_stdin("dynamic_unit\n\n\nsensor.wan.rx\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created entry"));

    let content = fs::read_to_string(&config).unwrap();
    assert!(content.contains("sensor.wan.rx"));
    assert!(content.contains("dynamic_unit"));

    // Same sources again is refused.
    let mut cmd = scaler_cmd();
    cmd.arg("--config")
        .arg(&config)
        .arg("setup")
        .write_stdin("\n\n\nsensor.wan.rx\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already_configured"));
}

#[test]
fn test_cli_setup_rejects_unknown_source() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("config.toml");
    let states = common::write_states(temp.path(), &[("sensor.router.rx", "0")]);

    // Input ends before a valid source is given.
    let mut cmd = scaler_cmd();
    cmd.arg("--config")
        .arg(&config)
        .arg("setup")
        .arg("--states")
        .arg(&states)
        .write_stdin("\n\n\nsensor.other.rx\n")
        .assert()
        .failure()
        .stdout(predicate::str::contains("not one of the available sources"));
    assert!(!config.exists());
}

#[test]
fn test_cli_configure_updates_entry() {
    let temp = tempdir().unwrap();
    let config = common::write_config(
        temp.path(),
        r#"
[[entries]]
entry_id = "6f1c2f5e-8d0c-4b7a-9a55-0d6f4c1b2e3a"
sources = ["sensor.wan.rx"]
"#,
    );

    let mut cmd = scaler_cmd();
    cmd.arg("--config")
        .arg(&config)
        .args(["configure", "6f1c2f5e-8d0c-4b7a-9a55-0d6f4c1b2e3a"])
        .write_stdin("\n4\n\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated entry"));

    let content = fs::read_to_string(&config).unwrap();
    assert!(content.contains("precision = 4"));
    assert!(content.contains("6f1c2f5e-8d0c-4b7a-9a55-0d6f4c1b2e3a"));
}

#[test]
fn test_cli_configure_unknown_entry_fails() {
    let temp = tempdir().unwrap();
    let config = common::write_config(temp.path(), "");

    let mut cmd = scaler_cmd();
    cmd.arg("--config")
        .arg(&config)
        .args(["configure", "6f1c2f5e-8d0c-4b7a-9a55-0d6f4c1b2e3a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_cli_run_streams_sensor_states() {
    let temp = tempdir().unwrap();
    let config = common::write_config(
        temp.path(),
        r#"
[[entries]]
sources = ["sensor.wan.rx"]
mode = "dynamic_unit"
precision = 1
"#,
    );
    let states = common::write_states(temp.path(), &[("sensor.wan.rx", "500000")]);

    let output = scaler_cmd()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg("--states")
        .arg(&states)
        .write_stdin("# comment\nsensor.wan.rx 2500000\nsensor.wan.rx unavailable\n")
        .output()
        .unwrap();
    assert!(output.status.success());

    let lines: Vec<serde_json::Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| l["entity_id"] == "sensor.wan_rx_scaled"));
    assert_eq!(lines[0]["state"], 500.0);
    assert_eq!(lines[0]["unit_of_measurement"], "kbit/s");
    assert_eq!(lines[1]["state"], 2.5);
    assert_eq!(lines[1]["unit_of_measurement"], "Mbit/s");
    assert_eq!(lines[1]["name"], "Router sensor.wan.rx (scaled)");
    assert_eq!(lines[2]["state"], "unavailable");
}

#[test]
fn test_cli_run_without_entries_fails() {
    let temp = tempdir().unwrap();
    let config = common::write_config(temp.path(), "[runtime]\n");

    let mut cmd = scaler_cmd();
    cmd.arg("--config")
        .arg(&config)
        .arg("run")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("setup"));
}
