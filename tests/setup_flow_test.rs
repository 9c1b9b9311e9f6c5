//! Integration tests for the guided setup: flow, config persistence and
//! loading the resulting entry.

mod common;

use std::io::Cursor;

use bitrate_core::PresentationMode;
use bitrate_scaler::config::{self, persist};
use bitrate_scaler::flow::{prompt, Flow, FlowStep, OptionsFlow, SetupFlow, ABORT_ALREADY_CONFIGURED};
use bitrate_scaler::platform::Platform;
use bitrate_scaler::state::{self, StateRegistry};
use common::write_states;
use tempfile::tempdir;

fn answer(flow: &dyn Flow, answers: &str) -> FlowStep {
    prompt::run_flow(flow, Cursor::new(answers.to_string()), std::io::sink()).unwrap()
}

#[test]
fn setup_from_snapshot_persists_entry() {
    let temp = tempdir().unwrap();
    let states_path = write_states(
        temp.path(),
        &[
            ("sensor.router.rx", "1000"),
            ("sensor.router.tx", "2000"),
            ("sensor.cpu_temp", "40"),
        ],
    );
    let config_path = temp.path().join("config.toml");

    let states = state::load_snapshot(&states_path).unwrap();
    let flow = SetupFlow::new(&states);
    assert_eq!(flow.candidates(), ["sensor.router.rx", "sensor.router.tx"]);

    let FlowStep::CreateEntry { entry, .. } =
        answer(&flow, "dynamic_unit\n1\n500000\nsensor.router.rx, sensor.router.tx\n")
    else {
        panic!("expected an entry");
    };
    persist::update_entries(&config_path, &[entry.clone()]).unwrap();

    let loaded = config::load_config(&config_path).unwrap();
    assert_eq!(loaded.entries, vec![entry]);
    let saved = &loaded.entries[0];
    assert_eq!(saved.mode, PresentationMode::DynamicUnitInState);
    assert_eq!(saved.precision, 1);
    assert_eq!(saved.threshold_kbit_to_mbit, 500_000.0);
}

#[test]
fn unknown_source_is_asked_again() {
    let states = vec![bitrate_scaler::state::SourceState::new("sensor.router.rx", "0")];
    let flow = SetupFlow::new(&states);

    let FlowStep::CreateEntry { entry, .. } =
        answer(&flow, "\n\n\nsensor.other.rx\nsensor.router.rx\n")
    else {
        panic!("expected an entry");
    };
    assert_eq!(entry.sources, ["sensor.router.rx"]);
}

#[test]
fn duplicate_setup_aborts() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("config.toml");

    let first = SetupFlow::new(&[]);
    let FlowStep::CreateEntry { entry, .. } = answer(&first, "\n\n\nsensor.wan.rx\n") else {
        panic!("expected an entry");
    };
    persist::update_entries(&config_path, &[entry]).unwrap();

    let existing = config::load_config(&config_path).unwrap().entries;
    let second = SetupFlow::new(&[]).with_existing(existing);
    assert_eq!(
        answer(&second, "\n\n\nsensor.wan.rx\n"),
        FlowStep::Abort {
            reason: ABORT_ALREADY_CONFIGURED.to_string()
        }
    );
}

#[test]
fn options_update_keeps_other_entries() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("config.toml");
    std::fs::write(
        &config_path,
        "# hand-written\n[runtime]\nevent_capacity = 64\n",
    )
    .unwrap();

    let a = common::entry(&["sensor.a.rx"]);
    let b = common::entry(&["sensor.b.tx"]);
    persist::update_entries(&config_path, &[a.clone(), b.clone()]).unwrap();

    let flow = OptionsFlow::new(a.clone(), &[]);
    let FlowStep::CreateEntry { entry: updated, .. } = answer(&flow, "dynamic\n0\n\n\n") else {
        panic!("expected an entry");
    };
    let mut config = config::load_config(&config_path).unwrap();
    config.upsert_entry(updated);
    persist::update_entries(&config_path, &config.entries).unwrap();

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("# hand-written"));

    let reloaded = config::load_config(&config_path).unwrap();
    assert_eq!(reloaded.runtime.event_capacity, 64);
    assert_eq!(reloaded.entries.len(), 2);
    let updated = reloaded.find_entry(a.entry_id).unwrap();
    assert_eq!(updated.mode, PresentationMode::DynamicUnitInState);
    assert_eq!(updated.precision, 0);
    assert_eq!(updated.sources, a.sources);
    assert_eq!(reloaded.find_entry(b.entry_id).unwrap(), &b);
}

#[tokio::test]
async fn created_entry_loads_on_platform() {
    let flow = SetupFlow::new(&[]);
    let FlowStep::CreateEntry { entry, .. } = answer(&flow, "\n3\n\nsensor.wan.tx\n") else {
        panic!("expected an entry");
    };

    let registry = StateRegistry::default();
    registry.set("sensor.wan.tx", "1234567");
    let platform = Platform::new(registry);
    let states = platform.setup_entry(entry).unwrap();

    assert_eq!(states[0].state.as_number(), Some(1234.567));
    assert_eq!(
        states[0].attributes["megabits_per_second"],
        serde_json::json!(1.235)
    );
}
