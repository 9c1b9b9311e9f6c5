//! Shared fixtures for integration tests.
//!
//! Provides [`TestHarness`] which wires a [`StateRegistry`] to a [`Platform`],
//! and helpers writing host snapshots and config files into a temp dir.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use bitrate_scaler::config::EntryConfig;
use bitrate_scaler::platform::Platform;
use bitrate_scaler::sensor::SensorState;
use bitrate_scaler::state::StateRegistry;
use tokio::sync::broadcast;

/// Registry and platform sharing one event bus.
pub struct TestHarness {
    pub registry: StateRegistry,
    pub platform: Platform,
    pub updates: broadcast::Receiver<SensorState>,
}

impl TestHarness {
    /// Create a harness with an empty registry and no loaded entries.
    pub fn new() -> Self {
        let registry = StateRegistry::default();
        let platform = Platform::new(registry.clone());
        let updates = platform.subscribe();
        Self {
            registry,
            platform,
            updates,
        }
    }

    /// Wait for the next published sensor state.
    pub async fn next_update(&mut self) -> SensorState {
        tokio::time::timeout(Duration::from_secs(2), self.updates.recv())
            .await
            .expect("timed out waiting for a sensor update")
            .expect("update channel closed")
    }

    /// Skip everything published so far.
    pub fn drain(&mut self) {
        while self.updates.try_recv().is_ok() {}
    }
}

/// Entry over `sources` with default settings.
pub fn entry(sources: &[&str]) -> EntryConfig {
    EntryConfig::new(sources.iter().map(|s| s.to_string()).collect())
}

/// Write a host snapshot with the given `(entity_id, state)` pairs.
pub fn write_states(dir: &Path, states: &[(&str, &str)]) -> PathBuf {
    let states: Vec<serde_json::Value> = states
        .iter()
        .map(|(entity_id, state)| {
            serde_json::json!({
                "entity_id": entity_id,
                "state": state,
                "attributes": { "friendly_name": format!("Router {entity_id}") },
            })
        })
        .collect();
    let path = dir.join("states.json");
    std::fs::write(&path, serde_json::to_string_pretty(&states).unwrap()).unwrap();
    path
}

/// Write `content` as `config.toml` in `dir`.
pub fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}
