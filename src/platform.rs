//! Config-entry lifecycle.
//!
//! Loading an entry creates one [`ScaledSensor`] per source and spawns a task
//! that re-renders a sensor whenever its source changes. Rendered states are
//! published on a broadcast channel.
//!
//! Each task also watches a per-entry [`TaskState`]. Unloading sets it to
//! `Stopped` and the task exits before handling another event. Shutdown sets
//! it to `Draining` and broadcasts [`EventPayload::EntryUnloaded`]; the task
//! handles every event queued before that marker and then exits. A task that
//! lags while draining refreshes its sensors and exits at once.

use bitrate_core::events::{Event, EventPayload};
use bitrate_core::{EntryId, Error, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::EntryConfig;
use crate::sensor::{available_entity_id, ScaledSensor, SensorState};
use crate::state::StateRegistry;

/// Lifecycle signal from the platform to an entry's task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Running,
    Draining,
    Stopped,
}

struct LoadedEntry {
    entry: EntryConfig,
    sensors: Arc<Vec<ScaledSensor>>,
    task: JoinHandle<()>,
    state: watch::Sender<TaskState>,
}

/// Hosts the scaled sensors of every loaded config entry.
pub struct Platform {
    registry: StateRegistry,
    entries: Mutex<HashMap<EntryId, LoadedEntry>>,
    updates: broadcast::Sender<SensorState>,
}

impl Platform {
    pub fn new(registry: StateRegistry) -> Self {
        Self::with_capacity(registry, 256)
    }

    /// `capacity` bounds the published-state channel per subscriber.
    pub fn with_capacity(registry: StateRegistry, capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(capacity);
        Self {
            registry,
            entries: Mutex::new(HashMap::new()),
            updates,
        }
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    /// Receive every sensor state the platform publishes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SensorState> {
        self.updates.subscribe()
    }

    /// Load `entry` and return the initial state of each of its sensors.
    ///
    /// A sensor whose derived entity id is already used by a loaded sensor
    /// gets a `_2`, `_3`, ... suffix.
    ///
    /// Must be called from within a tokio runtime.
    pub fn setup_entry(&self, entry: EntryConfig) -> Result<Vec<SensorState>> {
        let entry_id = entry.entry_id;
        let mut entries = self.entries.lock();
        if entries.contains_key(&entry_id) {
            return Err(Error::Validation(format!("entry {entry_id} is already loaded")));
        }
        if entry.sources.is_empty() {
            return Err(Error::Validation(format!("entry {entry_id} has no sources")));
        }

        let scalers = entry.scaler_configs();
        for scaler in &scalers {
            scaler.validate()?;
        }

        let mut taken: HashSet<String> = entries
            .values()
            .flat_map(|loaded| loaded.sensors.iter())
            .map(|sensor| sensor.entity_id().to_string())
            .collect();
        let mut sensors = Vec::with_capacity(scalers.len());
        for config in scalers {
            let sensor = ScaledSensor::new(entry_id, config, self.registry.clone());
            let entity_id = available_entity_id(sensor.entity_id(), &taken);
            if entity_id != sensor.entity_id() {
                tracing::warn!(
                    "{} is already in use, exposing {} as {}",
                    sensor.entity_id(),
                    sensor.source_entity_id(),
                    entity_id
                );
            }
            taken.insert(entity_id.clone());
            sensors.push(sensor.with_entity_id(entity_id));
        }
        let sensors = Arc::new(sensors);

        // Subscribe before the initial render so no change slips in between.
        let rx = self.registry.subscribe();
        let initial: Vec<SensorState> = sensors
            .iter()
            .map(|sensor| {
                let state = sensor.render();
                publish(&self.updates, &state);
                state
            })
            .collect();

        let (state, state_rx) = watch::channel(TaskState::Running);
        let publisher = Publisher {
            entry_id,
            sensors: Arc::clone(&sensors),
            updates: self.updates.clone(),
        };
        let task = tokio::spawn(publisher.run(rx, state_rx));

        tracing::info!(
            "Loaded entry '{}' ({}) with {} sensors",
            entry.title,
            entry_id,
            sensors.len()
        );
        self.registry.events().broadcast(EventPayload::EntryLoaded {
            entry_id,
            sensors: sensors.len(),
        });

        entries.insert(
            entry_id,
            LoadedEntry {
                entry,
                sensors,
                task,
                state,
            },
        );
        Ok(initial)
    }

    /// Stop an entry's sensors. Returns `false` if it was not loaded.
    ///
    /// Nothing is published for the entry once this returns.
    pub fn unload_entry(&self, entry_id: EntryId) -> bool {
        self.take_entry(entry_id, TaskState::Stopped).is_some()
    }

    /// Replace a loaded entry with a new version of itself.
    pub fn reload_entry(&self, entry: EntryConfig) -> Result<Vec<SensorState>> {
        if !self.unload_entry(entry.entry_id) {
            tracing::debug!("Entry {} was not loaded, setting it up fresh", entry.entry_id);
        }
        self.setup_entry(entry)
    }

    /// Unload every entry and wait for their tasks to drain.
    pub async fn shutdown(&self) {
        let ids: Vec<EntryId> = self.entries.lock().keys().copied().collect();
        for entry_id in ids {
            if let Some(loaded) = self.take_entry(entry_id, TaskState::Draining) {
                if let Err(e) = loaded.task.await {
                    tracing::warn!("Entry {} task ended abnormally: {}", entry_id, e);
                }
            }
        }
    }

    /// Ids of all loaded entries, sorted.
    pub fn loaded_entries(&self) -> Vec<EntryId> {
        let mut ids: Vec<_> = self.entries.lock().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn entry(&self, entry_id: EntryId) -> Option<EntryConfig> {
        self.entries.lock().get(&entry_id).map(|loaded| loaded.entry.clone())
    }

    /// Render every sensor of every loaded entry, sorted by entity id.
    pub fn current_states(&self) -> Vec<SensorState> {
        let sensors: Vec<ScaledSensor> = self
            .entries
            .lock()
            .values()
            .flat_map(|loaded| loaded.sensors.iter().cloned())
            .collect();
        let mut states: Vec<_> = sensors.iter().map(ScaledSensor::render).collect();
        states.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        states
    }

    /// Remove an entry, signal its task and announce the unload.
    ///
    /// The returned entry still owns the signal sender, so a draining task
    /// is not cut short by the sender going away.
    fn take_entry(&self, entry_id: EntryId, signal: TaskState) -> Option<LoadedEntry> {
        let loaded = self.entries.lock().remove(&entry_id)?;
        loaded.state.send_replace(signal);
        self.registry
            .events()
            .broadcast(EventPayload::EntryUnloaded { entry_id });
        tracing::info!("Unloaded entry '{}' ({})", loaded.entry.title, entry_id);
        Some(loaded)
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        for loaded in self.entries.get_mut().values() {
            loaded.task.abort();
        }
    }
}

/// Per-entry task state.
struct Publisher {
    entry_id: EntryId,
    sensors: Arc<Vec<ScaledSensor>>,
    updates: broadcast::Sender<SensorState>,
}

impl Publisher {
    async fn run(self, mut rx: broadcast::Receiver<Event>, mut state: watch::Receiver<TaskState>) {
        loop {
            let received = tokio::select! {
                biased;
                changed = state.changed() => {
                    if changed.is_err() || *state.borrow() == TaskState::Stopped {
                        break;
                    }
                    continue;
                }
                received = rx.recv() => received,
            };
            let signal = *state.borrow();
            if signal == TaskState::Stopped {
                break;
            }

            match received {
                Ok(event) => match event.payload {
                    EventPayload::SourceStateChanged { entity_id, .. } => {
                        self.source_changed(&entity_id);
                    }
                    EventPayload::EntryUnloaded { entry_id } if entry_id == self.entry_id => break,
                    _ => {}
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Entry {} missed {} state changes, refreshing all sensors",
                        self.entry_id,
                        skipped
                    );
                    self.refresh();
                    // The unload marker may have been among the missed events.
                    if signal == TaskState::Draining {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("Entry {} stopped listening", self.entry_id);
    }

    fn source_changed(&self, entity_id: &str) {
        for sensor in self
            .sensors
            .iter()
            .filter(|sensor| sensor.source_entity_id() == entity_id)
        {
            publish(&self.updates, &sensor.render());
        }
    }

    fn refresh(&self) {
        for sensor in self.sensors.iter() {
            publish(&self.updates, &sensor.render());
        }
    }
}

fn publish(updates: &broadcast::Sender<SensorState>, state: &SensorState) {
    tracing::debug!(
        "{} = {} {}",
        state.entity_id,
        state.state,
        state.unit_of_measurement.as_deref().unwrap_or("")
    );
    // No subscribers is fine.
    let _ = updates.send(state.clone());
}
