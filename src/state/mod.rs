//! Host entity state table.
//!
//! [`StateRegistry`] plays the part of the home-automation host: it holds the
//! current state of every known entity and announces each change on the
//! shared [`EventBus`].

mod types;

pub use types::*;

use anyhow::{Context, Result};
use bitrate_core::events::{Event, EventBus, EventPayload};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared, cloneable handle to the host's entity states.
#[derive(Clone)]
pub struct StateRegistry {
    inner: Arc<StateRegistryInner>,
}

struct StateRegistryInner {
    states: RwLock<HashMap<String, SourceState>>,
    events: EventBus,
}

impl StateRegistry {
    /// Create an empty registry whose event channel buffers `event_capacity`
    /// events per subscriber.
    pub fn new(event_capacity: usize) -> Self {
        Self {
            inner: Arc::new(StateRegistryInner {
                states: RwLock::new(HashMap::new()),
                events: EventBus::new(event_capacity),
            }),
        }
    }

    /// Set the state of `entity_id`, keeping any attributes it already has.
    pub fn set(&self, entity_id: &str, state: impl Into<String>) {
        let attributes = self
            .get(entity_id)
            .map(|existing| existing.attributes)
            .unwrap_or_default();
        self.set_with_attributes(entity_id, state, attributes);
    }

    /// Set the state and replace the attributes of `entity_id`.
    pub fn set_with_attributes(
        &self,
        entity_id: &str,
        state: impl Into<String>,
        attributes: BTreeMap<String, serde_json::Value>,
    ) {
        let new_state = SourceState {
            entity_id: entity_id.to_string(),
            state: state.into(),
            attributes,
            last_changed: Utc::now(),
        };
        self.insert(new_state);
    }

    /// Store a complete state snapshot for one entity.
    pub fn insert(&self, new_state: SourceState) {
        let entity_id = new_state.entity_id.clone();
        let state_value = new_state.state.clone();

        let old_state = {
            let mut states = self.inner.states.write();
            states
                .insert(entity_id.clone(), new_state)
                .map(|old| old.state)
        };

        tracing::trace!("{} -> {}", entity_id, state_value);
        self.inner.events.broadcast(EventPayload::SourceStateChanged {
            entity_id,
            old_state,
            new_state: Some(state_value),
        });
    }

    /// Forget `entity_id`. Returns the state it had.
    pub fn remove(&self, entity_id: &str) -> Option<SourceState> {
        let removed = self.inner.states.write().remove(entity_id)?;
        self.inner.events.broadcast(EventPayload::SourceStateChanged {
            entity_id: entity_id.to_string(),
            old_state: Some(removed.state.clone()),
            new_state: None,
        });
        Some(removed)
    }

    pub fn get(&self, entity_id: &str) -> Option<SourceState> {
        self.inner.states.read().get(entity_id).cloned()
    }

    /// All states, sorted by entity id.
    pub fn all(&self) -> Vec<SourceState> {
        let mut states: Vec<_> = self.inner.states.read().values().cloned().collect();
        states.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        states
    }

    pub fn len(&self) -> usize {
        self.inner.states.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Read a JSON array of [`SourceState`]s, as exported from the host.
pub fn load_snapshot(path: &Path) -> Result<Vec<SourceState>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read states file: {:?}", path))?;
    let states: Vec<SourceState> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse states file: {:?}", path))?;
    tracing::debug!("Loaded {} states from {:?}", states.len(), path);
    Ok(states)
}
