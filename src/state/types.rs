use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute holding a human-readable entity name.
pub const ATTR_FRIENDLY_NAME: &str = "friendly_name";

/// Current state of a host entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    #[serde(default = "Utc::now")]
    pub last_changed: DateTime<Utc>,
}

impl SourceState {
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: BTreeMap::new(),
            last_changed: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn friendly_name(&self) -> Option<&str> {
        self.attributes
            .get(ATTR_FRIENDLY_NAME)
            .and_then(|v| v.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Domain part of the entity id (`sensor` in `sensor.wan.rx`).
    pub fn domain(&self) -> &str {
        split_entity_id(&self.entity_id).0
    }
}

/// Split `domain.object_id`; ids without a dot have an empty domain.
pub fn split_entity_id(entity_id: &str) -> (&str, &str) {
    entity_id.split_once('.').unwrap_or(("", entity_id))
}
