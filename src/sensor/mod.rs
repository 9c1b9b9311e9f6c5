//! Scaled sensor entity.
//!
//! A [`ScaledSensor`] mirrors one source sensor. Every render reads the
//! source's current state from the [`StateRegistry`], runs it through
//! [`bitrate_core::convert`] and lays the result out as entity state, unit of
//! measurement and extra attributes.

use bitrate_core::{convert, EntryId, Outcome, Reading, ScalerConfig};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::state::{split_entity_id, SourceState, StateRegistry};

/// Integration domain, used in unique ids.
pub const DOMAIN: &str = "bitrate_scaler";

/// Device class of every scaled sensor.
pub const DEVICE_CLASS_DATA_RATE: &str = "data_rate";

/// State string of an entity without a value.
pub const STATE_UNAVAILABLE: &str = "unavailable";

pub const ATTR_SOURCE_ENTITY_ID: &str = "source_entity_id";
pub const ATTR_DISPLAY_UNIT: &str = "display_unit";
pub const ATTR_DISPLAY_VALUE_STR: &str = "display_value_str";

/// State value of a rendered sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateValue {
    Number(f64),
    Unavailable,
}

impl StateValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            StateValue::Number(value) => Some(*value),
            StateValue::Unavailable => None,
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Number(value) => write!(f, "{value}"),
            StateValue::Unavailable => f.write_str(STATE_UNAVAILABLE),
        }
    }
}

impl Serialize for StateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StateValue::Number(value) => serializer.serialize_f64(*value),
            StateValue::Unavailable => serializer.serialize_str(STATE_UNAVAILABLE),
        }
    }
}

/// What the host shows for a scaled sensor at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub entity_id: String,
    pub unique_id: String,
    pub name: String,
    pub state: StateValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    pub device_class: &'static str,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl SensorState {
    pub fn is_available(&self) -> bool {
        self.state != StateValue::Unavailable
    }
}

/// Derived sensor for one source entity.
#[derive(Clone)]
pub struct ScaledSensor {
    entry_id: EntryId,
    config: ScalerConfig,
    entity_id: String,
    unique_id: String,
    registry: StateRegistry,
}

impl ScaledSensor {
    pub fn new(entry_id: EntryId, config: ScalerConfig, registry: StateRegistry) -> Self {
        let entity_id = derived_entity_id(&config.source_entity_id);
        let unique_id = format!("{DOMAIN}:{entry_id}:{}", config.source_entity_id);
        Self {
            entry_id,
            config,
            entity_id,
            unique_id,
            registry,
        }
    }

    /// Use `entity_id` instead of the derived one.
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: String) -> Self {
        self.entity_id = entity_id;
        self
    }

    pub fn entry_id(&self) -> EntryId {
        self.entry_id
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn source_entity_id(&self) -> &str {
        &self.config.source_entity_id
    }

    pub fn config(&self) -> &ScalerConfig {
        &self.config
    }

    /// `"<friendly name> (scaled)"`, falling back to the source id.
    pub fn name(&self) -> String {
        let source = self.registry.get(self.source_entity_id());
        let base = source
            .as_ref()
            .and_then(SourceState::friendly_name)
            .unwrap_or(self.source_entity_id());
        format!("{base} (scaled)")
    }

    /// Whether the source currently holds a usable reading.
    pub fn available(&self) -> bool {
        self.render().is_available()
    }

    /// Compute the sensor's state from the source's current state.
    pub fn render(&self) -> SensorState {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            ATTR_SOURCE_ENTITY_ID.to_string(),
            serde_json::Value::from(self.source_entity_id()),
        );

        let mut rendered = SensorState {
            entity_id: self.entity_id.clone(),
            unique_id: self.unique_id.clone(),
            name: self.name(),
            state: StateValue::Unavailable,
            unit_of_measurement: None,
            device_class: DEVICE_CLASS_DATA_RATE,
            attributes,
        };

        let Some(source) = self.registry.get(self.source_entity_id()) else {
            tracing::debug!("{}: source {} has no state", self.entity_id, self.source_entity_id());
            return rendered;
        };

        let outcome = Reading::parse(&source.state).and_then(|reading| convert(reading, &self.config));
        let conversion = match outcome {
            Ok(Outcome::Converted(conversion)) => conversion,
            Ok(Outcome::Unavailable) => return rendered,
            Err(e) => {
                tracing::warn!(
                    "{}: ignoring state '{}' of {}: {}",
                    self.entity_id,
                    source.state,
                    self.source_entity_id(),
                    e
                );
                return rendered;
            }
        };

        let unit = conversion.unit_label();
        rendered.state = StateValue::Number(conversion.display_value);
        rendered.unit_of_measurement = Some(unit.to_string());
        rendered.attributes.insert(
            ATTR_DISPLAY_UNIT.to_string(),
            serde_json::Value::from(unit),
        );
        rendered.attributes.insert(
            ATTR_DISPLAY_VALUE_STR.to_string(),
            serde_json::Value::from(format!("{} {}", conversion.formatted_value(), unit)),
        );
        rendered.attributes.extend(conversion.attributes);
        rendered
    }
}

/// `sensor.<slugified object id>_scaled` for a source entity id.
pub fn derived_entity_id(source_entity_id: &str) -> String {
    let (_, object_id) = split_entity_id(source_entity_id);
    format!("sensor.{}_scaled", slugify(object_id))
}

/// `entity_id`, or the first of `<entity_id>_2`, `<entity_id>_3`, ... that
/// is not in `taken`.
pub fn available_entity_id(entity_id: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(entity_id) {
        return entity_id.to_string();
    }
    (2..)
        .map(|n| format!("{entity_id}_{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| entity_id.to_string())
}

/// Lowercase, with every run of non-alphanumerics collapsed to `_`.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let trimmed = slug.trim_end_matches('_');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}
