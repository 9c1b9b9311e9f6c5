use bitrate_core::{
    EntryId, PresentationMode, ScalerConfig, DEFAULT_PRECISION, DEFAULT_THRESHOLD_KBIT_TO_MBIT,
};
use serde::{Deserialize, Serialize};

/// Current schema version of a config entry.
pub const ENTRY_VERSION: u32 = 1;

/// Title given to entries created by the setup flow.
pub const DEFAULT_TITLE: &str = "Bitrate Scaler";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub entries: Vec<EntryConfig>,
}

impl Config {
    pub fn find_entry(&self, entry_id: EntryId) -> Option<&EntryConfig> {
        self.entries.iter().find(|e| e.entry_id == entry_id)
    }

    /// Insert `entry`, replacing any entry with the same id.
    pub fn upsert_entry(&mut self, entry: EntryConfig) {
        match self.entries.iter_mut().find(|e| e.entry_id == entry.entry_id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn remove_entry(&mut self, entry_id: EntryId) -> Option<EntryConfig> {
        let index = self.entries.iter().position(|e| e.entry_id == entry_id)?;
        Some(self.entries.remove(index))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Buffer size of the state-change broadcast channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    256
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
        }
    }
}

/// One completed setup flow: a set of source sensors sharing their settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EntryConfig {
    #[serde(default)]
    pub entry_id: EntryId,

    #[serde(default = "default_title")]
    pub title: String,

    pub sources: Vec<String>,

    #[serde(default)]
    pub mode: PresentationMode,

    #[serde(default = "default_precision")]
    pub precision: u8,

    #[serde(default = "default_threshold")]
    pub threshold_kbit_to_mbit: f64,

    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_precision() -> u8 {
    DEFAULT_PRECISION
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD_KBIT_TO_MBIT
}

fn default_version() -> u32 {
    ENTRY_VERSION
}

impl EntryConfig {
    /// New entry with a fresh id and default settings.
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            entry_id: EntryId::new(),
            title: default_title(),
            sources,
            mode: PresentationMode::default(),
            precision: DEFAULT_PRECISION,
            threshold_kbit_to_mbit: DEFAULT_THRESHOLD_KBIT_TO_MBIT,
            version: ENTRY_VERSION,
        }
    }

    /// Converter settings for a single source of this entry.
    pub fn scaler_config(&self, source_entity_id: &str) -> ScalerConfig {
        ScalerConfig {
            source_entity_id: source_entity_id.to_string(),
            mode: self.mode,
            precision: self.precision,
            threshold_kbit_to_mbit: self.threshold_kbit_to_mbit,
        }
    }

    /// Converter settings for every source, in configured order.
    pub fn scaler_configs(&self) -> Vec<ScalerConfig> {
        self.sources
            .iter()
            .map(|source| self.scaler_config(source))
            .collect()
    }
}
