//! Converter settings shared by every sensor of a config entry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default presentation mode for new entries.
pub const DEFAULT_MODE: PresentationMode = PresentationMode::FixedUnitWithAttribute;

/// Default number of decimal digits.
pub const DEFAULT_PRECISION: u8 = 2;

/// Highest precision the setup flow accepts.
pub const MAX_PRECISION: u8 = 4;

/// Default kbit/s -> Mbit/s escalation point, in bits per second.
pub const DEFAULT_THRESHOLD_KBIT_TO_MBIT: f64 = 1_000_000.0;

/// Lowest escalation point the setup flow accepts, in bits per second.
pub const MIN_THRESHOLD_KBIT_TO_MBIT: f64 = 1_000.0;

/// How the scaled value and its unit are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresentationMode {
    /// Unit follows magnitude and is part of the state.
    #[serde(rename = "dynamic_unit")]
    DynamicUnitInState,
    /// State always in kbit/s; the Mbit/s value goes into an attribute.
    #[serde(rename = "fixed_unit_with_attribute")]
    FixedUnitWithAttribute,
}

impl PresentationMode {
    /// All modes, in the order the setup form offers them.
    pub const ALL: [PresentationMode; 2] = [
        PresentationMode::FixedUnitWithAttribute,
        PresentationMode::DynamicUnitInState,
    ];

    /// Stable key used in config files and forms.
    pub fn as_str(self) -> &'static str {
        match self {
            PresentationMode::DynamicUnitInState => "dynamic_unit",
            PresentationMode::FixedUnitWithAttribute => "fixed_unit_with_attribute",
        }
    }
}

impl fmt::Display for PresentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresentationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dynamic_unit" | "dynamic" => Ok(PresentationMode::DynamicUnitInState),
            "fixed_unit_with_attribute" | "fixed" => Ok(PresentationMode::FixedUnitWithAttribute),
            other => Err(Error::Validation(format!("unknown mode '{other}'"))),
        }
    }
}

impl Default for PresentationMode {
    fn default() -> Self {
        DEFAULT_MODE
    }
}

/// Settings the converter needs for one source sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerConfig {
    pub source_entity_id: String,

    #[serde(default)]
    pub mode: PresentationMode,

    #[serde(default = "default_precision")]
    pub precision: u8,

    #[serde(default = "default_threshold")]
    pub threshold_kbit_to_mbit: f64,
}

fn default_precision() -> u8 {
    DEFAULT_PRECISION
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD_KBIT_TO_MBIT
}

impl ScalerConfig {
    /// Settings with defaults for everything but the source.
    pub fn new(source_entity_id: impl Into<String>) -> Self {
        Self {
            source_entity_id: source_entity_id.into(),
            mode: DEFAULT_MODE,
            precision: DEFAULT_PRECISION,
            threshold_kbit_to_mbit: DEFAULT_THRESHOLD_KBIT_TO_MBIT,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: PresentationMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = precision;
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold_kbit_to_mbit: f64) -> Self {
        self.threshold_kbit_to_mbit = threshold_kbit_to_mbit;
        self
    }

    /// Check the invariants the converter relies on.
    ///
    /// The converter itself only needs a positive, finite threshold; the
    /// tighter ranges offered by the setup form are enforced there.
    pub fn validate(&self) -> Result<()> {
        if self.source_entity_id.trim().is_empty() {
            return Err(Error::Validation("source entity id is empty".into()));
        }
        if !self.threshold_kbit_to_mbit.is_finite() || self.threshold_kbit_to_mbit <= 0.0 {
            return Err(Error::Validation(format!(
                "threshold must be a positive number, got {}",
                self.threshold_kbit_to_mbit
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = ScalerConfig::new("sensor.wan.rx");
        assert_eq!(cfg.mode, PresentationMode::FixedUnitWithAttribute);
        assert_eq!(cfg.precision, 2);
        assert_eq!(cfg.threshold_kbit_to_mbit, 1_000_000.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn mode_parses_keys_and_shorthands() {
        assert_eq!(
            "dynamic_unit".parse::<PresentationMode>().unwrap(),
            PresentationMode::DynamicUnitInState
        );
        assert_eq!(
            " Fixed ".parse::<PresentationMode>().unwrap(),
            PresentationMode::FixedUnitWithAttribute
        );
        assert!("sideways".parse::<PresentationMode>().is_err());
    }

    #[test]
    fn mode_serde_uses_stable_keys() {
        let json = serde_json::to_string(&PresentationMode::DynamicUnitInState).unwrap();
        assert_eq!(json, "\"dynamic_unit\"");
        let back: PresentationMode = serde_json::from_str("\"fixed_unit_with_attribute\"").unwrap();
        assert_eq!(back, PresentationMode::FixedUnitWithAttribute);
    }

    #[test]
    fn validate_rejects_non_positive_threshold() {
        let cfg = ScalerConfig::new("sensor.wan.rx").with_threshold(0.0);
        assert!(matches!(cfg.validate(), Err(Error::Validation(_))));

        let cfg = ScalerConfig::new("sensor.wan.rx").with_threshold(f64::NAN);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_source() {
        let cfg = ScalerConfig::new("  ");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: ScalerConfig =
            serde_json::from_str(r#"{"source_entity_id": "sensor.lan.tx"}"#).unwrap();
        assert_eq!(cfg, ScalerConfig::new("sensor.lan.tx"));
    }
}
