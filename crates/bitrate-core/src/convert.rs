//! Bit-rate conversion.
//!
//! [`convert`] is the only place where units are chosen and values rounded.
//! It is pure: the same reading and settings always give the same outcome,
//! and nothing is remembered between calls.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::settings::{PresentationMode, ScalerConfig};
use crate::units::RateUnit;

/// Attribute carrying the Mbit/s value in fixed-unit mode.
pub const ATTR_MEGABITS_PER_SECOND: &str = "megabits_per_second";

/// Minimum number of digits kept in [`ATTR_MEGABITS_PER_SECOND`].
pub const MIN_ATTRIBUTE_PRECISION: u8 = 2;

/// Host state strings that mean "no current value".
const UNAVAILABLE_STATES: [&str; 3] = ["unavailable", "unknown", ""];

/// A bits-per-second reading from the source sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// The source has no current value.
    Unavailable,
    /// Raw value in bits per second; not yet checked.
    Value(f64),
}

impl Reading {
    /// Interpret a host state string.
    ///
    /// The host's unavailable markers map to [`Reading::Unavailable`]; any other
    /// text has to be a number.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if UNAVAILABLE_STATES
            .iter()
            .any(|marker| raw.eq_ignore_ascii_case(marker))
        {
            return Ok(Reading::Unavailable);
        }
        raw.parse::<f64>()
            .map(Reading::Value)
            .map_err(|_| Error::invalid_reading(format!("'{raw}' is not a number")))
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Reading::Value(value)
    }
}

impl From<Option<f64>> for Reading {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Reading::Unavailable, Reading::Value)
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    /// Scaled value rounded to the configured precision.
    pub display_value: f64,
    /// Unit the display value is expressed in.
    pub unit: RateUnit,
    /// Extra attributes to expose next to the state.
    pub attributes: BTreeMap<String, serde_json::Value>,
    #[serde(skip)]
    precision: u8,
}

impl Conversion {
    pub fn unit_label(&self) -> &'static str {
        self.unit.label()
    }

    /// Display value with exactly `precision` digits, e.g. `"500.00"`.
    pub fn formatted_value(&self) -> String {
        format!("{:.*}", usize::from(self.precision), self.display_value)
    }
}

/// Outcome of [`convert`] for a well-formed reading.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The source had no value; nothing was computed.
    Unavailable,
    Converted(Conversion),
}

impl Outcome {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Outcome::Unavailable)
    }

    pub fn conversion(&self) -> Option<&Conversion> {
        match self {
            Outcome::Converted(conversion) => Some(conversion),
            Outcome::Unavailable => None,
        }
    }
}

/// Scale a bits-per-second reading according to `config`.
///
/// In dynamic mode the unit escalates to Mbit/s once the raw reading reaches
/// `threshold_kbit_to_mbit` (inclusive). In fixed mode the state is always
/// kbit/s and the Mbit/s value is added as [`ATTR_MEGABITS_PER_SECOND`].
///
/// Fails with [`Error::InvalidReading`] for negative, NaN or infinite values.
pub fn convert(reading: Reading, config: &ScalerConfig) -> Result<Outcome> {
    let bits_per_second = match reading {
        Reading::Unavailable => return Ok(Outcome::Unavailable),
        Reading::Value(value) => value,
    };

    if !bits_per_second.is_finite() || bits_per_second < 0.0 {
        return Err(Error::invalid_reading(bits_per_second));
    }
    // Turns -0.0 into 0.0.
    let bits_per_second = bits_per_second + 0.0;

    let mut attributes = BTreeMap::new();
    let unit = match config.mode {
        PresentationMode::FixedUnitWithAttribute => {
            let megabits = RateUnit::MegabitPerSecond.scale(bits_per_second);
            attributes.insert(
                ATTR_MEGABITS_PER_SECOND.to_string(),
                serde_json::Value::from(round_to(megabits, attribute_precision(config.precision))),
            );
            RateUnit::KilobitPerSecond
        }
        PresentationMode::DynamicUnitInState => {
            if bits_per_second < config.threshold_kbit_to_mbit {
                RateUnit::KilobitPerSecond
            } else {
                RateUnit::MegabitPerSecond
            }
        }
    };

    Ok(Outcome::Converted(Conversion {
        display_value: round_to(unit.scale(bits_per_second), config.precision),
        unit,
        attributes,
        precision: config.precision,
    }))
}

/// Digits used for the Mbit/s attribute in fixed-unit mode.
pub fn attribute_precision(precision: u8) -> u8 {
    precision.max(MIN_ATTRIBUTE_PRECISION)
}

/// Round half away from zero to `precision` decimal digits.
///
/// Values too large to scale by `10^precision` are returned unchanged.
pub fn round_to(value: f64, precision: u8) -> f64 {
    let factor = 10f64.powi(i32::from(precision));
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}
