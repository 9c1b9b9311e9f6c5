//! Form schema for the setup and options flows.
//!
//! Input arrives as raw strings keyed by field name, the way a form posts it.
//! Absent fields take the form's defaults; present fields are coerced and
//! range-checked, and every problem is reported under its field's name.

use bitrate_core::{
    PresentationMode, DEFAULT_PRECISION, DEFAULT_THRESHOLD_KBIT_TO_MBIT, MAX_PRECISION,
    MIN_THRESHOLD_KBIT_TO_MBIT,
};
use serde::Serialize;
use std::collections::BTreeMap;

pub const FIELD_MODE: &str = "mode";
pub const FIELD_PRECISION: &str = "precision";
pub const FIELD_THRESHOLD: &str = "threshold_kbit_to_mbit";
pub const FIELD_SOURCES: &str = "sources";

pub const ERROR_INVALID_MODE: &str = "invalid_mode";
pub const ERROR_NOT_A_NUMBER: &str = "not_a_number";
pub const ERROR_INVALID_PRECISION: &str = "invalid_precision";
pub const ERROR_INVALID_THRESHOLD: &str = "invalid_threshold";
pub const ERROR_NO_SOURCES: &str = "no_sources";
pub const ERROR_UNKNOWN_SOURCE: &str = "unknown_source";

/// Raw form input, keyed by field name.
pub type FlowInput = BTreeMap<String, String>;

/// Error keys, keyed by field name.
pub type FormErrors = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Select { options: Vec<String> },
    Integer { min: i64, max: Option<i64> },
    MultiSelect { options: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Pre-filled value; `None` means the user must answer.
    pub default: Option<String>,
}

impl FormField {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Validated form values.
#[derive(Debug, Clone, PartialEq)]
pub struct FormValues {
    pub mode: PresentationMode,
    pub precision: u8,
    pub threshold_kbit_to_mbit: f64,
    pub sources: Vec<String>,
}

impl Default for FormValues {
    fn default() -> Self {
        Self {
            mode: PresentationMode::default(),
            precision: DEFAULT_PRECISION,
            threshold_kbit_to_mbit: DEFAULT_THRESHOLD_KBIT_TO_MBIT,
            sources: Vec::new(),
        }
    }
}

/// Build the form, pre-filled from `defaults`.
pub fn build_form(candidates: &[String], defaults: &FormValues) -> Vec<FormField> {
    vec![
        FormField {
            name: FIELD_MODE,
            kind: FieldKind::Select {
                options: PresentationMode::ALL
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            },
            default: Some(defaults.mode.as_str().to_string()),
        },
        FormField {
            name: FIELD_PRECISION,
            kind: FieldKind::Integer {
                min: 0,
                max: Some(i64::from(MAX_PRECISION)),
            },
            default: Some(defaults.precision.to_string()),
        },
        FormField {
            name: FIELD_THRESHOLD,
            kind: FieldKind::Integer {
                min: MIN_THRESHOLD_KBIT_TO_MBIT as i64,
                max: None,
            },
            default: Some(format!("{}", defaults.threshold_kbit_to_mbit)),
        },
        FormField {
            name: FIELD_SOURCES,
            kind: FieldKind::MultiSelect {
                options: candidates.to_vec(),
            },
            default: (!defaults.sources.is_empty()).then(|| defaults.sources.join(", ")),
        },
    ]
}

/// Coerce and check `input`.
///
/// When `candidates` is empty every `sensor.*` id is accepted, since there is
/// no host snapshot to check against.
pub fn validate_input(
    input: &FlowInput,
    candidates: &[String],
    defaults: &FormValues,
) -> Result<FormValues, FormErrors> {
    let mut errors = FormErrors::new();
    let mut values = defaults.clone();

    if let Some(raw) = field(input, FIELD_MODE) {
        match raw.parse::<PresentationMode>() {
            Ok(mode) => values.mode = mode,
            Err(_) => set_error(&mut errors, FIELD_MODE, ERROR_INVALID_MODE),
        }
    }

    if let Some(raw) = field(input, FIELD_PRECISION) {
        match parse_integer(raw) {
            Some(p) if (0..=i64::from(MAX_PRECISION)).contains(&p) => values.precision = p as u8,
            Some(_) => set_error(&mut errors, FIELD_PRECISION, ERROR_INVALID_PRECISION),
            None => set_error(&mut errors, FIELD_PRECISION, ERROR_NOT_A_NUMBER),
        }
    }

    if let Some(raw) = field(input, FIELD_THRESHOLD) {
        match parse_integer(raw) {
            Some(t) if t as f64 >= MIN_THRESHOLD_KBIT_TO_MBIT => {
                values.threshold_kbit_to_mbit = t as f64;
            }
            Some(_) => set_error(&mut errors, FIELD_THRESHOLD, ERROR_INVALID_THRESHOLD),
            None => set_error(&mut errors, FIELD_THRESHOLD, ERROR_NOT_A_NUMBER),
        }
    }

    if let Some(raw) = field(input, FIELD_SOURCES) {
        values.sources = split_sources(raw);
    }
    if values.sources.is_empty() {
        set_error(&mut errors, FIELD_SOURCES, ERROR_NO_SOURCES);
    } else if values
        .sources
        .iter()
        .any(|source| !is_acceptable_source(source, candidates))
    {
        set_error(&mut errors, FIELD_SOURCES, ERROR_UNKNOWN_SOURCE);
    }

    if errors.is_empty() {
        Ok(values)
    } else {
        Err(errors)
    }
}

/// Split a comma/whitespace separated list, dropping duplicates but keeping order.
pub fn split_sources(raw: &str) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for source in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let source = source.trim();
        if !source.is_empty() && !sources.iter().any(|s| s == source) {
            sources.push(source.to_string());
        }
    }
    sources
}

fn is_acceptable_source(source: &str, candidates: &[String]) -> bool {
    if candidates.is_empty() {
        return source.starts_with("sensor.") && source.len() > "sensor.".len();
    }
    candidates.iter().any(|c| c == source)
}

/// Non-blank value of `name` in `input`.
fn field<'a>(input: &'a FlowInput, name: &str) -> Option<&'a str> {
    input
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Integers, also written as `1e6`, `1_000_000` or `1000000.0`.
fn parse_integer(raw: &str) -> Option<i64> {
    let cleaned = raw.replace('_', "");
    if let Ok(value) = cleaned.parse::<i64>() {
        return Some(value);
    }
    let value = cleaned.parse::<f64>().ok()?;
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

fn set_error(errors: &mut FormErrors, field: &str, key: &str) {
    errors.insert(field.to_string(), key.to_string());
}
