//! Guided setup.
//!
//! [`SetupFlow`] creates a new config entry; [`OptionsFlow`] reconfigures an
//! existing one, replacing its settings wholesale. Both are stateless: each
//! call to [`Flow::step`] either shows the form (optionally with errors) or
//! finishes.

pub mod prompt;
pub mod schema;
pub mod sources;

pub use schema::{FieldKind, FlowInput, FormErrors, FormField, FormValues};
pub use sources::discover_sources;

use crate::config::{EntryConfig, DEFAULT_TITLE, ENTRY_VERSION};
use crate::state::SourceState;

/// Abort reason when an entry with the same sources already exists.
pub const ABORT_ALREADY_CONFIGURED: &str = "already_configured";

/// Result of one flow step.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowStep {
    /// Show (or re-show) a form.
    Form {
        step_id: &'static str,
        fields: Vec<FormField>,
        errors: FormErrors,
    },
    /// The flow finished with a complete entry.
    CreateEntry { title: String, entry: EntryConfig },
    /// The flow cannot continue.
    Abort { reason: String },
}

/// A form-driven flow.
pub trait Flow {
    /// Advance the flow. `None` asks for the initial form.
    fn step(&self, input: Option<&FlowInput>) -> FlowStep;
}

/// Flow creating a new config entry.
pub struct SetupFlow {
    candidates: Vec<String>,
    existing: Vec<EntryConfig>,
}

impl SetupFlow {
    /// Offer the `.rx` / `.tx` sensors found in `states` as sources.
    pub fn new(states: &[SourceState]) -> Self {
        Self::with_candidates(discover_sources(states))
    }

    pub fn with_candidates(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            existing: Vec::new(),
        }
    }

    /// Entries already configured; a setup with identical sources aborts.
    #[must_use]
    pub fn with_existing(mut self, existing: Vec<EntryConfig>) -> Self {
        self.existing = existing;
        self
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// The "user" step.
    pub fn step_user(&self, input: Option<&FlowInput>) -> FlowStep {
        let defaults = FormValues::default();
        let Some(input) = input else {
            return form("user", &self.candidates, &defaults, FormErrors::new());
        };

        match schema::validate_input(input, &self.candidates, &defaults) {
            Ok(values) => {
                if self.is_already_configured(&values.sources) {
                    tracing::info!("Setup aborted, sources already configured: {:?}", values.sources);
                    return FlowStep::Abort {
                        reason: ABORT_ALREADY_CONFIGURED.to_string(),
                    };
                }
                let entry = apply(EntryConfig::new(values.sources.clone()), values);
                tracing::info!("Setup created entry {} for {:?}", entry.entry_id, entry.sources);
                FlowStep::CreateEntry {
                    title: entry.title.clone(),
                    entry,
                }
            }
            Err(errors) => {
                tracing::debug!("Setup form rejected: {:?}", errors);
                form("user", &self.candidates, &defaults, errors)
            }
        }
    }

    fn is_already_configured(&self, sources: &[String]) -> bool {
        let mut wanted = sources.to_vec();
        wanted.sort();
        self.existing.iter().any(|entry| {
            let mut have = entry.sources.clone();
            have.sort();
            have == wanted
        })
    }
}

impl Flow for SetupFlow {
    fn step(&self, input: Option<&FlowInput>) -> FlowStep {
        self.step_user(input)
    }
}

/// Flow reconfiguring an existing entry.
pub struct OptionsFlow {
    entry: EntryConfig,
    candidates: Vec<String>,
}

impl OptionsFlow {
    /// Candidates come from `states`, plus the entry's current sources so
    /// they remain selectable even if the host has not reported them yet.
    pub fn new(entry: EntryConfig, states: &[SourceState]) -> Self {
        let mut candidates = discover_sources(states);
        if !candidates.is_empty() {
            for source in &entry.sources {
                if !candidates.contains(source) {
                    candidates.push(source.clone());
                }
            }
            candidates.sort();
        }
        Self { entry, candidates }
    }

    /// The "init" step.
    pub fn step_init(&self, input: Option<&FlowInput>) -> FlowStep {
        let defaults = FormValues {
            mode: self.entry.mode,
            precision: self.entry.precision,
            threshold_kbit_to_mbit: self.entry.threshold_kbit_to_mbit,
            sources: self.entry.sources.clone(),
        };
        let Some(input) = input else {
            return form("init", &self.candidates, &defaults, FormErrors::new());
        };

        match schema::validate_input(input, &self.candidates, &defaults) {
            Ok(values) => {
                let entry = apply(self.entry.clone(), values);
                tracing::info!("Options updated for entry {}", entry.entry_id);
                FlowStep::CreateEntry {
                    title: entry.title.clone(),
                    entry,
                }
            }
            Err(errors) => form("init", &self.candidates, &defaults, errors),
        }
    }
}

impl Flow for OptionsFlow {
    fn step(&self, input: Option<&FlowInput>) -> FlowStep {
        self.step_init(input)
    }
}

fn form(
    step_id: &'static str,
    candidates: &[String],
    defaults: &FormValues,
    errors: FormErrors,
) -> FlowStep {
    FlowStep::Form {
        step_id,
        fields: schema::build_form(candidates, defaults),
        errors,
    }
}

fn apply(mut entry: EntryConfig, values: FormValues) -> EntryConfig {
    entry.sources = values.sources;
    entry.mode = values.mode;
    entry.precision = values.precision;
    entry.threshold_kbit_to_mbit = values.threshold_kbit_to_mbit;
    entry.version = ENTRY_VERSION;
    if entry.title.is_empty() {
        entry.title = DEFAULT_TITLE.to_string();
    }
    entry
}
