//! Line-oriented driver running a [`Flow`] on a terminal.
//!
//! Each field is asked once; a blank answer keeps the shown default. When the
//! flow rejects the answers, only the fields with errors are asked again.

use anyhow::Result;
use std::io::{BufRead, Write};

use super::schema::{
    FieldKind, FormField, ERROR_INVALID_MODE, ERROR_INVALID_PRECISION, ERROR_INVALID_THRESHOLD,
    ERROR_NOT_A_NUMBER, ERROR_NO_SOURCES, ERROR_UNKNOWN_SOURCE, FIELD_MODE, FIELD_PRECISION,
    FIELD_SOURCES, FIELD_THRESHOLD,
};
use super::{Flow, FlowInput, FlowStep};

/// Drive `flow` until it creates an entry or aborts.
pub fn run_flow<F, R, W>(flow: &F, mut input: R, mut output: W) -> Result<FlowStep>
where
    F: Flow + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut answers = FlowInput::new();
    let mut step = flow.step(None);

    loop {
        let (fields, errors) = match step {
            FlowStep::Form { fields, errors, .. } => (fields, errors),
            done => return Ok(done),
        };

        for (field, key) in &errors {
            writeln!(output, "  ! {}: {}", label(field), describe_error(key))?;
        }

        for field in &fields {
            if !errors.is_empty() && !errors.contains_key(field.name) {
                continue;
            }
            write_prompt(&mut output, field)?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                anyhow::bail!("Input ended before the setup form was complete");
            }
            let answer = line.trim();
            if answer.is_empty() {
                answers.remove(field.name);
            } else {
                answers.insert(field.name.to_string(), answer.to_string());
            }
        }

        step = flow.step(Some(&answers));
    }
}

fn write_prompt<W: Write>(output: &mut W, field: &FormField) -> Result<()> {
    let hint = match &field.kind {
        FieldKind::Select { options } => format!(" [{}]", options.join("/")),
        FieldKind::Integer { min, max: Some(max) } => format!(" ({min}-{max})"),
        FieldKind::Integer { min, max: None } => format!(" (>= {min})"),
        FieldKind::MultiSelect { options } => {
            if options.is_empty() {
                " (any sensor.* id, comma separated)".to_string()
            } else {
                writeln!(output, "Available sources:")?;
                for option in options {
                    writeln!(output, "  - {option}")?;
                }
                " (comma separated)".to_string()
            }
        }
    };
    let default = field
        .default
        .as_deref()
        .map(|d| format!(" <{d}>"))
        .unwrap_or_default();

    write!(output, "{}{}{}: ", label(field.name), hint, default)?;
    output.flush()?;
    Ok(())
}

fn label(field: &str) -> &str {
    match field {
        FIELD_MODE => "Presentation mode",
        FIELD_PRECISION => "Decimal places",
        FIELD_THRESHOLD => "Switch to Mbit/s at bit/s",
        FIELD_SOURCES => "Source sensors",
        other => other,
    }
}

fn describe_error(key: &str) -> &str {
    match key {
        ERROR_INVALID_MODE => "unknown presentation mode",
        ERROR_NOT_A_NUMBER => "not a whole number",
        ERROR_INVALID_PRECISION => "must be between 0 and 4",
        ERROR_INVALID_THRESHOLD => "must be at least 1000",
        ERROR_NO_SOURCES => "select at least one source",
        ERROR_UNKNOWN_SOURCE => "not one of the available sources",
        other => other,
    }
}
