//! Unified error type for bitrate-scaler.
//!
//! The converter itself only ever fails with [`Error::InvalidReading`]; the
//! remaining variants cover the adapter layer (settings validation and entry
//! lookup).

use std::fmt;

/// Unified error type covering all failure modes in bitrate-scaler.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A reading was present but is not a finite, non-negative bit rate.
    #[error("Invalid reading: {0}")]
    InvalidReading(String),

    /// Settings or user input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested entity or entry could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of thing looked up (e.g. "entry", "source").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },
}

impl Error {
    /// Convenience constructor for [`Error::InvalidReading`].
    pub fn invalid_reading(value: impl fmt::Display) -> Self {
        Error::InvalidReading(value.to_string())
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Whether the error stems from the reading rather than the setup.
    pub fn is_invalid_reading(&self) -> bool {
        matches!(self, Error::InvalidReading(_))
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
