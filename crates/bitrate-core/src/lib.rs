//! bitrate-core: bit-rate scaling plus the shared types it is wired with.
//!
//! The heart of the crate is [`convert`], a pure function turning a raw
//! bits-per-second reading into a display value, a unit label and a set of
//! attributes. Around it live the converter settings, a unified error type,
//! typed identifiers for config entries, and a broadcast event bus used by the
//! host adapter.

pub mod convert;
pub mod error;
pub mod events;
pub mod ids;
pub mod settings;
pub mod units;

// Re-export the most commonly used items at the crate root.
pub use convert::{convert, Conversion, Outcome, Reading};
pub use error::{Error, Result};
pub use ids::*;
pub use settings::*;
pub use units::*;
