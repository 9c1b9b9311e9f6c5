//! Display units for scaled bit rates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bits per second in one kilobit per second.
pub const BITS_PER_KBIT: f64 = 1_000.0;

/// Bits per second in one megabit per second.
pub const BITS_PER_MBIT: f64 = 1_000_000.0;

/// Decimal-scaled bit-rate unit a reading is presented in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateUnit {
    #[serde(rename = "kbit/s")]
    KilobitPerSecond,
    #[serde(rename = "Mbit/s")]
    MegabitPerSecond,
}

impl RateUnit {
    /// Unit of measurement label, e.g. `"kbit/s"`.
    pub fn label(self) -> &'static str {
        match self {
            RateUnit::KilobitPerSecond => "kbit/s",
            RateUnit::MegabitPerSecond => "Mbit/s",
        }
    }

    /// Number of bits per second in one of this unit.
    pub fn divisor(self) -> f64 {
        match self {
            RateUnit::KilobitPerSecond => BITS_PER_KBIT,
            RateUnit::MegabitPerSecond => BITS_PER_MBIT,
        }
    }

    /// Scale a bits-per-second value into this unit.
    pub fn scale(self, bits_per_second: f64) -> f64 {
        bits_per_second / self.divisor()
    }
}

impl fmt::Display for RateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
