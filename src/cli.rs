use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bitrate-scaler")]
#[command(author, version, about = "Republish bit/s sensors as kbit/s or Mbit/s")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a single bit/s reading
    Convert {
        /// Reading in bits per second, or "unavailable"
        #[arg(required = true, allow_hyphen_values = true)]
        reading: String,

        /// Presentation mode (dynamic_unit or fixed_unit_with_attribute)
        #[arg(short, long, default_value = "fixed_unit_with_attribute")]
        mode: String,

        /// Decimal places of the displayed value
        #[arg(short, long, default_value = "2")]
        precision: u8,

        /// Reading (bit/s) at which dynamic mode switches to Mbit/s
        #[arg(short, long, default_value = "1000000")]
        threshold: f64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a config entry with the guided setup
    Setup {
        /// JSON file with the host's entity states, used to offer sources
        #[arg(long)]
        states: Option<PathBuf>,
    },

    /// Change the settings of an existing config entry
    Configure {
        /// Id of the entry to change
        #[arg(required = true)]
        entry_id: String,

        /// JSON file with the host's entity states, used to offer sources
        #[arg(long)]
        states: Option<PathBuf>,
    },

    /// List the sensors that can be used as sources
    Sources {
        /// JSON file with the host's entity states
        #[arg(long, required = true)]
        states: PathBuf,
    },

    /// Run the configured sensors on "<entity_id> <state>" lines from stdin
    Run {
        /// JSON file with initial host states
        #[arg(long)]
        states: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
