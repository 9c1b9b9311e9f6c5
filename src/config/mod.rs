pub mod persist;
mod types;

pub use types::*;

use anyhow::{Context, Result};
use bitrate_core::MAX_PRECISION;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Locations searched when no config path is given.
const DEFAULT_PATHS: [&str; 3] = [
    "./bitrate-scaler.toml",
    "~/.config/bitrate-scaler/config.toml",
    "/etc/bitrate-scaler/config.toml",
];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    tracing::debug!("Loaded {} config entries from {:?}", config.entries.len(), path);
    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        if !path.exists() {
            tracing::info!("Config file {:?} does not exist yet, starting empty", path);
            return Ok(Config::default());
        }
        return load_config(path);
    }

    if let Some(path) = find_default_config() {
        return load_config(&path);
    }

    Ok(Config::default())
}

/// First existing file among the default config locations.
pub fn find_default_config() -> Option<PathBuf> {
    DEFAULT_PATHS
        .iter()
        .map(|path_str| PathBuf::from(shellexpand::tilde(path_str).as_ref()))
        .find(|path| path.exists())
}

/// Where a config without an explicit path gets written.
pub fn default_save_path() -> PathBuf {
    find_default_config().unwrap_or_else(|| PathBuf::from(DEFAULT_PATHS[0]))
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.runtime.event_capacity == 0 {
        anyhow::bail!("runtime.event_capacity cannot be 0");
    }

    let mut seen = HashSet::new();
    for entry in &config.entries {
        if !seen.insert(entry.entry_id) {
            anyhow::bail!("Duplicate entry id {}", entry.entry_id);
        }

        if entry.sources.is_empty() {
            anyhow::bail!("Entry '{}' ({}) has no sources", entry.title, entry.entry_id);
        }

        if entry.precision > MAX_PRECISION {
            anyhow::bail!(
                "Entry '{}' has precision {}, maximum is {}",
                entry.title,
                entry.precision,
                MAX_PRECISION
            );
        }

        for scaler in entry.scaler_configs() {
            scaler
                .validate()
                .with_context(|| format!("Invalid entry '{}' ({})", entry.title, entry.entry_id))?;
        }

        if entry.version != ENTRY_VERSION {
            tracing::warn!(
                "Entry {} has schema version {}, expected {}",
                entry.entry_id,
                entry.version,
                ENTRY_VERSION
            );
        }
    }

    Ok(())
}
