//! Configuration persistence using toml_edit to preserve formatting and comments.

use super::{Config, EntryConfig};
use anyhow::{Context, Result};
use std::path::Path;
use toml_edit::DocumentMut;

/// Save the entire config to a TOML file, replacing its contents.
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    let new_content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config")?;
    let new_doc: DocumentMut = new_content
        .parse()
        .with_context(|| "Failed to parse serialized config")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    std::fs::write(path, new_doc.to_string())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    tracing::info!("Wrote config to {:?}", path);
    Ok(())
}

/// Update just the entries section of the config file.
///
/// Falls back to [`save_config`] semantics when the file does not exist yet.
pub fn update_entries(path: &Path, entries: &[EntryConfig]) -> Result<()> {
    if !path.exists() {
        let config = Config {
            entries: entries.to_vec(),
            ..Config::default()
        };
        return save_config(path, &config);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut doc: DocumentMut = content
        .parse()
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    let entries_toml = toml::to_string(&EntriesWrapper {
        entries: entries.to_vec(),
    })
    .with_context(|| "Failed to serialize entries")?;
    let entries_doc: DocumentMut = entries_toml
        .parse()
        .with_context(|| "Failed to parse serialized entries")?;

    if let Some(entries_item) = entries_doc.get("entries") {
        doc["entries"] = entries_item.clone();
    } else {
        doc.remove("entries");
    }

    std::fs::write(path, doc.to_string())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    tracing::info!("Updated {} entries in {:?}", entries.len(), path);
    Ok(())
}

#[derive(serde::Serialize)]
struct EntriesWrapper {
    entries: Vec<EntryConfig>,
}
