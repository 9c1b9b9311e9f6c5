mod cli;

use bitrate_scaler::{
    config,
    flow::{self, prompt, FlowStep, OptionsFlow, SetupFlow},
    platform::Platform,
    sensor::SensorState,
    state::{self, SourceState, StateRegistry},
};
use bitrate_core::{convert, EntryId, Outcome, PresentationMode, Reading, ScalerConfig};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncBufReadExt;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag.
    // Logs go to stderr so stdout stays machine-readable.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "bitrate_scaler=debug,bitrate_core=debug".to_string()
        } else {
            "bitrate_scaler=info,bitrate_core=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            reading,
            mode,
            precision,
            threshold,
            json,
        } => convert_reading(&reading, &mode, precision, threshold, json),
        Commands::Setup { states } => {
            let path = cli.config.unwrap_or_else(config::default_save_path);
            setup(&path, states.as_deref())
        }
        Commands::Configure { entry_id, states } => {
            let path = cli.config.unwrap_or_else(config::default_save_path);
            configure(&path, &entry_id, states.as_deref())
        }
        Commands::Sources { states } => list_sources(&states),
        Commands::Run { states } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_sensors(cli.config.as_deref(), states.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("bitrate-scaler {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn convert_reading(
    reading: &str,
    mode: &str,
    precision: u8,
    threshold: f64,
    json: bool,
) -> Result<()> {
    let mode: PresentationMode = mode.parse()?;
    let config = ScalerConfig::new("cli")
        .with_mode(mode)
        .with_precision(precision)
        .with_threshold(threshold);
    config.validate()?;

    let outcome = convert(Reading::parse(reading)?, &config)?;
    tracing::debug!("{} bit/s -> {:?}", reading, outcome);

    match outcome {
        Outcome::Unavailable if json => println!("{}", serde_json::json!({ "state": "unavailable" })),
        Outcome::Unavailable => println!("unavailable"),
        Outcome::Converted(conversion) if json => {
            println!("{}", serde_json::to_string(&conversion)?);
        }
        Outcome::Converted(conversion) => {
            println!("{} {}", conversion.formatted_value(), conversion.unit_label());
            for (key, value) in &conversion.attributes {
                println!("  {}: {}", key, value);
            }
        }
    }
    Ok(())
}

fn load_states(path: Option<&Path>) -> Result<Vec<SourceState>> {
    match path {
        Some(p) => state::load_snapshot(p),
        None => Ok(Vec::new()),
    }
}

fn setup(config_path: &Path, states_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(Some(config_path))?;
    let states = load_states(states_path)?;

    let flow = SetupFlow::new(&states).with_existing(config.entries.clone());
    if flow.candidates().is_empty() {
        tracing::info!("No host states given, any sensor.* id is accepted as a source");
    }

    let stdin = std::io::stdin();
    match prompt::run_flow(&flow, stdin.lock(), std::io::stdout())? {
        FlowStep::CreateEntry { title, entry } => {
            let entry_id = entry.entry_id;
            config.upsert_entry(entry);
            config::persist::update_entries(config_path, &config.entries)?;
            println!("Created entry '{}' ({})", title, entry_id);
            Ok(())
        }
        FlowStep::Abort { reason } => anyhow::bail!("Setup aborted: {}", reason),
        FlowStep::Form { .. } => anyhow::bail!("Setup did not finish"),
    }
}

fn configure(config_path: &Path, entry_id: &str, states_path: Option<&Path>) -> Result<()> {
    let entry_id: EntryId = entry_id
        .parse()
        .with_context(|| format!("Invalid entry id: {}", entry_id))?;
    let mut config = config::load_config(config_path)?;
    let entry = config
        .find_entry(entry_id)
        .cloned()
        .ok_or_else(|| bitrate_core::Error::not_found("entry", entry_id))?;
    let states = load_states(states_path)?;

    let flow = OptionsFlow::new(entry, &states);
    let stdin = std::io::stdin();
    match prompt::run_flow(&flow, stdin.lock(), std::io::stdout())? {
        FlowStep::CreateEntry { entry, .. } => {
            config.upsert_entry(entry);
            config::persist::update_entries(config_path, &config.entries)?;
            println!("Updated entry {}", entry_id);
            Ok(())
        }
        FlowStep::Abort { reason } => anyhow::bail!("Configuration aborted: {}", reason),
        FlowStep::Form { .. } => anyhow::bail!("Configuration did not finish"),
    }
}

fn list_sources(states_path: &Path) -> Result<()> {
    let states = state::load_snapshot(states_path)?;
    let sources = flow::discover_sources(&states);
    if sources.is_empty() {
        println!("No sensor.*.rx / sensor.*.tx entities found");
    }
    for source in sources {
        println!("{}", source);
    }
    Ok(())
}

async fn run_sensors(config_path: Option<&Path>, states_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    if config.entries.is_empty() {
        anyhow::bail!("No config entries, run `bitrate-scaler setup` first");
    }

    let registry = StateRegistry::new(config.runtime.event_capacity);
    for source in load_states(states_path)? {
        registry.insert(source);
    }

    let platform = Platform::with_capacity(registry.clone(), config.runtime.event_capacity);
    let mut updates = platform.subscribe();
    for entry in config.entries {
        platform.setup_entry(entry)?;
    }

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => apply_line(&registry, &line),
                None => break,
            },
            update = updates.recv() => match update {
                Ok(state) => print_state(&state)?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Output fell behind, {} sensor updates dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    tracing::info!("Shutting down...");
    platform.shutdown().await;
    loop {
        match updates.try_recv() {
            Ok(state) => print_state(&state)?,
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!("Output fell behind, {} sensor updates dropped", skipped);
            }
            Err(_) => break,
        }
    }
    Ok(())
}

/// Apply one `"<entity_id> <state>"` line; an id without state removes it.
fn apply_line(registry: &StateRegistry, line: &str) {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return;
    }
    match line.split_once(char::is_whitespace) {
        Some((entity_id, state)) => registry.set(entity_id, state.trim()),
        None => {
            if registry.remove(line).is_none() {
                tracing::debug!("Ignoring removal of unknown entity {}", line);
            }
        }
    }
}

fn print_state(state: &SensorState) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", serde_json::to_string(state)?)?;
    stdout.flush()?;
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let path: Option<PathBuf> = path.map(Path::to_path_buf).or_else(config::find_default_config);
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(&p)?;
            println!("✓ Configuration is valid");
            println!("  Event capacity: {}", config.runtime.event_capacity);
            println!("  Entries: {}", config.entries.len());
            for entry in &config.entries {
                println!(
                    "    {} '{}': {} sources, {}, precision {}",
                    entry.entry_id,
                    entry.title,
                    entry.sources.len(),
                    entry.mode,
                    entry.precision
                );
            }
        }
        None => {
            println!("No config file found, using defaults");
            let config = config::Config::default();
            println!("  Event capacity: {}", config.runtime.event_capacity);
            println!("  Entries: 0");
        }
    }

    Ok(())
}
