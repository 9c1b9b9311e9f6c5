use crate::state::SourceState;

/// Object-id suffixes of interface counters offered as sources.
const SOURCE_SUFFIXES: [&str; 2] = [".rx", ".tx"];

/// Entity ids of every `sensor.*` whose id ends in `.rx` or `.tx`, sorted.
pub fn discover_sources(states: &[SourceState]) -> Vec<String> {
    let mut matches: Vec<String> = states
        .iter()
        .filter(|state| state.domain() == "sensor")
        .map(|state| state.entity_id.as_str())
        .filter(|id| SOURCE_SUFFIXES.iter().any(|suffix| id.ends_with(suffix)))
        .map(str::to_string)
        .collect();
    matches.sort();
    matches.dedup();
    matches
}
