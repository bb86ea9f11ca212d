//! Textual encoding of the encounter-state vector.
//!
//! A save is the integer state code of every record in index order,
//! separated by single spaces. Loading is lenient: codes at or above the
//! pending sentinel are skipped and the first unparsable word ends the load.

use sanctum_types::{EncounterState, PENDING_CODE};

use crate::encounter::EncounterRegistry;

/// Encode every record's state. An empty registry yields an empty string.
pub fn save(registry: &EncounterRegistry) -> String {
    registry
        .states()
        .map(|state| state.code().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Restore states from a save produced by [`save`], in load mode.
///
/// Returns the number of records that were restored.
pub fn load(data: &str, registry: &mut EncounterRegistry) -> usize {
    let mut restored = 0;

    for (idx, word) in data.split_whitespace().enumerate() {
        if idx >= registry.len() {
            break;
        }
        let Ok(code) = word.parse::<u32>() else {
            tracing::warn!(position = idx, word, "Malformed encounter save, truncating load");
            break;
        };
        if code >= PENDING_CODE {
            continue;
        }
        let Some(state) = EncounterState::from_code(code) else {
            tracing::debug!(position = idx, code, "Unknown encounter state code, skipping");
            continue;
        };
        if registry.load_state(idx, state) {
            restored += 1;
        }
    }

    restored
}
