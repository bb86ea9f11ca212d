//! Instance definition loading and saving
//!
//! Load and save instance definitions from/to TOML files, and index a
//! directory of definitions by map id.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use hashbrown::HashSet;
use serde::Deserialize;

use super::{
    DslError, InstanceDefinition, InstanceHeader, ScenarioDefinition, ScenarioDefinitionError,
};

/// Lightweight index entry for lazy loading.
/// Only contains metadata needed to find the right file.
#[derive(Debug, Clone)]
pub struct InstanceIndexEntry {
    pub name: String,
    pub map_id: u32,
    pub file_path: PathBuf,
}

/// Index mapping map_id -> definition file
pub type InstanceIndex = HashMap<u32, InstanceIndexEntry>;

/// Header-only view of a definition file
#[derive(Deserialize)]
struct HeaderOnly {
    instance: InstanceHeader,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════════════════════════

/// Load and validate an instance definition from a TOML file.
pub fn load_instance_from_file(path: &Path) -> Result<InstanceDefinition, DslError> {
    let content = fs::read_to_string(path).map_err(|source| DslError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_instance(&content, path)
}

/// Parse and validate definition text. `path` is only used in errors and logs.
pub fn parse_instance(content: &str, path: &Path) -> Result<InstanceDefinition, DslError> {
    let mut definition: InstanceDefinition =
        toml::from_str(content).map_err(|source| DslError::ParseToml {
            path: path.to_path_buf(),
            source,
        })?;

    drop_dangling_links(&mut definition, path);
    if let Some(scenario) = &definition.scenario {
        validate_scenario(scenario).map_err(|source| DslError::InvalidScenario {
            path: path.to_path_buf(),
            scenario_id: scenario.id,
            source,
        })?;
    }

    Ok(definition)
}

/// Load just the instance header from a file (lightweight, for indexing)
pub fn load_instance_header(path: &Path) -> Result<InstanceHeader, DslError> {
    let content = fs::read_to_string(path).map_err(|source| DslError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let header: HeaderOnly = toml::from_str(&content).map_err(|source| DslError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(header.instance)
}

/// Build a map index from a directory of definition files (recursive).
/// Only reads `[instance]` headers. Unreadable files are skipped with a warning.
pub fn build_instance_index(dir: &Path) -> Result<InstanceIndex, DslError> {
    let mut index = HashMap::new();

    if !dir.exists() {
        return Ok(index);
    }

    build_instance_index_recursive(dir, &mut index)?;
    Ok(index)
}

fn build_instance_index_recursive(dir: &Path, index: &mut InstanceIndex) -> Result<(), DslError> {
    let entries = fs::read_dir(dir).map_err(|source| DslError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();

        if path.is_dir() {
            build_instance_index_recursive(&path, index)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match load_instance_header(&path) {
                Ok(header) if header.map_id != 0 => {
                    index.insert(
                        header.map_id,
                        InstanceIndexEntry {
                            name: header.name,
                            map_id: header.map_id,
                            file_path: path,
                        },
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping definition file");
                }
            }
        }
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════════════════════════

/// Remove table entries that reference an encounter the instance doesn't have.
fn drop_dangling_links(definition: &mut InstanceDefinition, path: &Path) {
    let count = definition.encounters.len();
    let warn = |table: &str, entry: u32, encounter: usize| {
        tracing::warn!(
            path = %path.display(),
            table,
            entry,
            encounter,
            count,
            "Dropping link to unknown encounter"
        );
    };

    definition.gates.retain(|g| {
        let keep = g.encounter < count;
        if !keep {
            warn("gate", g.entry, g.encounter);
        }
        keep
    });
    definition.minions.retain(|m| {
        let keep = m.encounter < count;
        if !keep {
            warn("minion", m.entry, m.encounter);
        }
        keep
    });
    definition.credits.retain(|c| {
        let keep = c.encounter < count;
        if !keep {
            warn("credit", c.entry, c.encounter);
        }
        keep
    });
}

fn validate_scenario(scenario: &ScenarioDefinition) -> Result<(), ScenarioDefinitionError> {
    if scenario.max_step == 0 {
        return Err(ScenarioDefinitionError::NoSteps);
    }

    let mut seen_steps = HashSet::new();
    for step in &scenario.steps {
        if !(1..=scenario.max_step).contains(&step.index) {
            return Err(ScenarioDefinitionError::StepOutOfRange {
                index: step.index,
                max_step: scenario.max_step,
            });
        }
        if !seen_steps.insert(step.index) {
            return Err(ScenarioDefinitionError::DuplicateStep(step.index));
        }

        let mut seen_criteria = HashSet::new();
        for criteria in &step.criteria {
            if !seen_criteria.insert(criteria.id) {
                return Err(ScenarioDefinitionError::DuplicateCriteria {
                    criteria_id: criteria.id,
                    step: step.index,
                });
            }
        }
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Saving
// ═══════════════════════════════════════════════════════════════════════════════

/// Save an instance definition to a TOML file
pub fn save_instance_to_file(definition: &InstanceDefinition, path: &Path) -> Result<(), DslError> {
    let content = toml::to_string_pretty(definition)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| DslError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, content).map_err(|source| DslError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}
