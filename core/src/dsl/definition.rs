//! Instance definition types
//!
//! Definitions are loaded from TOML files and describe the static link tables
//! of one instance: its encounters, the gates and minions bound to them, the
//! dungeon credit list and the optional scenario.

use serde::{Deserialize, Serialize};

use sanctum_types::{Boundary, EncounterCreditKind, GateKind};

use crate::encounter::EncounterIdx;

// ═══════════════════════════════════════════════════════════════════════════
// Root Config Structure
// ═══════════════════════════════════════════════════════════════════════════

/// Instance header for definition files.
/// Contains the metadata needed for indexing and lazy loading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceHeader {
    /// Display name of the instance (e.g., "Halls of Ash")
    pub name: String,

    /// Map the instance runs on. Used to find the definition for a new instance.
    #[serde(default, alias = "id")]
    pub map_id: u32,
}

/// Root structure of an instance definition file.
///
/// ```toml
/// [instance]
/// name = "Halls of Ash"
/// map_id = 1001
///
/// [[encounter]]
/// name = "Gatekeeper"
///
/// [[gate]]
/// entry = 180001
/// encounter = 0
/// kind = "room"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceDefinition {
    pub instance: InstanceHeader,

    /// Boss encounters; the position in the file is the encounter index
    #[serde(default, rename = "encounter", skip_serializing_if = "Vec::is_empty")]
    pub encounters: Vec<EncounterDefinition>,

    #[serde(default, rename = "gate", skip_serializing_if = "Vec::is_empty")]
    pub gates: Vec<GateDefinition>,

    #[serde(default, rename = "minion", skip_serializing_if = "Vec::is_empty")]
    pub minions: Vec<MinionDefinition>,

    /// Dungeon completion credit list
    #[serde(default, rename = "credit", skip_serializing_if = "Vec::is_empty")]
    pub credits: Vec<CreditDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<ScenarioDefinition>,
}

impl InstanceDefinition {
    pub fn encounter_count(&self) -> usize {
        self.encounters.len()
    }

    /// Encounter → criteria routing for scenario credit on completion.
    pub fn scenario_mapping(&self) -> Vec<(EncounterIdx, u32)> {
        self.encounters
            .iter()
            .enumerate()
            .filter_map(|(idx, e)| e.scenario_criteria.map(|criteria| (idx, criteria)))
            .collect()
    }

    pub fn encounter_name(&self, idx: EncounterIdx) -> Option<&str> {
        self.encounters.get(idx).map(|e| e.name.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Link Tables
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncounterDefinition {
    pub name: String,

    /// Scenario criteria credited by one when this encounter is done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_criteria: Option<u32>,
}

/// Gate template bound to an encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDefinition {
    /// Template key of the gate object
    pub entry: u32,
    pub encounter: EncounterIdx,
    #[serde(default)]
    pub kind: GateKind,
    #[serde(default)]
    pub boundary: Boundary,
}

/// Minion template bound to an encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinionDefinition {
    pub entry: u32,
    pub encounter: EncounterIdx,
}

/// Entry of the dungeon completion credit list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditDefinition {
    #[serde(default)]
    pub kind: EncounterCreditKind,
    /// Creature or spell that completes the entry
    pub entry: u32,
    pub encounter: EncounterIdx,
    /// Non-zero marks the final encounter of the named dungeon
    #[serde(default, skip_serializing_if = "is_zero")]
    pub last_encounter_dungeon: u32,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

// ═══════════════════════════════════════════════════════════════════════════
// Scenario
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub id: u32,
    pub max_step: u32,
    #[serde(default, rename = "step", skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    pub index: u32,
    #[serde(default)]
    pub criteria: Vec<CriteriaDefinition>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CriteriaDefinition {
    pub id: u32,
    pub target: u32,
}
