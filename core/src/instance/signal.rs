use chrono::NaiveDateTime;
use sanctum_types::EncounterState;

use crate::encounter::EncounterIdx;
use crate::gates::GateId;
use crate::minions::{MinionCommand, MinionId};

/// Signals emitted by the instance session for external collaborators.
/// These describe "what the world must now do" rather than raw input events.
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceSignal {
    /// An accepted, non-load encounter transition
    EncounterStateChanged {
        encounter: EncounterIdx,
        old_state: EncounterState,
        new_state: EncounterState,
        timestamp: NaiveDateTime,
    },

    /// Passability applied to a live gate object
    GateStateChanged { gate_id: GateId, open: bool },

    /// The owning encounter of a minion changed state (consumed by movement)
    MinionStateChanged {
        minion_id: MinionId,
        state: EncounterState,
    },

    /// A minion must be forced into a behavior
    MinionCommanded {
        minion_id: MinionId,
        command: MinionCommand,
    },

    /// Scenario moved to its next step
    ScenarioStepAdvanced {
        scenario_id: u32,
        step: u32,
        timestamp: NaiveDateTime,
    },

    /// An entry of the dungeon credit list was completed
    EncounterCredited {
        encounter: EncounterIdx,
        timestamp: NaiveDateTime,
    },

    /// The final encounter of a dungeon was credited
    DungeonCompleted {
        dungeon_id: u32,
        timestamp: NaiveDateTime,
    },
}

impl InstanceSignal {
    /// Short name of the variant, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EncounterStateChanged { .. } => "EncounterStateChanged",
            Self::GateStateChanged { .. } => "GateStateChanged",
            Self::MinionStateChanged { .. } => "MinionStateChanged",
            Self::MinionCommanded { .. } => "MinionCommanded",
            Self::ScenarioStepAdvanced { .. } => "ScenarioStepAdvanced",
            Self::EncounterCredited { .. } => "EncounterCredited",
            Self::DungeonCompleted { .. } => "DungeonCompleted",
        }
    }
}
