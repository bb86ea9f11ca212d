use chrono::NaiveDateTime;
use sanctum_types::EncounterCreditKind;

use crate::broadcast::PlayerHandle;
use crate::encounter::EncounterIdx;
use crate::gates::{GateId, GateObject, TemplateKey};
use crate::minions::{MinionId, MinionObject, MinionStatus};

/// A world event routed into an instance session.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldEvent {
    pub timestamp: NaiveDateTime,
    pub kind: WorldEventKind,
}

impl WorldEvent {
    pub fn new(timestamp: NaiveDateTime, kind: WorldEventKind) -> Self {
        Self { timestamp, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldEventKind {
    GateSpawned(GateObject),
    GateDespawned { id: GateId, entry: TemplateKey },
    MinionSpawned(MinionObject),
    MinionDespawned { id: MinionId, entry: TemplateKey },
    MinionStatusChanged { id: MinionId, status: MinionStatus },
    BossEngaged(EncounterIdx),
    BossDefeated(EncounterIdx),
    BossReset(EncounterIdx),
    CriteriaCredited { criteria_id: u32, amount: u32 },
    EncounterCredit { kind: EncounterCreditKind, entry: u32 },
    PlayerEntered(PlayerHandle),
    /// Periodic update carrying the time since the previous tick
    Tick { diff_ms: u64 },
}
