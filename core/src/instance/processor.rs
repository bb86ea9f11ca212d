use sanctum_types::{EncounterState, Position};

use super::{InstanceSession, InstanceSignal, WorldEvent, WorldEventKind};
use crate::broadcast::SessionTransport;
use crate::gates::GateObject;
use crate::minions::{MinionObject, MinionStatus};

impl<T: SessionTransport> InstanceSession<T> {
    /// Route a world event into the session.
    /// Returns every signal emitted while handling it, in emission order.
    pub fn process_event(&mut self, event: WorldEvent) -> Vec<InstanceSignal> {
        self.observe_time(event.timestamp);

        match event.kind {
            // ═══════════════════════════════════════════════════════════════
            // Object lifecycle
            // ═══════════════════════════════════════════════════════════════
            WorldEventKind::GateSpawned(gate) => self.link_gate(gate, true),
            WorldEventKind::GateDespawned { id, entry } => {
                let gate = GateObject {
                    id,
                    entry,
                    position: Position::default(),
                };
                self.link_gate(gate, false);
            }
            WorldEventKind::MinionSpawned(minion) => {
                self.link_minion(minion, true);
            }
            WorldEventKind::MinionDespawned { id, entry } => {
                let minion = MinionObject {
                    id,
                    entry,
                    status: MinionStatus::default(),
                };
                self.link_minion(minion, false);
            }
            WorldEventKind::MinionStatusChanged { id, status } => {
                if !self.update_minion_status(id, status) {
                    tracing::debug!(minion = id, "Status for untracked minion ignored");
                }
            }

            // ═══════════════════════════════════════════════════════════════
            // Encounter transitions
            // ═══════════════════════════════════════════════════════════════
            WorldEventKind::BossEngaged(idx) => {
                self.set_encounter_state(idx, EncounterState::InProgress);
            }
            WorldEventKind::BossDefeated(idx) => {
                self.set_encounter_state(idx, EncounterState::Done);
            }
            WorldEventKind::BossReset(idx) => {
                self.set_encounter_state(idx, EncounterState::NotStarted);
            }

            // ═══════════════════════════════════════════════════════════════
            // Credit and session
            // ═══════════════════════════════════════════════════════════════
            WorldEventKind::CriteriaCredited {
                criteria_id,
                amount,
            } => self.credit_criteria(criteria_id, amount),
            WorldEventKind::EncounterCredit { kind, entry } => {
                self.credit_encounter(kind, entry);
            }
            WorldEventKind::PlayerEntered(player) => {
                self.on_player_enter(player);
            }
            WorldEventKind::Tick { diff_ms } => self.tick(diff_ms),
        }

        self.drain_signals()
    }
}
