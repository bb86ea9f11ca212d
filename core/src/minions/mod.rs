//! Minion state synchronization.
//!
//! Minions are creatures that belong to an encounter. Every accepted
//! encounter transition is pushed onto each live minion of that encounter,
//! possibly forcing a behavior on it.

use hashbrown::HashMap;
use sanctum_types::EncounterState;

use crate::encounter::EncounterIdx;
use crate::gates::TemplateKey;
use crate::instance::InstanceSignal;

/// Live world-object identifier of a minion.
pub type MinionId = u64;

/// Snapshot of a minion's world state, as last reported by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinionStatus {
    pub alive: bool,
    pub in_combat: bool,
    pub has_target: bool,
    /// Shared with the open world; its fight stays contestable while it lives
    pub world_shared: bool,
}

impl Default for MinionStatus {
    fn default() -> Self {
        Self {
            alive: true,
            in_combat: false,
            has_target: false,
            world_shared: false,
        }
    }
}

/// A spawned minion object as reported by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinionObject {
    pub id: MinionId,
    pub entry: TemplateKey,
    pub status: MinionStatus,
}

/// Behavior forced on a minion by an encounter transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinionCommand {
    Respawn,
    /// Drop combat and return home
    Evade,
    /// Engage the nearest hostile
    EngageNearby,
}

/// Command a minion receives when its encounter enters `state`.
pub fn push_state(status: &MinionStatus, state: EncounterState) -> Option<MinionCommand> {
    match state {
        EncounterState::NotStarted if !status.alive => Some(MinionCommand::Respawn),
        EncounterState::NotStarted if status.in_combat => Some(MinionCommand::Evade),
        EncounterState::InProgress if !status.alive => Some(MinionCommand::Respawn),
        EncounterState::InProgress if !status.has_target => Some(MinionCommand::EngageNearby),
        _ => None,
    }
}

/// Link between a minion template and its encounter.
#[derive(Debug, Clone)]
pub struct MinionLink {
    pub encounter: EncounterIdx,
    live: HashMap<MinionId, MinionStatus>,
}

impl MinionLink {
    pub fn new(encounter: EncounterIdx) -> Self {
        Self {
            encounter,
            live: HashMap::new(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

/// Pushes encounter-state changes onto linked minions.
#[derive(Debug, Clone, Default)]
pub struct MinionStateSynchronizer {
    links: HashMap<TemplateKey, MinionLink>,
    /// Live minion → template, for status updates by id
    index: HashMap<MinionId, TemplateKey>,
}

impl MinionStateSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template link. Setup only; a later link for the same template replaces it.
    pub fn add_link(&mut self, entry: TemplateKey, encounter: EncounterIdx) {
        self.links.insert(entry, MinionLink::new(encounter));
    }

    pub fn link(&self, entry: TemplateKey) -> Option<&MinionLink> {
        self.links.get(&entry)
    }

    pub fn status(&self, minion_id: MinionId) -> Option<MinionStatus> {
        let entry = self.index.get(&minion_id)?;
        self.links.get(entry)?.live.get(&minion_id).copied()
    }

    /// Track or untrack a spawned minion. Returns false for an unknown template.
    pub fn add_minion_link(&mut self, minion: MinionObject, linking: bool) -> bool {
        let Some(link) = self.links.get_mut(&minion.entry) else {
            tracing::debug!(minion = minion.id, entry = minion.entry, "Unknown minion template");
            return false;
        };

        if linking {
            link.live.insert(minion.id, minion.status);
            self.index.insert(minion.id, minion.entry);
        } else {
            link.live.remove(&minion.id);
            self.index.remove(&minion.id);
        }
        true
    }

    /// Refresh the status snapshot of a tracked minion.
    pub fn update_status(&mut self, minion_id: MinionId, status: MinionStatus) -> bool {
        let Some(entry) = self.index.get(&minion_id) else {
            return false;
        };
        let Some(slot) = self
            .links
            .get_mut(entry)
            .and_then(|link| link.live.get_mut(&minion_id))
        else {
            return false;
        };
        *slot = status;
        true
    }

    /// Whether a live, world-shared minion still holds the encounter open.
    pub fn has_living_world_shared(&self, idx: EncounterIdx) -> bool {
        self.links_for(idx)
            .flat_map(|link| link.live.values())
            .any(|status| status.world_shared && status.alive)
    }

    /// Push a new encounter state onto every minion linked to it.
    pub fn push_encounter_state(
        &self,
        idx: EncounterIdx,
        state: EncounterState,
    ) -> Vec<InstanceSignal> {
        let mut minions: Vec<(MinionId, MinionStatus)> = self
            .links_for(idx)
            .flat_map(|link| link.live.iter().map(|(&id, &status)| (id, status)))
            .collect();
        minions.sort_unstable_by_key(|(id, _)| *id);

        let mut signals = Vec::with_capacity(minions.len());
        for (minion_id, status) in minions {
            signals.push(InstanceSignal::MinionStateChanged { minion_id, state });
            if let Some(command) = push_state(&status, state) {
                signals.push(InstanceSignal::MinionCommanded { minion_id, command });
            }
        }
        signals
    }

    fn links_for(&self, idx: EncounterIdx) -> impl Iterator<Item = &MinionLink> + '_ {
        self.links.values().filter(move |link| link.encounter == idx)
    }
}
