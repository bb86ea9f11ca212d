use chrono::NaiveDateTime;
use sanctum_types::{EncounterCreditKind, EncounterState};

use super::{InstanceSignal, InstanceSignalHandler};
use crate::broadcast::{
    self, ElapsedTime, Envelope, PlayerHandle, Recipient, SessionTransport,
    encode_progress_update, encode_scenario_state,
};
use crate::dsl::{CreditDefinition, InstanceDefinition};
use crate::encounter::{EncounterIdx, EncounterRegistry, Transition};
use crate::gates::{GateId, GateObject, GateRule, GateStateResolver};
use crate::minions::{MinionId, MinionObject, MinionStateSynchronizer, MinionStatus};
use crate::scenario::{ScenarioProgressTracker, ScenarioUpdate};
use crate::storage::{SaveQueue, SaveRequest, codec};

/// Runtime state of one instance.
pub struct InstanceSession<T: SessionTransport> {
    instance_id: u32,
    map_id: u32,
    name: String,
    encounter_names: Vec<String>,

    registry: EncounterRegistry,
    gates: GateStateResolver,
    minions: MinionStateSynchronizer,
    scenario: Option<ScenarioProgressTracker>,

    /// Dungeon completion credit list
    credits: Vec<CreditDefinition>,
    /// Bits of encounters completed through the credit list
    credited_mask: u32,

    save_queue: Option<SaveQueue>,
    /// Last token handed to the save queue
    last_save: String,

    transport: T,
    /// Signals not yet collected by the owner
    signals: Vec<InstanceSignal>,

    created_at: NaiveDateTime,
    now: NaiveDateTime,
    /// Accumulated tick time since the instance started
    elapsed_ms: u64,
}

impl<T: SessionTransport> InstanceSession<T> {
    /// Build a fresh instance from its definition. Every encounter starts
    /// pending, so its first assignment is a load.
    pub fn new(
        instance_id: u32,
        definition: &InstanceDefinition,
        transport: T,
        now: NaiveDateTime,
    ) -> Self {
        Self::build(instance_id, definition, transport, now)
    }

    /// Build an instance and restore its persisted encounter states. Records
    /// the save does not cover stay pending.
    pub fn restored(
        instance_id: u32,
        definition: &InstanceDefinition,
        transport: T,
        now: NaiveDateTime,
        data: &str,
        completed_mask: u32,
    ) -> Self {
        let mut session = Self::build(instance_id, definition, transport, now);
        session.restore(data, completed_mask);
        session
    }

    fn build(
        instance_id: u32,
        definition: &InstanceDefinition,
        transport: T,
        now: NaiveDateTime,
    ) -> Self {
        let registry = EncounterRegistry::with_count(definition.encounter_count());

        let mut gates = GateStateResolver::new();
        for gate in &definition.gates {
            gates.add_rule(
                gate.entry,
                GateRule::new(gate.kind, gate.boundary, gate.encounter),
            );
        }

        let mut minions = MinionStateSynchronizer::new();
        for minion in &definition.minions {
            minions.add_link(minion.entry, minion.encounter);
        }

        let scenario = definition.scenario.as_ref().map(|def| {
            let mut tracker = ScenarioProgressTracker::new(def.id, def.max_step);
            for step_def in &def.steps {
                let Some(step) = tracker.get_step(step_def.index) else {
                    continue;
                };
                for criteria in &step_def.criteria {
                    step.add_criteria(criteria.id, criteria.target);
                }
            }
            tracker.load_scenario_mapping(definition.scenario_mapping(), def.id);
            tracker
        });

        tracing::info!(
            instance = instance_id,
            map = definition.instance.map_id,
            encounters = registry.len(),
            scenario = scenario.as_ref().map(|s| s.scenario_id()),
            "Instance created"
        );

        Self {
            instance_id,
            map_id: definition.instance.map_id,
            name: definition.instance.name.clone(),
            encounter_names: definition.encounters.iter().map(|e| e.name.clone()).collect(),
            registry,
            gates,
            minions,
            scenario,
            credits: definition.credits.clone(),
            credited_mask: 0,
            save_queue: None,
            last_save: String::new(),
            transport,
            signals: Vec::new(),
            created_at: now,
            now,
            elapsed_ms: 0,
        }
    }

    /// Persist every accepted transition through `queue`.
    pub fn with_save_queue(mut self, queue: SaveQueue) -> Self {
        self.save_queue = Some(queue);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }

    pub fn map_id(&self) -> u32 {
        self.map_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn encounter_name(&self, idx: EncounterIdx) -> Option<&str> {
        self.encounter_names.get(idx).map(String::as_str)
    }

    pub fn registry(&self) -> &EncounterRegistry {
        &self.registry
    }

    pub fn gates(&self) -> &GateStateResolver {
        &self.gates
    }

    pub fn minions(&self) -> &MinionStateSynchronizer {
        &self.minions
    }

    pub fn scenario(&self) -> Option<&ScenarioProgressTracker> {
        self.scenario.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn last_save(&self) -> &str {
        &self.last_save
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Done encounters plus encounters completed through the credit list.
    pub fn completed_mask(&self) -> u32 {
        self.registry.completed_mask() | self.credited_mask
    }

    /// Last passability applied to a live gate.
    pub fn gate_openness(&self, gate_id: GateId) -> Option<bool> {
        self.gates.openness(gate_id)
    }

    /// True when nobody present is both alive and a regular player.
    pub fn is_wipe(&self) -> bool {
        !self
            .transport
            .participants()
            .iter()
            .any(|p| p.alive && !p.game_master)
    }

    /// Take every signal emitted since the last call.
    pub fn drain_signals(&mut self) -> Vec<InstanceSignal> {
        std::mem::take(&mut self.signals)
    }

    /// Hand every pending signal to `handler`.
    pub fn dispatch_signals(&mut self, handler: &mut impl InstanceSignalHandler) {
        let signals = self.drain_signals();
        handler.handle_signals(&signals, &self.registry);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Encounter State
    // ─────────────────────────────────────────────────────────────────────────

    /// Load persisted states into pending records. Returns the number of records restored.
    fn restore(&mut self, data: &str, completed_mask: u32) -> usize {
        let restored = codec::load(data, &mut self.registry);
        self.credited_mask = completed_mask & !self.registry.completed_mask();
        self.last_save = codec::save(&self.registry);
        tracing::info!(instance = self.instance_id, restored, "Instance state restored");
        restored
    }

    /// Load `state` into every encounter that is still pending. Returns the
    /// number of records loaded.
    pub fn initialize_encounters(&mut self, state: EncounterState) -> usize {
        let pending: Vec<EncounterIdx> = (0..self.registry.len())
            .filter(|&idx| self.registry.get(idx).is_some_and(|r| !r.is_live()))
            .collect();
        for &idx in &pending {
            self.set_encounter_state(idx, state);
        }
        pending.len()
    }

    /// Request a state change for an encounter. Returns true when the
    /// transition was accepted and its effects applied.
    pub fn set_encounter_state(&mut self, idx: EncounterIdx, state: EncounterState) -> bool {
        let previous = match self.registry.check_transition(idx, state) {
            Transition::Invalid => {
                tracing::debug!(encounter = idx, %state, "Invalid encounter index");
                return false;
            }
            Transition::Load => {
                self.registry.load_state(idx, state);
                return false;
            }
            Transition::Unchanged => return false,
            Transition::Accept { previous } => previous,
        };

        if state == EncounterState::Done {
            if self.minions.has_living_world_shared(idx) {
                tracing::debug!(
                    encounter = idx,
                    "Completion refused while a world-shared minion lives"
                );
                return false;
            }
            self.credit_encounter_criteria(idx);
        }

        self.registry.commit(idx, state);
        tracing::info!(
            instance = self.instance_id,
            encounter = idx,
            from = %previous,
            to = %state,
            "Encounter state changed"
        );

        self.save();

        let gate_signals = self.gates.refresh_encounter(idx, &self.registry);
        self.signals.extend(gate_signals);
        self.signals
            .extend(self.minions.push_encounter_state(idx, state));
        self.signals.push(InstanceSignal::EncounterStateChanged {
            encounter: idx,
            old_state: previous,
            new_state: state,
            timestamp: self.now,
        });

        true
    }

    /// Encode and queue the full registry. Returns false when there is
    /// nothing to persist.
    pub fn save(&mut self) -> bool {
        let data = codec::save(&self.registry);
        if data.is_empty() {
            return false;
        }
        self.last_save.clone_from(&data);

        if let Some(queue) = &self.save_queue {
            let request = SaveRequest {
                instance_id: self.instance_id,
                data,
                completed_mask: self.completed_mask(),
            };
            if let Err(e) = queue.submit(request) {
                tracing::warn!(instance = self.instance_id, error = %e, "Save dropped");
            }
        }
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Links
    // ─────────────────────────────────────────────────────────────────────────

    pub fn link_gate(&mut self, gate: GateObject, linking: bool) {
        let signals = self.gates.add_gate_link(gate, linking, &mut self.registry);
        self.signals.extend(signals);
    }

    pub fn link_minion(&mut self, minion: MinionObject, linking: bool) -> bool {
        self.minions.add_minion_link(minion, linking)
    }

    pub fn update_minion_status(&mut self, minion_id: MinionId, status: MinionStatus) -> bool {
        self.minions.update_status(minion_id, status)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scenario
    // ─────────────────────────────────────────────────────────────────────────

    /// Credit a criteria on the current scenario step.
    pub fn credit_criteria(&mut self, criteria_id: u32, amount: u32) {
        let Some(tracker) = self.scenario.as_mut() else {
            return;
        };
        let updates = tracker.credit_criteria(criteria_id, amount);
        self.broadcast_updates(&updates);
    }

    /// Full scenario state, as sent to late joiners and after step changes.
    pub fn scenario_state_message(&self) -> Option<Envelope> {
        let tracker = self.scenario.as_ref()?;
        Some(encode_scenario_state(
            tracker.scenario_id(),
            tracker.current_step(),
            0,
            tracker.current_criteria(),
            self.now,
        ))
    }

    /// Send the scenario state to a player who just entered.
    pub fn on_player_enter(&mut self, player: PlayerHandle) -> usize {
        match self.scenario_state_message() {
            Some(message) => broadcast::send(&mut self.transport, message, Recipient::Player(player)),
            None => 0,
        }
    }

    /// Credit the criteria routed from a completed encounter. Progress goes
    /// out first, then the full state.
    fn credit_encounter_criteria(&mut self, idx: EncounterIdx) {
        let Some(tracker) = self.scenario.as_mut() else {
            return;
        };
        let Some(criteria_id) = tracker.criteria_for_encounter(idx) else {
            return;
        };

        let updates = tracker.credit_criteria(criteria_id, 1);
        let advanced = self.broadcast_updates(&updates);
        if !updates.is_empty() && !advanced {
            self.broadcast_state();
        }
    }

    /// Broadcast tracker output in order. Returns true if a step advanced.
    fn broadcast_updates(&mut self, updates: &[ScenarioUpdate]) -> bool {
        let Some(scenario_id) = self.scenario.as_ref().map(|t| t.scenario_id()) else {
            return false;
        };
        // Progress is reported against the step it was credited on
        let advances = updates
            .iter()
            .filter(|u| matches!(u, ScenarioUpdate::StepAdvanced { .. }))
            .count() as u32;
        let mut shown_step = self
            .scenario
            .as_ref()
            .map_or(0, |t| t.current_step().saturating_sub(advances));

        let mut advanced = false;
        for update in updates {
            match *update {
                ScenarioUpdate::Progress {
                    criteria_id,
                    current_count,
                } => {
                    let message = encode_progress_update(
                        scenario_id,
                        shown_step,
                        criteria_id,
                        current_count,
                        0,
                        self.now,
                        self.elapsed(),
                    );
                    broadcast::send(&mut self.transport, message, Recipient::Broadcast);
                }
                ScenarioUpdate::StepAdvanced { step } => {
                    advanced = true;
                    shown_step = step;
                    self.signals.push(InstanceSignal::ScenarioStepAdvanced {
                        scenario_id,
                        step,
                        timestamp: self.now,
                    });
                    self.broadcast_state();
                }
            }
        }
        advanced
    }

    fn broadcast_state(&mut self) {
        if let Some(message) = self.scenario_state_message() {
            broadcast::send(&mut self.transport, message, Recipient::Broadcast);
        }
    }

    fn elapsed(&self) -> ElapsedTime {
        let since_create = (self.now - self.created_at).num_milliseconds().max(0);
        ElapsedTime {
            from_start_ms: self.elapsed_ms,
            from_create_ms: since_create as u64,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dungeon Credit
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a world event against the dungeon credit list. Returns true if
    /// any entry matched.
    pub fn credit_encounter(&mut self, kind: EncounterCreditKind, entry: u32) -> bool {
        let matched: Vec<(EncounterIdx, u32)> = self
            .credits
            .iter()
            .filter(|c| c.kind == kind && c.entry == entry)
            .map(|c| (c.encounter, c.last_encounter_dungeon))
            .collect();
        if matched.is_empty() {
            return false;
        }

        for (encounter, dungeon_id) in matched {
            if encounter < u32::BITS as usize {
                self.credited_mask |= 1 << encounter;
            }
            tracing::info!(instance = self.instance_id, encounter, "Encounter credited");
            self.signals.push(InstanceSignal::EncounterCredited {
                encounter,
                timestamp: self.now,
            });

            if dungeon_id != 0 {
                tracing::info!(instance = self.instance_id, dungeon = dungeon_id, "Dungeon completed");
                self.signals.push(InstanceSignal::DungeonCompleted {
                    dungeon_id,
                    timestamp: self.now,
                });
            }
        }

        self.save();
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Time
    // ─────────────────────────────────────────────────────────────────────────

    /// Accumulate tick time into the time-from-start counter.
    pub fn tick(&mut self, diff_ms: u64) {
        self.elapsed_ms = self.elapsed_ms.saturating_add(diff_ms);
    }

    /// Move the session clock forward. Older timestamps are ignored.
    pub(super) fn observe_time(&mut self, timestamp: NaiveDateTime) {
        if timestamp > self.now {
            self.now = timestamp;
        }
    }
}
