//! Gate state resolution.
//!
//! A gate's passability is derived from the encounter(s) its template is
//! linked to. Several rules may share one template key; the gate is open
//! only if every rule votes open.

use hashbrown::{HashMap, HashSet};
use sanctum_types::{Boundary, EncounterState, GateKind, Position};

use crate::encounter::{EncounterIdx, EncounterRegistry};
use crate::instance::InstanceSignal;

/// Live world-object identifier of a gate.
pub type GateId = u64;

/// Template entry shared by gate or minion objects of one kind.
pub type TemplateKey = u32;

/// A spawned gate object as reported by the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateObject {
    pub id: GateId,
    pub entry: TemplateKey,
    pub position: Position,
}

/// One link between a gate template and an encounter.
#[derive(Debug, Clone)]
pub struct GateRule {
    pub kind: GateKind,
    pub boundary: Boundary,
    pub encounter: EncounterIdx,
    /// Live gate objects currently linked through this rule
    live: HashSet<GateId>,
}

impl GateRule {
    pub fn new(kind: GateKind, boundary: Boundary, encounter: EncounterIdx) -> Self {
        Self {
            kind,
            boundary,
            encounter,
            live: HashSet::new(),
        }
    }

    /// This rule's vote given the linked encounter's state.
    pub fn votes_open(&self, state: EncounterState) -> bool {
        match self.kind {
            GateKind::Room => state != EncounterState::InProgress,
            GateKind::Passage => state == EncounterState::Done,
            GateKind::SpawnHole => state == EncounterState::InProgress,
            GateKind::Other => true,
        }
    }

    pub fn live_gates(&self) -> impl Iterator<Item = GateId> + '_ {
        self.live.iter().copied()
    }
}

#[derive(Debug, Clone, Copy)]
struct LiveGate {
    entry: TemplateKey,
    /// Last openness applied to the object
    open: Option<bool>,
}

/// Derives and applies gate passability from linked encounter states.
#[derive(Debug, Clone, Default)]
pub struct GateStateResolver {
    rules: HashMap<TemplateKey, Vec<GateRule>>,
    live: HashMap<GateId, LiveGate>,
}

impl GateStateResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template rule. Setup only, before any gate object is linked.
    pub fn add_rule(&mut self, entry: TemplateKey, rule: GateRule) {
        self.rules.entry(entry).or_default().push(rule);
    }

    pub fn rules(&self, entry: TemplateKey) -> &[GateRule] {
        self.rules.get(&entry).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Last openness applied to a live gate (`None` if unknown).
    pub fn openness(&self, gate_id: GateId) -> Option<bool> {
        self.live.get(&gate_id).and_then(|g| g.open)
    }

    /// Link or unlink a spawned gate object.
    ///
    /// Linking records the gate's boundary coordinates on the owning
    /// encounters and immediately applies the gate's openness.
    pub fn add_gate_link(
        &mut self,
        gate: GateObject,
        linking: bool,
        registry: &mut EncounterRegistry,
    ) -> Vec<InstanceSignal> {
        let Some(rules) = self.rules.get_mut(&gate.entry) else {
            tracing::debug!(gate = gate.id, entry = gate.entry, "Unknown gate template");
            return Vec::new();
        };

        if !linking {
            for rule in rules.iter_mut() {
                rule.live.remove(&gate.id);
            }
            self.live.remove(&gate.id);
            return Vec::new();
        }

        for rule in rules.iter_mut() {
            rule.live.insert(gate.id);
            registry.record_boundary(rule.encounter, rule.boundary, gate.position);
        }
        self.live.insert(
            gate.id,
            LiveGate {
                entry: gate.entry,
                open: None,
            },
        );

        self.update_gate(gate.id, registry)
    }

    /// Recompute a gate's openness and apply it to every live gate sharing its template.
    pub fn update_gate(&mut self, gate_id: GateId, registry: &EncounterRegistry) -> Vec<InstanceSignal> {
        let Some(entry) = self.live.get(&gate_id).map(|g| g.entry) else {
            tracing::debug!(gate = gate_id, "Gate not linked");
            return Vec::new();
        };
        self.update_entry(entry, registry)
    }

    /// Recompute every live gate linked to the encounter.
    pub fn refresh_encounter(
        &mut self,
        idx: EncounterIdx,
        registry: &EncounterRegistry,
    ) -> Vec<InstanceSignal> {
        let mut entries: Vec<TemplateKey> = self
            .rules
            .iter()
            .filter(|(_, rules)| {
                rules
                    .iter()
                    .any(|rule| rule.encounter == idx && !rule.live.is_empty())
            })
            .map(|(&entry, _)| entry)
            .collect();
        entries.sort_unstable();

        entries
            .into_iter()
            .flat_map(|entry| self.update_entry(entry, registry))
            .collect()
    }

    /// Openness of a template: AND over its rules, first "closed" vote wins.
    pub fn resolve(&self, entry: TemplateKey, registry: &EncounterRegistry) -> Option<bool> {
        let rules = self.rules.get(&entry)?;
        Some(rules.iter().all(|rule| {
            let state = registry.state(rule.encounter).unwrap_or_default();
            rule.votes_open(state)
        }))
    }

    fn update_entry(&mut self, entry: TemplateKey, registry: &EncounterRegistry) -> Vec<InstanceSignal> {
        let Some(open) = self.resolve(entry, registry) else {
            return Vec::new();
        };

        let mut signals = Vec::new();
        let mut ids: Vec<GateId> = self
            .live
            .iter()
            .filter(|(_, g)| g.entry == entry)
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();

        for id in ids {
            let Some(gate) = self.live.get_mut(&id) else { continue };
            if gate.open != Some(open) {
                gate.open = Some(open);
                signals.push(InstanceSignal::GateStateChanged { gate_id: id, open });
            }
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(id: GateId, entry: TemplateKey) -> GateObject {
        GateObject {
            id,
            entry,
            position: Position::new(0.0, 0.0),
        }
    }

    fn live_registry(count: usize) -> EncounterRegistry {
        let mut registry = EncounterRegistry::with_count(count);
        for idx in 0..count {
            registry.load_state(idx, EncounterState::NotStarted);
        }
        registry
    }

    #[test]
    fn room_gate_closes_only_while_in_progress() {
        let mut registry = live_registry(1);
        let mut gates = GateStateResolver::new();
        gates.add_rule(10, GateRule::new(GateKind::Room, Boundary::None, 0));
        gates.add_gate_link(gate(1, 10), true, &mut registry);

        for (state, expected) in [
            (EncounterState::NotStarted, true),
            (EncounterState::InProgress, false),
            (EncounterState::Done, true),
            (EncounterState::Special, true),
        ] {
            registry.commit(0, state);
            gates.refresh_encounter(0, &registry);
            assert_eq!(gates.openness(1), Some(expected), "state {state}");
        }
    }

    #[test]
    fn rules_sharing_a_key_are_and_combined() {
        let mut registry = live_registry(2);
        registry.commit(0, EncounterState::Done);
        registry.commit(1, EncounterState::NotStarted);

        let mut gates = GateStateResolver::new();
        gates.add_rule(10, GateRule::new(GateKind::Room, Boundary::None, 0));
        gates.add_rule(10, GateRule::new(GateKind::Passage, Boundary::None, 1));
        gates.add_gate_link(gate(1, 10), true, &mut registry);

        assert_eq!(gates.openness(1), Some(false));

        registry.commit(1, EncounterState::Done);
        let signals = gates.refresh_encounter(1, &registry);
        assert_eq!(gates.openness(1), Some(true));
        assert_eq!(
            signals,
            vec![InstanceSignal::GateStateChanged { gate_id: 1, open: true }]
        );
    }

    #[test]
    fn spawn_hole_and_other_kinds() {
        let mut registry = live_registry(1);
        let mut gates = GateStateResolver::new();
        gates.add_rule(20, GateRule::new(GateKind::SpawnHole, Boundary::None, 0));
        gates.add_rule(30, GateRule::new(GateKind::Other, Boundary::None, 0));
        gates.add_gate_link(gate(1, 20), true, &mut registry);
        gates.add_gate_link(gate(2, 30), true, &mut registry);

        assert_eq!(gates.openness(1), Some(false));
        assert_eq!(gates.openness(2), Some(true));

        registry.commit(0, EncounterState::InProgress);
        gates.refresh_encounter(0, &registry);
        assert_eq!(gates.openness(1), Some(true));
        assert_eq!(gates.openness(2), Some(true));
    }

    #[test]
    fn update_applies_to_every_gate_with_the_same_key() {
        let mut registry = live_registry(1);
        let mut gates = GateStateResolver::new();
        gates.add_rule(10, GateRule::new(GateKind::Room, Boundary::None, 0));
        gates.add_gate_link(gate(1, 10), true, &mut registry);
        gates.add_gate_link(gate(2, 10), true, &mut registry);

        registry.commit(0, EncounterState::InProgress);
        let signals = gates.update_gate(1, &registry);

        assert_eq!(signals.len(), 2);
        assert_eq!(gates.openness(1), Some(false));
        assert_eq!(gates.openness(2), Some(false));
    }

    #[test]
    fn unknown_template_and_unlink_are_quiet() {
        let mut registry = live_registry(1);
        let mut gates = GateStateResolver::new();
        gates.add_rule(10, GateRule::new(GateKind::Room, Boundary::None, 0));

        assert!(gates.add_gate_link(gate(1, 99), true, &mut registry).is_empty());
        assert_eq!(gates.openness(1), None);

        gates.add_gate_link(gate(2, 10), true, &mut registry);
        assert_eq!(gates.live_count(), 1);
        assert!(gates.add_gate_link(gate(2, 10), false, &mut registry).is_empty());
        assert_eq!(gates.live_count(), 0);
        assert_eq!(gates.rules(10)[0].live_gates().count(), 0);
        assert!(gates.update_gate(2, &registry).is_empty());
    }

    #[test]
    fn linking_records_boundary_on_owner() {
        let mut registry = live_registry(1);
        let mut gates = GateStateResolver::new();
        gates.add_rule(10, GateRule::new(GateKind::Room, Boundary::N, 0));
        gates.add_gate_link(
            GateObject {
                id: 1,
                entry: 10,
                position: Position::new(42.0, 7.0),
            },
            true,
            &mut registry,
        );

        let record = registry.get(0).unwrap();
        assert_eq!(record.boundaries().get(&Boundary::N), Some(&42.0));
        assert!(registry.is_within_boundary(0, Position::new(40.0, 0.0)));
        assert!(!registry.is_within_boundary(0, Position::new(43.0, 0.0)));
    }
}
