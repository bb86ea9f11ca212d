use hashbrown::HashMap;
use std::collections::BTreeMap;

use super::step::{CriteriaProgress, ScenarioStep};
use crate::encounter::EncounterIdx;

/// Index of the step every scenario starts on.
pub const FIRST_STEP: u32 = 1;

/// Observable outcome of a criteria credit, in the order it must be broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioUpdate {
    /// A criteria counter on the current step changed
    Progress { criteria_id: u32, current_count: u32 },
    /// The current step moved forward by one
    StepAdvanced { step: u32 },
}

/// Objective-based progression: ordered steps, each a set of criteria.
///
/// The current step never decreases and never exceeds `max_step`. Steps are
/// materialized on first access.
#[derive(Debug, Clone)]
pub struct ScenarioProgressTracker {
    scenario_id: u32,
    current_step: u32,
    max_step: u32,
    steps: BTreeMap<u32, ScenarioStep>,
    /// Encounter → criteria credited when the encounter is done
    encounter_criteria: HashMap<EncounterIdx, u32>,
}

impl ScenarioProgressTracker {
    pub fn new(scenario_id: u32, max_step: u32) -> Self {
        Self {
            scenario_id,
            current_step: FIRST_STEP,
            max_step: max_step.max(FIRST_STEP),
            steps: BTreeMap::new(),
            encounter_criteria: HashMap::new(),
        }
    }

    // --- Accessors ---

    pub fn scenario_id(&self) -> u32 {
        self.scenario_id
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    pub fn max_step(&self) -> u32 {
        self.max_step
    }

    pub fn step(&self, index: u32) -> Option<&ScenarioStep> {
        self.steps.get(&index)
    }

    /// Progress of every criteria on the current step, ordered by criteria id.
    pub fn current_criteria(&self) -> Vec<CriteriaProgress> {
        self.step(self.current_step)
            .map(|step| step.criteria().copied().collect())
            .unwrap_or_default()
    }

    pub fn current_step_criteria_count(&self, criteria_id: u32) -> u32 {
        self.step(self.current_step)
            .map_or(0, |step| step.criteria_count(criteria_id))
    }

    /// The current step exists and all of its criteria are satisfied.
    pub fn is_current_step_complete(&self) -> bool {
        self.step(self.current_step)
            .is_some_and(ScenarioStep::is_complete)
    }

    /// Final step reached and satisfied.
    pub fn is_finished(&self) -> bool {
        self.current_step == self.max_step && self.is_current_step_complete()
    }

    // --- Setup ---

    /// Route encounter completions to criteria on this scenario.
    ///
    /// Only affects credit routing; step and criteria storage are untouched.
    pub fn load_scenario_mapping(
        &mut self,
        mapping: impl IntoIterator<Item = (EncounterIdx, u32)>,
        scenario_id: u32,
    ) {
        self.encounter_criteria.extend(mapping);
        self.scenario_id = scenario_id;
    }

    pub fn criteria_for_encounter(&self, idx: EncounterIdx) -> Option<u32> {
        self.encounter_criteria.get(&idx).copied()
    }

    /// Step at `index`, created on first access. `None` outside `1..=max_step`.
    pub fn get_step(&mut self, index: u32) -> Option<&mut ScenarioStep> {
        if !(FIRST_STEP..=self.max_step).contains(&index) {
            tracing::debug!(scenario = self.scenario_id, step = index, "Step out of range");
            return None;
        }
        Some(
            self.steps
                .entry(index)
                .or_insert_with(|| ScenarioStep::new(index)),
        )
    }

    // --- Progress ---

    /// Credit a criteria on the current step.
    ///
    /// Emits a progress update for every successful credit, then at most one
    /// step advance, even if the following step is already satisfied.
    pub fn credit_criteria(&mut self, criteria_id: u32, amount: u32) -> Vec<ScenarioUpdate> {
        let current = self.current_step;
        let Some(step) = self.steps.get_mut(&current) else {
            tracing::debug!(
                scenario = self.scenario_id,
                step = current,
                criteria = criteria_id,
                "Credit for unmaterialized step ignored"
            );
            return Vec::new();
        };
        let Some(current_count) = step.credit(criteria_id, amount) else {
            tracing::debug!(
                scenario = self.scenario_id,
                step = current,
                criteria = criteria_id,
                "Credit for unregistered criteria ignored"
            );
            return Vec::new();
        };

        let mut updates = vec![ScenarioUpdate::Progress {
            criteria_id,
            current_count,
        }];

        if step.is_complete() && current < self.max_step {
            self.current_step = current + 1;
            tracing::info!(
                scenario = self.scenario_id,
                step = self.current_step,
                "Scenario advanced"
            );
            updates.push(ScenarioUpdate::StepAdvanced {
                step: self.current_step,
            });
        }

        updates
    }
}
