use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counter for one criteria on a scenario step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaProgress {
    pub criteria_id: u32,
    pub current: u32,
    pub target: u32,
}

impl CriteriaProgress {
    pub fn is_complete(&self) -> bool {
        self.current >= self.target
    }
}

/// One step of a scenario: a set of countable criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioStep {
    pub index: u32,
    criteria: BTreeMap<u32, CriteriaProgress>,
}

impl ScenarioStep {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            criteria: BTreeMap::new(),
        }
    }

    /// Register a criteria with its target. Returns false if already registered.
    pub fn add_criteria(&mut self, criteria_id: u32, target: u32) -> bool {
        if self.criteria.contains_key(&criteria_id) {
            return false;
        }
        self.criteria.insert(
            criteria_id,
            CriteriaProgress {
                criteria_id,
                current: 0,
                target,
            },
        );
        true
    }

    /// Add `amount` to a registered criteria. Returns the new count.
    pub fn credit(&mut self, criteria_id: u32, amount: u32) -> Option<u32> {
        let progress = self.criteria.get_mut(&criteria_id)?;
        progress.current = progress.current.wrapping_add(amount);
        Some(progress.current)
    }

    /// Current count of a criteria (0 if not registered).
    pub fn criteria_count(&self, criteria_id: u32) -> u32 {
        self.criteria.get(&criteria_id).map_or(0, |c| c.current)
    }

    pub fn has_criteria(&self, criteria_id: u32) -> bool {
        self.criteria.contains_key(&criteria_id)
    }

    /// Every counter has reached its target.
    pub fn is_complete(&self) -> bool {
        self.criteria.values().all(CriteriaProgress::is_complete)
    }

    pub fn criteria(&self) -> impl Iterator<Item = &CriteriaProgress> {
        self.criteria.values()
    }
}
