//! Encounter registry
//!
//! Owns the fixed-length sequence of boss fight records for one instance.
//! Gates, minions and scenario routing refer to records by [`EncounterIdx`]
//! only; the registry alone decides their lifetime.

pub mod boundary;


use hashbrown::HashMap;
use sanctum_types::{Boundary, EncounterState, Position};

/// Stable index of an encounter, assigned in registration order.
pub type EncounterIdx = usize;

/// State of a single boss fight.
#[derive(Debug, Clone, Default)]
pub struct EncounterRecord {
    pub state: EncounterState,
    /// Set by the first assignment. Until then assignments restore persisted
    /// state instead of acting as transitions.
    live: bool,
    /// Edge → extremal coordinate recorded from linked gates
    boundaries: HashMap<Boundary, f32>,
}

impl EncounterRecord {
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn boundaries(&self) -> &HashMap<Boundary, f32> {
        &self.boundaries
    }
}

/// How a requested state assignment would be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Index out of range or nothing registered
    Invalid,
    /// Record has not gone live yet; the state is restored without side effects
    Load,
    /// Record already holds the requested state
    Unchanged,
    /// A real transition away from `previous`
    Accept { previous: EncounterState },
}

/// Fixed-size store of encounter records for one instance.
#[derive(Debug, Clone, Default)]
pub struct EncounterRegistry {
    records: Vec<EncounterRecord>,
}

impl EncounterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `count` pending records.
    pub fn with_count(count: usize) -> Self {
        let mut registry = Self::new();
        registry.register(count);
        registry
    }

    /// Allocate `count` records, all pending.
    ///
    /// Must be called exactly once, before anything else touches the registry.
    pub fn register(&mut self, count: usize) {
        debug_assert!(
            self.records.is_empty(),
            "encounter registry registered twice"
        );
        if !self.records.is_empty() {
            tracing::error!(
                existing = self.records.len(),
                requested = count,
                "Encounter registry already registered, ignoring"
            );
            return;
        }
        self.records = vec![EncounterRecord::default(); count];
    }

    // --- Accessors ---

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, idx: EncounterIdx) -> Option<&EncounterRecord> {
        self.records.get(idx)
    }

    pub fn state(&self, idx: EncounterIdx) -> Option<EncounterState> {
        self.records.get(idx).map(|r| r.state)
    }

    pub fn states(&self) -> impl Iterator<Item = EncounterState> + '_ {
        self.records.iter().map(|r| r.state)
    }

    pub fn is_encounter_in_progress(&self) -> bool {
        self.records
            .iter()
            .any(|r| r.state == EncounterState::InProgress)
    }

    /// Bit `i` is set when encounter `i` is done. Indices past 31 are not representable.
    pub fn completed_mask(&self) -> u32 {
        self.records
            .iter()
            .enumerate()
            .take(u32::BITS as usize)
            .filter(|(_, r)| r.state == EncounterState::Done)
            .fold(0, |mask, (idx, _)| mask | (1 << idx))
    }

    // --- State Changes ---

    /// Classify an assignment without applying it.
    pub fn check_transition(&self, idx: EncounterIdx, state: EncounterState) -> Transition {
        let Some(record) = self.records.get(idx) else {
            return Transition::Invalid;
        };
        if !record.live {
            Transition::Load
        } else if record.state == state {
            Transition::Unchanged
        } else {
            Transition::Accept {
                previous: record.state,
            }
        }
    }

    /// Restore a persisted state on a record that has not gone live yet.
    /// The record goes live; live records are left untouched.
    pub fn load_state(&mut self, idx: EncounterIdx, state: EncounterState) -> bool {
        let Some(record) = self.records.get_mut(idx) else {
            return false;
        };
        if record.live {
            return false;
        }
        record.state = state;
        record.live = true;
        true
    }

    /// Commit a state that already passed [`check_transition`](Self::check_transition).
    /// Returns the previous state.
    pub fn commit(&mut self, idx: EncounterIdx, state: EncounterState) -> Option<EncounterState> {
        let record = self.records.get_mut(idx)?;
        let previous = record.state;
        record.state = state;
        record.live = true;
        Some(previous)
    }

    // --- Boundaries ---

    /// Record the coordinate of a gate marking `boundary` of an encounter.
    pub fn record_boundary(&mut self, idx: EncounterIdx, boundary: Boundary, position: Position) {
        let Some(record) = self.records.get_mut(idx) else {
            return;
        };
        if let Some(value) = boundary::edge_value(boundary, position) {
            record.boundaries.insert(boundary, value);
        }
    }

    /// Whether `position` is inside every boundary recorded for the encounter.
    /// Unknown encounters and encounters without boundaries contain everything.
    pub fn is_within_boundary(&self, idx: EncounterIdx, position: Position) -> bool {
        self.records
            .get(idx)
            .is_none_or(|r| boundary::contains(&r.boundaries, position))
    }
}
