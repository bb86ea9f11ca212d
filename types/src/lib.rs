//! Shared types for Sanctum
//!
//! This crate contains serializable types that are shared between the engine
//! (sanctum-core) and its drivers (sanctum-cli). Anything that appears in an
//! instance definition file, a persisted save or the application config lives here.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Encounter State
// ─────────────────────────────────────────────────────────────────────────────

/// Integer code written for a record that has never been assigned a state.
///
/// Persisted values at or above this code are ignored on load.
pub const PENDING_CODE: u32 = 5;

/// Progress of a single boss fight.
///
/// The integer codes are part of the persisted format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterState {
    NotStarted,
    InProgress,
    Done,
    Special,
    /// Not yet decided; the state every record starts in
    #[default]
    Pending,
}

impl EncounterState {
    /// Persisted integer code for this state
    pub fn code(self) -> u32 {
        match self {
            Self::NotStarted => 0,
            Self::InProgress => 1,
            // 2 was a "failed" state in older saves; it is never written
            Self::Done => 3,
            Self::Special => 4,
            Self::Pending => PENDING_CODE,
        }
    }

    /// Decode a persisted integer code. Unknown codes yield `None`.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::NotStarted),
            1 => Some(Self::InProgress),
            3 => Some(Self::Done),
            4 => Some(Self::Special),
            PENDING_CODE => Some(Self::Pending),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::InProgress => "in progress",
            Self::Done => "done",
            Self::Special => "special",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for EncounterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gates
// ─────────────────────────────────────────────────────────────────────────────

/// How a gate's passability follows its linked encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// Closes while the fight is in progress (locks players in the room)
    #[default]
    Room,
    /// Opens once the fight is done (leads onward)
    Passage,
    /// Open only while the fight is in progress (adds pour out of it)
    SpawnHole,
    /// Never contributes a "closed" vote
    Other,
}

impl GateKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::Passage => "passage",
            Self::SpawnHole => "spawn hole",
            Self::Other => "other",
        }
    }
}

/// Edge of an encounter area marked by a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
    #[default]
    None,
}

/// World-space position on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dungeon Credit
// ─────────────────────────────────────────────────────────────────────────────

/// World event that completes an entry of the dungeon credit list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterCreditKind {
    #[default]
    KillCreature,
    CastSpell,
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Config
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration.
///
/// Note: Persistence methods (load/save) are provided by sanctum-core via the
/// `AppConfigExt` trait, as they require platform-specific dependencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding one persisted save per instance
    #[serde(default)]
    pub data_directory: String,

    /// Directory scanned for instance definition files
    #[serde(default)]
    pub definitions_directory: String,

    /// Build a scenario tracker for instances that define one
    #[serde(default = "default_true")]
    pub scenarios_enabled: bool,

    #[serde(default)]
    pub debug_logging: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_directory: String::new(),
            definitions_directory: String::new(),
            scenarios_enabled: true,
            debug_logging: false,
        }
    }
}

impl AppConfig {
    /// Create a config rooted at the given directories.
    /// Other fields use their default values.
    pub fn with_directories(data_directory: String, definitions_directory: String) -> Self {
        Self {
            data_directory,
            definitions_directory,
            ..Self::default()
        }
    }
}

fn default_true() -> bool {
    true
}
