//! Scenario notification records.
//!
//! Messages are self-describing JSON documents. The field set and ordering
//! below are the wire layout; changing them breaks deployed clients.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::PlayerHandle;
use crate::scenario::CriteriaProgress;

/// Who a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    /// Every participant currently in the instance
    #[default]
    Broadcast,
    Player(PlayerHandle),
}

/// Common header of every scenario notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub recipient: Recipient,
    pub scenario_id: u32,
    pub current_step: u32,
    pub timestamp: NaiveDateTime,
    pub body: MessageBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    /// One criteria counter changed
    ProgressUpdate {
        criteria_id: u32,
        current_count: u32,
        /// Client display flags (4 bits used)
        flags: u8,
        time_from_start_ms: u64,
        time_from_create_ms: u64,
    },
    /// Full scenario state, including current-step criteria
    ScenarioState {
        bonus_step: u32,
        criteria: Vec<CriteriaProgress>,
    },
}

/// Elapsed-time fields carried by progress updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElapsedTime {
    /// Time since the instance's first tick
    pub from_start_ms: u64,
    /// Time since the instance was created
    pub from_create_ms: u64,
}

pub fn encode_progress_update(
    scenario_id: u32,
    current_step: u32,
    criteria_id: u32,
    current_count: u32,
    flags: u8,
    timestamp: NaiveDateTime,
    elapsed: ElapsedTime,
) -> Envelope {
    Envelope {
        recipient: Recipient::Broadcast,
        scenario_id,
        current_step,
        timestamp,
        body: MessageBody::ProgressUpdate {
            criteria_id,
            current_count,
            flags: flags & 0x0f,
            time_from_start_ms: elapsed.from_start_ms,
            time_from_create_ms: elapsed.from_create_ms,
        },
    }
}

pub fn encode_scenario_state(
    scenario_id: u32,
    current_step: u32,
    bonus_step: u32,
    criteria: Vec<CriteriaProgress>,
    timestamp: NaiveDateTime,
) -> Envelope {
    Envelope {
        recipient: Recipient::Broadcast,
        scenario_id,
        current_step,
        timestamp,
        body: MessageBody::ScenarioState {
            bonus_step,
            criteria,
        },
    }
}

impl Envelope {
    pub fn is_progress_update(&self) -> bool {
        matches!(self.body, MessageBody::ProgressUpdate { .. })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
