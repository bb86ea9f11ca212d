//! Tests for the instance session
//!
//! Covers encounter transitions end to end: gate passability, minion
//! commands, scenario broadcasts, persistence and dungeon credit.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use sanctum_types::{Boundary, EncounterCreditKind, EncounterState, GateKind, Position};

use super::{InstanceSession, InstanceSignal, InstanceSignalHandler, WorldEvent, WorldEventKind};
use crate::broadcast::{Envelope, MessageBody, Participant, PlayerHandle, Recipient, SessionTransport};
use crate::dsl::{
    CreditDefinition, CriteriaDefinition, EncounterDefinition, GateDefinition, InstanceDefinition,
    InstanceHeader, MinionDefinition, ScenarioDefinition, StepDefinition,
};
use crate::encounter::EncounterRegistry;
use crate::gates::GateObject;
use crate::minions::{MinionCommand, MinionObject, MinionStatus};
use crate::storage::SaveQueue;

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingTransport {
    present: Vec<Participant>,
    delivered: Vec<(PlayerHandle, Envelope)>,
}

impl RecordingTransport {
    fn with_players(handles: &[PlayerHandle]) -> Self {
        Self {
            present: handles.iter().copied().map(Participant::new).collect(),
            delivered: Vec::new(),
        }
    }
}

impl SessionTransport for RecordingTransport {
    fn participants(&self) -> Vec<Participant> {
        self.present.clone()
    }

    fn deliver(&mut self, player: PlayerHandle, payload: &[u8]) {
        let envelope = Envelope::from_bytes(payload).expect("payload decodes");
        self.delivered.push((player, envelope));
    }
}

fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn encounter(name: &str, scenario_criteria: Option<u32>) -> EncounterDefinition {
    EncounterDefinition {
        name: name.to_string(),
        scenario_criteria,
    }
}

fn gate(entry: u32, encounter: usize, kind: GateKind) -> GateDefinition {
    GateDefinition {
        entry,
        encounter,
        kind,
        boundary: Boundary::None,
    }
}

/// Three encounters, scenario 42 with step 1 = {900: 1, 901: 2}, step 2 = {902: 1}.
///
/// Gates: 10 = Room@0, 20 = Room@0 AND Passage@1, 30 = SpawnHole@1.
/// Minions: 500 → encounter 0, 600 → encounter 2.
fn make_definition() -> InstanceDefinition {
    InstanceDefinition {
        instance: InstanceHeader {
            name: "Halls of Ash".to_string(),
            map_id: 1001,
        },
        encounters: vec![
            encounter("Gatekeeper", Some(900)),
            encounter("Ash Lord", None),
            encounter("Warden", None),
        ],
        gates: vec![
            GateDefinition {
                boundary: Boundary::N,
                ..gate(10, 0, GateKind::Room)
            },
            gate(20, 0, GateKind::Room),
            gate(20, 1, GateKind::Passage),
            gate(30, 1, GateKind::SpawnHole),
        ],
        minions: vec![
            MinionDefinition {
                entry: 500,
                encounter: 0,
            },
            MinionDefinition {
                entry: 600,
                encounter: 2,
            },
        ],
        credits: vec![
            CreditDefinition {
                kind: EncounterCreditKind::KillCreature,
                entry: 7000,
                encounter: 1,
                last_encounter_dungeon: 0,
            },
            CreditDefinition {
                kind: EncounterCreditKind::KillCreature,
                entry: 7001,
                encounter: 2,
                last_encounter_dungeon: 55,
            },
        ],
        scenario: Some(ScenarioDefinition {
            id: 42,
            max_step: 2,
            steps: vec![
                StepDefinition {
                    index: 1,
                    criteria: vec![
                        CriteriaDefinition { id: 900, target: 1 },
                        CriteriaDefinition { id: 901, target: 2 },
                    ],
                },
                StepDefinition {
                    index: 2,
                    criteria: vec![CriteriaDefinition { id: 902, target: 1 }],
                },
            ],
        }),
    }
}

fn fresh_session(players: &[PlayerHandle]) -> InstanceSession<RecordingTransport> {
    InstanceSession::new(
        7,
        &make_definition(),
        RecordingTransport::with_players(players),
        base_time(),
    )
}

/// Fresh session with every encounter loaded as not started.
fn make_session(players: &[PlayerHandle]) -> InstanceSession<RecordingTransport> {
    let mut session = fresh_session(players);
    assert_eq!(session.initialize_encounters(EncounterState::NotStarted), 3);
    session
}

fn spawn_gate(session: &mut InstanceSession<RecordingTransport>, id: u64, entry: u32) {
    session.link_gate(
        GateObject {
            id,
            entry,
            position: Position::new(10.0, 5.0),
        },
        true,
    );
}

fn spawn_minion(
    session: &mut InstanceSession<RecordingTransport>,
    id: u64,
    entry: u32,
    status: MinionStatus,
) {
    assert!(session.link_minion(MinionObject { id, entry, status }, true));
}

fn event(offset_ms: i64, kind: WorldEventKind) -> WorldEvent {
    WorldEvent::new(base_time() + Duration::milliseconds(offset_ms), kind)
}

// ─────────────────────────────────────────────────────────────────────────────
// Encounter State
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn set_then_read_yields_requested_state() {
    let mut session = make_session(&[]);

    for state in [
        EncounterState::InProgress,
        EncounterState::Done,
        EncounterState::NotStarted,
        EncounterState::Special,
    ] {
        assert!(session.set_encounter_state(1, state));
        assert_eq!(session.registry().state(1), Some(state));
    }

    // Same state again is a no-op
    assert!(!session.set_encounter_state(1, EncounterState::Special));
}

#[test]
fn first_assignment_on_fresh_session_is_a_load() {
    let mut session = fresh_session(&[1]);
    spawn_gate(&mut session, 1, 10);
    session.drain_signals();

    assert!(!session.set_encounter_state(0, EncounterState::Done));
    assert_eq!(session.registry().state(0), Some(EncounterState::Done));

    assert!(session.transport().delivered.is_empty());
    assert!(session.drain_signals().is_empty());
    assert_eq!(session.last_save(), "");
    assert_eq!(session.scenario().unwrap().current_step_criteria_count(900), 0);

    // The record is live now
    assert!(session.set_encounter_state(0, EncounterState::InProgress));
    assert_eq!(session.gate_openness(1), Some(false));
}

#[test]
fn initializing_leaves_live_encounters_alone() {
    let mut session = make_session(&[]);
    spawn_gate(&mut session, 1, 10);
    session.set_encounter_state(0, EncounterState::InProgress);
    session.drain_signals();

    assert_eq!(session.initialize_encounters(EncounterState::NotStarted), 0);
    assert_eq!(session.registry().state(0), Some(EncounterState::InProgress));
    assert_eq!(session.gate_openness(1), Some(false));
    assert!(session.drain_signals().is_empty());
}

#[test]
fn out_of_range_index_is_ignored() {
    let mut session = make_session(&[]);
    assert!(!session.set_encounter_state(3, EncounterState::Done));
    assert!(session.drain_signals().is_empty());
    assert_eq!(session.last_save(), "");
}

#[test]
fn completion_refused_while_world_shared_minion_lives() {
    let mut session = make_session(&[]);
    let shared = MinionStatus {
        world_shared: true,
        has_target: true,
        ..MinionStatus::default()
    };
    spawn_minion(&mut session, 61, 600, shared);

    assert!(session.set_encounter_state(2, EncounterState::InProgress));
    assert!(!session.set_encounter_state(2, EncounterState::Done));
    assert_eq!(session.registry().state(2), Some(EncounterState::InProgress));

    let dead = MinionStatus {
        alive: false,
        ..shared
    };
    session.process_event(event(0, WorldEventKind::MinionStatusChanged { id: 61, status: dead }));
    assert!(session.set_encounter_state(2, EncounterState::Done));
}

#[test]
fn accepted_transition_emits_state_change_last() {
    let mut session = make_session(&[]);
    spawn_minion(&mut session, 1, 500, MinionStatus::default());
    session.drain_signals();

    session.set_encounter_state(0, EncounterState::InProgress);
    let signals = session.drain_signals();

    assert!(matches!(
        signals.last(),
        Some(InstanceSignal::EncounterStateChanged {
            encounter: 0,
            old_state: EncounterState::NotStarted,
            new_state: EncounterState::InProgress,
            ..
        })
    ));
    assert!(signals.contains(&InstanceSignal::MinionStateChanged {
        minion_id: 1,
        state: EncounterState::InProgress
    }));
}

// ─────────────────────────────────────────────────────────────────────────────
// Gates
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn room_gate_open_unless_in_progress() {
    let mut session = make_session(&[]);
    spawn_gate(&mut session, 1, 10);

    for (state, open) in [
        (EncounterState::NotStarted, true),
        (EncounterState::InProgress, false),
        (EncounterState::Done, true),
        (EncounterState::Special, true),
    ] {
        session.set_encounter_state(0, state);
        assert_eq!(session.gate_openness(1), Some(open), "state {state}");
    }
}

#[test]
fn shared_key_requires_every_rule_to_vote_open() {
    let mut session = make_session(&[]);
    spawn_gate(&mut session, 2, 20);

    session.set_encounter_state(0, EncounterState::Done);
    session.set_encounter_state(1, EncounterState::NotStarted);
    assert_eq!(session.gate_openness(2), Some(false));
    session.drain_signals();

    session.set_encounter_state(1, EncounterState::Done);
    assert_eq!(session.gate_openness(2), Some(true));
    assert!(session.drain_signals().contains(&InstanceSignal::GateStateChanged {
        gate_id: 2,
        open: true
    }));
}

#[test]
fn spawn_hole_opens_only_during_fight() {
    let mut session = make_session(&[]);
    spawn_gate(&mut session, 3, 30);
    assert_eq!(session.gate_openness(3), Some(false));

    session.set_encounter_state(1, EncounterState::InProgress);
    assert_eq!(session.gate_openness(3), Some(true));

    session.process_event(event(0, WorldEventKind::GateDespawned { id: 3, entry: 30 }));
    assert_eq!(session.gate_openness(3), None);
}

#[test]
fn linked_gate_records_encounter_boundary() {
    let mut session = make_session(&[]);
    spawn_gate(&mut session, 1, 10);

    let registry: &EncounterRegistry = session.registry();
    assert!(registry.is_within_boundary(0, Position::new(9.0, 0.0)));
    assert!(!registry.is_within_boundary(0, Position::new(11.0, 0.0)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Minions
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn minion_engages_on_pull_and_evades_on_reset() {
    let mut session = make_session(&[]);
    spawn_minion(&mut session, 5, 500, MinionStatus::default());
    session.set_encounter_state(0, EncounterState::Done);
    session.drain_signals();

    session.set_encounter_state(0, EncounterState::InProgress);
    assert!(session.drain_signals().contains(&InstanceSignal::MinionCommanded {
        minion_id: 5,
        command: MinionCommand::EngageNearby
    }));

    let fighting = MinionStatus {
        in_combat: true,
        has_target: true,
        ..MinionStatus::default()
    };
    assert!(session.update_minion_status(5, fighting));
    session.set_encounter_state(0, EncounterState::NotStarted);
    assert!(session.drain_signals().contains(&InstanceSignal::MinionCommanded {
        minion_id: 5,
        command: MinionCommand::Evade
    }));
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario Broadcasts
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn boss_completion_sends_progress_before_state() {
    let mut session = make_session(&[1, 2]);

    session.set_encounter_state(0, EncounterState::Done);
    let delivered = &session.transport().delivered;

    assert_eq!(delivered.len(), 4);
    assert!(delivered[..2].iter().all(|(_, m)| m.is_progress_update()));
    assert!(delivered[2..].iter().all(|(_, m)| !m.is_progress_update()));
    assert!(matches!(
        delivered[0].1.body,
        MessageBody::ProgressUpdate {
            criteria_id: 900,
            current_count: 1,
            ..
        }
    ));
    assert_eq!(session.scenario().unwrap().current_step(), 1);
}

#[test]
fn completing_step_advances_and_broadcasts_state() {
    let mut session = make_session(&[1]);
    session.set_encounter_state(0, EncounterState::Done);
    session.credit_criteria(901, 1);
    session.transport_mut().delivered.clear();
    session.drain_signals();

    session.credit_criteria(901, 1);

    let delivered = &session.transport().delivered;
    assert_eq!(delivered.len(), 2);
    assert!(delivered[0].1.is_progress_update());
    assert_eq!(delivered[0].1.current_step, 1);
    let state = &delivered[1].1;
    assert_eq!(state.current_step, 2);
    assert!(matches!(
        &state.body,
        MessageBody::ScenarioState { criteria, .. } if criteria.len() == 1 && criteria[0].criteria_id == 902
    ));
    assert!(matches!(
        session.drain_signals().as_slice(),
        [InstanceSignal::ScenarioStepAdvanced {
            scenario_id: 42,
            step: 2,
            ..
        }]
    ));
}

#[test]
fn crediting_empty_session_delivers_nothing() {
    let mut session = make_session(&[]);
    session.credit_criteria(901, 2);
    session.credit_criteria(900, 1);

    assert!(session.transport().delivered.is_empty());
    assert_eq!(session.scenario().unwrap().current_step(), 2);
}

#[test]
fn late_joiner_receives_state_only() {
    let mut session = make_session(&[1, 2]);
    session.process_event(event(0, WorldEventKind::PlayerEntered(9)));

    let delivered = &session.transport().delivered;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, 9);
    assert_eq!(delivered[0].1.recipient, Recipient::Player(9));
    assert!(!delivered[0].1.is_progress_update());
}

#[test]
fn progress_update_carries_elapsed_time() {
    let mut session = make_session(&[1]);
    session.process_event(event(0, WorldEventKind::Tick { diff_ms: 1500 }));
    session.process_event(event(
        2000,
        WorldEventKind::CriteriaCredited {
            criteria_id: 901,
            amount: 1,
        },
    ));

    let (_, message) = &session.transport().delivered[0];
    assert!(matches!(
        message.body,
        MessageBody::ProgressUpdate {
            time_from_start_ms: 1500,
            time_from_create_ms: 2000,
            ..
        }
    ));
    assert_eq!(message.timestamp, base_time() + Duration::milliseconds(2000));
}

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn accepted_transitions_queue_full_snapshots() {
    let (queue, mut rx) = SaveQueue::channel();
    let mut session = make_session(&[]).with_save_queue(queue);

    session.set_encounter_state(0, EncounterState::InProgress);
    session.set_encounter_state(0, EncounterState::InProgress);
    session.set_encounter_state(0, EncounterState::Done);

    let first = rx.try_recv().unwrap();
    assert_eq!(first.instance_id, 7);
    assert_eq!(first.data, "1 0 0");
    assert_eq!(first.completed_mask, 0);

    let second = rx.try_recv().unwrap();
    assert_eq!(second.data, "3 0 0");
    assert_eq!(second.completed_mask, 0b001);

    assert!(rx.try_recv().is_err());
}

#[test]
fn restored_session_is_live() {
    let mut session = InstanceSession::restored(
        7,
        &make_definition(),
        RecordingTransport::default(),
        base_time(),
        "3 0 4",
        0b101,
    );

    let states: Vec<_> = session.registry().states().collect();
    assert_eq!(
        states,
        [
            EncounterState::Done,
            EncounterState::NotStarted,
            EncounterState::Special
        ]
    );
    assert_eq!(session.completed_mask(), 0b101);
    assert!(session.drain_signals().is_empty());

    assert!(session.set_encounter_state(1, EncounterState::InProgress));
}

#[test]
fn records_missing_from_save_stay_pending() {
    let mut session = InstanceSession::restored(
        7,
        &make_definition(),
        RecordingTransport::default(),
        base_time(),
        "3",
        0,
    );

    assert_eq!(session.registry().state(1), Some(EncounterState::Pending));
    assert!(!session.set_encounter_state(1, EncounterState::InProgress));
    assert!(session.drain_signals().is_empty());
    assert!(session.set_encounter_state(1, EncounterState::Done));
}

#[test]
fn dropped_queue_does_not_block_transitions() {
    let (queue, rx) = SaveQueue::channel();
    drop(rx);
    let mut session = make_session(&[]).with_save_queue(queue);

    assert!(session.set_encounter_state(0, EncounterState::InProgress));
    assert_eq!(session.last_save(), "1 0 0");
}

// ─────────────────────────────────────────────────────────────────────────────
// Dungeon Credit and Wipes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn final_credit_completes_dungeon() {
    let mut session = make_session(&[]);

    assert!(!session.credit_encounter(EncounterCreditKind::CastSpell, 7001));
    let signals = session.process_event(event(
        0,
        WorldEventKind::EncounterCredit {
            kind: EncounterCreditKind::KillCreature,
            entry: 7001,
        },
    ));

    assert!(matches!(
        signals.as_slice(),
        [
            InstanceSignal::EncounterCredited { encounter: 2, .. },
            InstanceSignal::DungeonCompleted { dungeon_id: 55, .. }
        ]
    ));
    assert_eq!(session.completed_mask(), 0b100);
}

#[test]
fn wipe_requires_no_living_player() {
    let mut session = make_session(&[]);
    assert!(session.is_wipe());

    session.transport_mut().present = vec![Participant {
        handle: 1,
        alive: true,
        game_master: true,
    }];
    assert!(session.is_wipe());

    session.transport_mut().present.push(Participant::new(2));
    assert!(!session.is_wipe());
}

// ─────────────────────────────────────────────────────────────────────────────
// Event Routing
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct CountingHandler {
    transitions: usize,
    gates: usize,
}

impl InstanceSignalHandler for CountingHandler {
    fn handle_signal(&mut self, signal: &InstanceSignal, registry: &EncounterRegistry) {
        match signal {
            InstanceSignal::EncounterStateChanged { encounter, new_state, .. } => {
                assert_eq!(registry.state(*encounter), Some(*new_state));
                self.transitions += 1;
            }
            InstanceSignal::GateStateChanged { .. } => self.gates += 1,
            _ => {}
        }
    }
}

#[test]
fn boss_events_map_to_transitions() {
    let mut session = make_session(&[]);
    spawn_gate(&mut session, 1, 10);

    session.process_event(event(0, WorldEventKind::BossEngaged(0)));
    assert_eq!(session.registry().state(0), Some(EncounterState::InProgress));
    session.process_event(event(10, WorldEventKind::BossReset(0)));
    assert_eq!(session.registry().state(0), Some(EncounterState::NotStarted));
    session.process_event(event(20, WorldEventKind::BossDefeated(0)));
    assert_eq!(session.registry().state(0), Some(EncounterState::Done));
    assert!(!session.registry().is_encounter_in_progress());
}

#[test]
fn handler_sees_pending_signals_once() {
    let mut session = make_session(&[]);
    spawn_gate(&mut session, 1, 10);
    session.set_encounter_state(0, EncounterState::InProgress);

    let mut handler = CountingHandler::default();
    session.dispatch_signals(&mut handler);
    session.dispatch_signals(&mut handler);

    assert_eq!(handler.transitions, 1);
    // Initial application on spawn, then closed on pull
    assert_eq!(handler.gates, 2);
}
