use chrono::offset;
use sanctum_core::broadcast::{Participant, PlayerHandle};
use sanctum_core::encounter::EncounterRegistry;
use sanctum_core::gates::GateObject;
use sanctum_core::instance::{InstanceSignal, InstanceSignalHandler, WorldEvent, WorldEventKind};
use sanctum_core::minions::{MinionObject, MinionStatus};
use sanctum_types::{EncounterCreditKind, Position};
use std::io::Write;

use crate::CliContext;

/// Prints signals as they leave the session.
struct SignalPrinter;

impl InstanceSignalHandler for SignalPrinter {
    fn handle_signal(&mut self, signal: &InstanceSignal, _registry: &EncounterRegistry) {
        match signal {
            InstanceSignal::EncounterStateChanged {
                encounter,
                old_state,
                new_state,
                ..
            } => println!("  encounter {encounter}: {old_state} -> {new_state}"),
            InstanceSignal::GateStateChanged { gate_id, open } => {
                let label = if *open { "open" } else { "closed" };
                println!("  gate {gate_id}: {label}");
            }
            InstanceSignal::MinionStateChanged { minion_id, state } => {
                println!("  minion {minion_id}: {state}")
            }
            InstanceSignal::MinionCommanded { minion_id, command } => {
                println!("  minion {minion_id}: {command:?}")
            }
            InstanceSignal::ScenarioStepAdvanced {
                scenario_id, step, ..
            } => println!("  scenario {scenario_id}: step {step}"),
            InstanceSignal::EncounterCredited { encounter, .. } => {
                println!("  encounter {encounter}: credited")
            }
            InstanceSignal::DungeonCompleted { dungeon_id, .. } => {
                println!("  dungeon {dungeon_id}: completed")
            }
        }
    }
}

/// Feed one world event into the session, stamped with the wall clock.
pub async fn world_event(ctx: &CliContext, kind: WorldEventKind) {
    let handle = ctx.session();
    let mut session = handle.write().await;

    let event = WorldEvent::new(offset::Local::now().naive_local(), kind);
    let signals = session.process_event(event);
    SignalPrinter.handle_signals(&signals, session.registry());
}

pub async fn spawn_gate(ctx: &CliContext, id: u64, entry: u32, x: f32, y: f32) {
    let gate = GateObject {
        id,
        entry,
        position: Position::new(x, y),
    };
    world_event(ctx, WorldEventKind::GateSpawned(gate)).await;

    let handle = ctx.session();
    let session = handle.read().await;
    match session.gate_openness(id) {
        Some(open) => println!("gate {id} linked ({})", if open { "open" } else { "closed" }),
        None => println!("gate {id}: unknown template {entry}"),
    }
}

pub async fn spawn_minion(ctx: &CliContext, id: u64, entry: u32, status: MinionStatus) {
    world_event(ctx, WorldEventKind::MinionSpawned(MinionObject { id, entry, status })).await;

    let handle = ctx.session();
    let session = handle.read().await;
    if session.minions().status(id).is_none() {
        println!("minion {id}: unknown template {entry}");
    }
}

pub async fn credit_encounter(ctx: &CliContext, entry: u32, spell: bool) {
    let kind = if spell {
        EncounterCreditKind::CastSpell
    } else {
        EncounterCreditKind::KillCreature
    };
    world_event(ctx, WorldEventKind::EncounterCredit { kind, entry }).await;
}

pub async fn join(ctx: &CliContext, player: PlayerHandle, game_master: bool) {
    {
        let handle = ctx.session();
        let mut session = handle.write().await;
        session.transport_mut().join(Participant {
            handle: player,
            alive: true,
            game_master,
        });
    }
    world_event(ctx, WorldEventKind::PlayerEntered(player)).await;
}

pub async fn leave(ctx: &CliContext, player: PlayerHandle) {
    let handle = ctx.session();
    let mut session = handle.write().await;
    if !session.transport_mut().leave(player) {
        println!("player {player} is not in the instance");
        return;
    }
    if session.is_wipe() {
        println!("no living players left");
    }
}

pub async fn set_player_alive(ctx: &CliContext, player: PlayerHandle, alive: bool) {
    let handle = ctx.session();
    let mut session = handle.write().await;
    if !session.transport_mut().set_alive(player, alive) {
        println!("player {player} is not in the instance");
        return;
    }
    if session.is_wipe() {
        println!("wipe");
    }
}

pub async fn show_status(ctx: &CliContext) {
    let handle = ctx.session();
    let session = handle.read().await;

    println!(
        "{} (instance {}, map {})",
        session.name(),
        session.instance_id(),
        session.map_id()
    );
    println!("{:<4} {:<30} State", "#", "Encounter");
    println!("{}", "-".repeat(50));
    for (idx, state) in session.registry().states().enumerate() {
        let name = session.encounter_name(idx).unwrap_or("?");
        println!("{idx:<4} {name:<30} {state}");
    }

    println!("\ncompleted mask: {:#b}", session.completed_mask());
    println!("live gates: {}", session.gates().live_count());
    println!(
        "players: {} ({} deliveries)",
        session.transport().players().len(),
        session.transport().deliveries()
    );
    println!("elapsed: {}ms", session.elapsed_ms());

    if let Some(scenario) = session.scenario() {
        println!(
            "scenario {}: step {}/{}{}",
            scenario.scenario_id(),
            scenario.current_step(),
            scenario.max_step(),
            if scenario.is_finished() { " (finished)" } else { "" }
        );
        for criteria in scenario.current_criteria() {
            println!(
                "  criteria {}: {}/{}",
                criteria.criteria_id, criteria.current, criteria.target
            );
        }
    }
}

pub async fn save(ctx: &CliContext) {
    let handle = ctx.session();
    let mut session = handle.write().await;
    if session.save() {
        println!("queued save: {}", session.last_save());
    } else {
        println!("nothing to save");
    }
}

pub async fn show_config(ctx: &CliContext) {
    let config = ctx.config.read().await;
    println!("data directory: {}", config.data_directory);
    println!("definitions directory: {}", config.definitions_directory);
    println!("scenarios enabled: {}", config.scenarios_enabled);
    println!("debug logging: {}", config.debug_logging);
}

pub fn exit() {
    if let Err(e) = writeln!(std::io::stdout(), "quitting...") {
        tracing::warn!(error = %e, "Failed to write to stdout");
    }
}
