use clap::{Parser, Subcommand};
use sanctum_cli::commands;
use sanctum_cli::context::SessionOptions;
use sanctum_cli::logging;
use sanctum_cli::readline;
use sanctum_cli::CliContext;
use sanctum_core::context::{AppConfig, AppConfigExt};
use sanctum_core::instance::WorldEventKind;
use sanctum_core::minions::MinionStatus;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(version, about = "Drive an instance session from typed world events")]
struct Args {
    /// Instance definition file
    #[arg(short, long)]
    definition: Option<PathBuf>,

    /// Map id to look up in the definitions directory
    #[arg(short, long)]
    map: Option<u32>,

    #[arg(short, long, default_value_t = 1)]
    instance_id: u32,

    /// Run the commands in this file instead of reading stdin
    #[arg(short, long)]
    script: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();
    let (config, config_error) = AppConfig::load_or_defaults();
    let _log_guard = logging::init(config.debug_logging);
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "Using default configuration");
    }

    let options = SessionOptions {
        definition: args.definition,
        map_id: args.map,
        instance_id: args.instance_id,
    };
    let ctx = CliContext::start(config, &options).await?;

    match &args.script {
        Some(path) => run_script(path, &ctx).await?,
        None => run_repl(&ctx).await?,
    }

    if let Some(stats) = ctx.shutdown().await {
        tracing::info!(written = stats.written, failed = stats.failed, "Saves flushed");
    }
    Ok(())
}

async fn run_repl(ctx: &CliContext) -> Result<(), String> {
    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, ctx).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                write!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }
    Ok(())
}

async fn run_script(path: &Path, ctx: &CliContext) -> Result<(), String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        println!("$ {line}");
        match respond(line, ctx).await {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => return Err(format!("line {}: {err}", number + 1)),
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(version, about = "sanctum")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    SpawnGate {
        id: u64,
        entry: u32,
        #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
        x: f32,
        #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
        y: f32,
    },
    DespawnGate {
        id: u64,
        entry: u32,
    },
    SpawnMinion {
        id: u64,
        entry: u32,
        #[arg(long)]
        world_shared: bool,
        #[arg(long)]
        dead: bool,
    },
    DespawnMinion {
        id: u64,
        entry: u32,
    },
    MinionStatus {
        id: u64,
        #[arg(long)]
        dead: bool,
        #[arg(long)]
        in_combat: bool,
        #[arg(long)]
        has_target: bool,
        #[arg(long)]
        world_shared: bool,
    },
    Engage {
        encounter: usize,
    },
    Defeat {
        encounter: usize,
    },
    Reset {
        encounter: usize,
    },
    /// Credit a scenario criteria
    Credit {
        criteria: u32,
        #[arg(default_value_t = 1)]
        amount: u32,
    },
    /// Match an event against the dungeon credit list
    EncounterCredit {
        entry: u32,
        #[arg(long)]
        spell: bool,
    },
    Join {
        player: u64,
        #[arg(long)]
        gm: bool,
    },
    Leave {
        player: u64,
    },
    Die {
        player: u64,
    },
    Revive {
        player: u64,
    },
    Tick {
        ms: u64,
    },
    Status,
    Save,
    Config,
    Exit,
}

async fn respond(line: &str, ctx: &CliContext) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "sanctum".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match cli.command {
        Some(Commands::SpawnGate { id, entry, x, y }) => {
            commands::spawn_gate(ctx, id, entry, x, y).await
        }
        Some(Commands::DespawnGate { id, entry }) => {
            commands::world_event(ctx, WorldEventKind::GateDespawned { id, entry }).await
        }
        Some(Commands::SpawnMinion {
            id,
            entry,
            world_shared,
            dead,
        }) => {
            let status = MinionStatus {
                alive: !dead,
                world_shared,
                ..MinionStatus::default()
            };
            commands::spawn_minion(ctx, id, entry, status).await
        }
        Some(Commands::DespawnMinion { id, entry }) => {
            commands::world_event(ctx, WorldEventKind::MinionDespawned { id, entry }).await
        }
        Some(Commands::MinionStatus {
            id,
            dead,
            in_combat,
            has_target,
            world_shared,
        }) => {
            let status = MinionStatus {
                alive: !dead,
                in_combat,
                has_target,
                world_shared,
            };
            commands::world_event(ctx, WorldEventKind::MinionStatusChanged { id, status }).await
        }
        Some(Commands::Engage { encounter }) => {
            commands::world_event(ctx, WorldEventKind::BossEngaged(encounter)).await
        }
        Some(Commands::Defeat { encounter }) => {
            commands::world_event(ctx, WorldEventKind::BossDefeated(encounter)).await
        }
        Some(Commands::Reset { encounter }) => {
            commands::world_event(ctx, WorldEventKind::BossReset(encounter)).await
        }
        Some(Commands::Credit { criteria, amount }) => {
            let kind = WorldEventKind::CriteriaCredited {
                criteria_id: criteria,
                amount,
            };
            commands::world_event(ctx, kind).await
        }
        Some(Commands::EncounterCredit { entry, spell }) => {
            commands::credit_encounter(ctx, entry, spell).await
        }
        Some(Commands::Join { player, gm }) => commands::join(ctx, player, gm).await,
        Some(Commands::Leave { player }) => commands::leave(ctx, player).await,
        Some(Commands::Die { player }) => commands::set_player_alive(ctx, player, false).await,
        Some(Commands::Revive { player }) => commands::set_player_alive(ctx, player, true).await,
        Some(Commands::Tick { ms }) => {
            commands::world_event(ctx, WorldEventKind::Tick { diff_ms: ms }).await
        }
        Some(Commands::Status) => commands::show_status(ctx).await,
        Some(Commands::Save) => commands::save(ctx).await,
        Some(Commands::Config) => commands::show_config(ctx).await,
        Some(Commands::Exit) => {
            commands::exit();
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
