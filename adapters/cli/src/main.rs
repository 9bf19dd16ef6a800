#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line driver for the Rampart simulation engine.
//!
//! Runs a scripted co-op game at full speed: players join, pick governors,
//! build a modest arrow line, and the loop ticks until the requested wave
//! count is cleared or the shared life pool runs dry. Intended for soak
//! testing the engine and for eyeballing event output without a host.

use std::fs::File;
use std::io::BufWriter;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;

use rampart_core::{CellCoord, Event, GameSettings, Governor, Phase, PlayerId, Rejection, TowerKind};
use rampart_world::game_loop::GameLoop;
use rampart_world::snapshot::{game_state_from_snapshot, serialize};
use rampart_world::GameState;

/// Governor rotation for scripted players, one element per seat.
const GOVERNORS: [Governor; 4] = [Governor::Pyro, Governor::Cryo, Governor::Storm, Governor::Umbra];

/// Seconds between wave completion and the automatic next start.
const AUTO_START_SECONDS: f64 = 1.0;

/// Headless soak-test driver for the Rampart engine.
#[derive(Debug, Parser)]
#[command(name = "rampart", about = "Headless Rampart simulation driver")]
struct Args {
    /// Number of waves to clear before declaring the run finished.
    #[arg(long, default_value_t = 10)]
    waves: u32,

    /// Number of scripted players seated in the lobby.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=4))]
    players: u8,

    /// Fixed simulation timestep in seconds.
    #[arg(long, default_value_t = 0.25)]
    tick: f64,

    /// Keep playing past the target wave instead of declaring victory.
    #[arg(long)]
    endless: bool,

    /// Size of the shared life pool.
    #[arg(long, default_value_t = 50)]
    lives: i32,

    /// Round-trip a snapshot after every wave and fail on any drift.
    #[arg(long)]
    verify_snapshots: bool,

    /// Write the final state as a snapshot JSON file.
    #[arg(long)]
    snapshot_out: Option<std::path::PathBuf>,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    if !(args.tick > 0.0) {
        bail!("tick must be positive, got {}", args.tick);
    }
    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let settings = GameSettings {
        victory_wave: args.waves,
        endless: args.endless,
        starting_lives: args.lives,
        auto_start_seconds: AUTO_START_SECONDS,
        ..GameSettings::default()
    };
    let mut state = GameState::with_settings(settings);
    let mut seats: Vec<PlayerId> = Vec::new();
    for index in 0..args.players {
        let id = state
            .add_player(&format!("player-{}", index + 1))
            .map_err(|rejection| anyhow::anyhow!("seat {index}: {rejection}"))?;
        state
            .select_governor(id, GOVERNORS[usize::from(index)])
            .map_err(|rejection| anyhow::anyhow!("governor: {rejection}"))?;
        state
            .set_player_ready(id, true)
            .map_err(|rejection| anyhow::anyhow!("ready: {rejection}"))?;
        seats.push(id);
    }
    state
        .start_game()
        .map_err(|rejection| anyhow::anyhow!("start: {rejection}"))?;
    for seat in &seats {
        invest(&mut state, *seat);
    }

    let mut game_loop = GameLoop::new();
    let mut cleared = 0;
    let max_ticks = ((f64::from(args.waves + 1) * 600.0) / args.tick) as u64;
    'run: for _ in 0..max_ticks {
        game_loop.tick(&mut state, args.tick);
        for event in game_loop.drain_events() {
            println!("[{:9.2}] {}", state.sim_time(), describe(&event));
            match event {
                Event::WaveCompleted { .. } => {
                    cleared += 1;
                    if args.verify_snapshots {
                        verify_snapshot(&state)?;
                    }
                    for seat in &seats {
                        invest(&mut state, *seat);
                    }
                    if cleared >= args.waves {
                        break 'run;
                    }
                }
                Event::GameOver { .. } => break 'run,
                _ => {}
            }
        }
    }

    println!();
    println!(
        "run finished: {} wave(s) cleared, {} live(s) left, phase {:?}",
        cleared,
        state.shared_lives(),
        state.phase()
    );
    for summary in state.summaries() {
        println!(
            "  {:>10}: {} kill(s), {} leak(s), {} gold",
            summary.name, summary.kills, summary.leaks, summary.money
        );
    }

    if let Some(path) = &args.snapshot_out {
        let file = File::create(path)
            .with_context(|| format!("creating snapshot file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &serialize(&state))
            .context("encoding snapshot")?;
        println!("snapshot written to {}", path.display());
    }

    if state.phase() == Phase::GameOver {
        bail!("defeat after {cleared} wave(s)");
    }
    Ok(())
}

/// Captures, rebuilds, and re-captures the state, failing on wire drift.
fn verify_snapshot(state: &GameState) -> Result<()> {
    let captured = serialize(state);
    let rebuilt = serialize(&game_state_from_snapshot(&captured));
    if rebuilt != captured {
        bail!("snapshot round trip diverged at wave {}", captured.wave_number);
    }
    debug!(wave = captured.wave_number, "snapshot round trip verified");
    Ok(())
}

/// Spends a seat's money on arrow towers along the lanes beside the path,
/// then on upgrades, until nothing more is affordable.
fn invest(state: &mut GameState, seat: PlayerId) {
    let candidates: Vec<CellCoord> = [7u32, 9, 6, 10]
        .iter()
        .flat_map(|row| (2u32..22).map(move |column| CellCoord::new(column, *row)))
        .collect();
    for cell in candidates {
        match state.place_tower(seat, TowerKind::Arrow, cell) {
            Ok(id) => debug!(player = seat.get(), tower = id.get(), "placed arrow"),
            Err(Rejection::InsufficientMoney { .. }) => break,
            Err(Rejection::InvalidCell { .. } | Rejection::PathBlocked { .. }) => continue,
            Err(rejection) => {
                debug!(player = seat.get(), %rejection, "placement stopped");
                break;
            }
        }
    }
    let owned: Vec<_> = state
        .towers()
        .iter()
        .filter(|tower| tower.owner() == seat)
        .map(|tower| tower.id())
        .collect();
    for tower in owned {
        match state.upgrade_tower(seat, tower) {
            Ok(()) => {}
            Err(Rejection::InsufficientMoney { .. }) => break,
            Err(_) => continue,
        }
    }
}

/// One human-readable line per engine event.
fn describe(event: &Event) -> String {
    match event {
        Event::PathChanged { version, waypoints } => {
            format!("path changed (v{version}, {} waypoint(s))", waypoints.len())
        }
        Event::WaveStarted {
            wave_number,
            name,
            enemy_total,
            mutators,
        } => {
            let title = name.as_deref().unwrap_or("wave");
            let tags: Vec<&str> = mutators.iter().map(|mutator| mutator.as_str()).collect();
            if tags.is_empty() {
                format!("wave {wave_number} started: {title}, {enemy_total} enemies")
            } else {
                format!(
                    "wave {wave_number} started: {title}, {enemy_total} enemies [{}]",
                    tags.join(", ")
                )
            }
        }
        Event::WaveCompleted {
            wave_number,
            income,
            interest,
            lumber_awarded,
        } => {
            let lumber = if *lumber_awarded { ", +1 lumber" } else { "" };
            format!("wave {wave_number} complete: +{income} income, +{interest} interest{lumber}")
        }
        Event::AbilityUsed { player, ability } => {
            format!("player {} used {:?}", player.get(), ability)
        }
        Event::GameOver { victory, .. } => {
            if *victory {
                "victory".to_owned()
            } else {
                "defeat, lives exhausted".to_owned()
            }
        }
        Event::GameReset => "game reset to lobby".to_owned(),
    }
}
