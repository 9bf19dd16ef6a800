//! Snapshot encode and decode for host migration.
//!
//! [`serialize`] is a pure function of simulation state; every
//! duration-like wire field is converted from an absolute deadline to
//! remaining seconds so the snapshot is meaningful on a peer with a
//! different clock origin. [`game_state_from_snapshot`] rebuilds an
//! equivalent state, replaying tower upgrades from the base tables instead
//! of trusting serialized stats, and skipping entities whose kind this
//! build does not know rather than failing the whole reconstruction.

use rampart_core::snapshot::{
    ChainState, EnemyState, FundingState, MapState, PayloadState, PlayerState, ProjectileState,
    Snapshot, SplashState, TechStackState, TimedEffectState, TowerState, WaveEntryState, WaveState,
};
use rampart_core::{
    ChainDef, EnemyKind, GameModifiers, Governor, Phase, PoisonDef, SplashDef, TechId,
    TimedMagnitude, TowerKind, Wave, WaveEntry, WaveMutator, POISON_TICK_SECONDS,
    RESET_GRACE_SECONDS, SNAPSHOT_VERSION,
};

use crate::enemy::TimedStatus;
use crate::grid::OccupancyGrid;
use crate::player::{DamageBuff, Player};
use crate::projectile::{DamagePayload, Projectile};
use crate::tower::TowerInstance;
use crate::{FundingRequest, GameState};

/// Captures the full game state as a wire snapshot.
#[must_use]
pub fn serialize(state: &GameState) -> Snapshot {
    let now = state.sim_time;
    Snapshot {
        snapshot_version: SNAPSHOT_VERSION,
        phase: state.phase,
        wave_number: state.wave_number,
        shared_lives: state.shared_lives,
        next_wave_countdown: state
            .next_wave_deadline
            .map(|deadline| (deadline - now).max(0.0)),
        manual_start_cooldown: (state.manual_start_ready_at - now).max(0.0),
        players: state.players.iter().map(|player| player_state(player, now)).collect(),
        towers: state.towers.iter().map(tower_state).collect(),
        enemies: state.enemies.iter().map(|enemy| enemy_state(enemy, now)).collect(),
        projectiles: state.projectiles.iter().map(projectile_state).collect(),
        current_wave: state
            .current_wave
            .as_ref()
            .map(|wave| wave_state(wave, state.spawn_timer)),
        settings: state.settings.clone(),
        map: MapState {
            width: state.grid.width(),
            height: state.grid.height(),
            path: state.grid.waypoints().to_vec(),
            path_version: state.grid.version(),
            path_cells: state.grid.path_cells().to_vec(),
            spawn: state.grid.spawn(),
            end: state.grid.end(),
            checkpoints: state.grid.checkpoints().to_vec(),
        },
        timestamp: (now * 1000.0).round() as u64,
        modifiers: if state.modifiers == GameModifiers::default() {
            None
        } else {
            Some(state.modifiers.clone())
        },
        funding: state.funding.iter().map(funding_state).collect(),
    }
}

/// Rebuilds an equivalent [`GameState`] from a snapshot.
#[must_use]
pub fn game_state_from_snapshot(snapshot: &Snapshot) -> GameState {
    let mut state = GameState::with_settings(snapshot.settings.clone());
    state.modifiers = snapshot.modifiers.clone().unwrap_or_default();
    let now = snapshot.timestamp as f64 / 1000.0;
    state.sim_time = now;
    state.phase = snapshot.phase;
    state.wave_number = snapshot.wave_number;
    state.shared_lives = snapshot.shared_lives;
    state.next_wave_deadline = snapshot
        .next_wave_countdown
        .map(|countdown| now + countdown);
    state.manual_start_ready_at = now + snapshot.manual_start_cooldown;
    if matches!(snapshot.phase, Phase::GameOver | Phase::Victory) {
        state.grace_deadline = Some(now + RESET_GRACE_SECONDS);
    }

    for entry in &snapshot.players {
        let player = restore_player(entry, now);
        state.next_player_id = state.next_player_id.max(player.id.get() + 1);
        state.players.push(player);
    }

    state.grid = OccupancyGrid::new(
        snapshot.map.width,
        snapshot.map.height,
        snapshot.map.spawn,
        snapshot.map.end,
        snapshot.map.checkpoints.clone(),
    );
    let mut blocked = Vec::new();
    for entry in &snapshot.towers {
        let Some(tower) = restore_tower(entry, &state) else {
            continue;
        };
        blocked.push(tower.cell);
        state.next_tower_id = state.next_tower_id.max(tower.id.get() + 1);
        state.towers.push(tower);
    }
    // One recompute for the whole layout, then pin the replicated version.
    state.grid.block_many(&blocked);
    state.grid.restore_version(snapshot.map.path_version);
    state.recompute_synergies();

    for entry in &snapshot.enemies {
        let Some(enemy) = restore_enemy(entry, now, snapshot.map.path_version) else {
            continue;
        };
        state.next_enemy_id = state.next_enemy_id.max(enemy.id.get() + 1);
        state.enemies.push(enemy);
    }

    for entry in &snapshot.projectiles {
        let projectile = restore_projectile(entry);
        state.next_projectile_id = state.next_projectile_id.max(projectile.id.get() + 1);
        state.projectiles.push(projectile);
    }

    if let Some(entry) = &snapshot.current_wave {
        let wave = restore_wave(entry);
        state.wave_base_total = wave.total_count();
        state.spawn_timer = entry.spawn_timer;
        state.current_wave = Some(wave);
    }

    for entry in &snapshot.funding {
        state.next_funding_id = state.next_funding_id.max(entry.id + 1);
        state.funding.push(FundingRequest {
            id: entry.id,
            requester: entry.requester,
            label: entry.label.clone(),
            goal: entry.goal,
            contributed: entry.contributed,
        });
    }

    state
}

fn player_state(player: &Player, now: f64) -> PlayerState {
    PlayerState {
        id: player.id,
        name: player.name.clone(),
        governor: player.governor.map(|governor| governor.as_str().to_owned()),
        ready: player.ready,
        money: player.money,
        lumber: player.lumber,
        tech: player
            .tech
            .iter()
            .map(|(tech, stacks)| TechStackState {
                id: tech.as_str().to_owned(),
                stacks: *stacks,
            })
            .collect(),
        ability_cooldown: (player.ability_ready_at - now).max(0.0),
        damage_buff: player.damage_buff.and_then(|buff| {
            let remaining = buff.expires_at - now;
            (remaining > 0.0).then_some(TimedEffectState {
                magnitude: buff.magnitude,
                remaining,
            })
        }),
        kills: player.kills,
        leaks: player.leaks,
    }
}

fn restore_player(entry: &PlayerState, now: f64) -> Player {
    let mut player = Player::new(entry.id, entry.name.clone(), entry.money);
    player.governor = entry.governor.as_deref().and_then(Governor::parse);
    player.ready = entry.ready;
    player.lumber = entry.lumber;
    for stack in &entry.tech {
        if let Some(tech) = TechId::parse(&stack.id) {
            let _ = player.tech.insert(tech, stack.stacks);
        }
    }
    player.ability_ready_at = now + entry.ability_cooldown;
    player.damage_buff = entry.damage_buff.map(|buff| DamageBuff {
        magnitude: buff.magnitude,
        expires_at: now + buff.remaining,
    });
    player.kills = entry.kills;
    player.leaks = entry.leaks;
    player.recalculate_bonuses();
    player
}

fn tower_state(tower: &TowerInstance) -> TowerState {
    TowerState {
        id: tower.id,
        owner: tower.owner,
        kind: tower.kind.as_str().to_owned(),
        cell: tower.cell,
        level: tower.level,
        targeting: tower.targeting,
        cooldown: tower.cooldown,
        queued_upgrade: tower.queued_upgrade,
    }
}

/// Rebuilds a tower by replaying upgrades from the base definition.
///
/// Returns `None` for unknown kinds and for owners this snapshot does not
/// carry, since the element is derived from the owner's governor.
fn restore_tower(entry: &TowerState, state: &GameState) -> Option<TowerInstance> {
    let kind = TowerKind::parse(&entry.kind)?;
    let governor = state.player(entry.owner).ok()?.governor?;
    let mut tower = TowerInstance::new(
        entry.id,
        entry.owner,
        kind,
        entry.cell,
        governor.def().element,
    );
    for _ in 1..entry.level {
        tower.upgrade();
    }
    tower.targeting = entry.targeting;
    tower.cooldown = entry.cooldown;
    tower.queued_upgrade = entry.queued_upgrade;
    Some(tower)
}

fn enemy_state(enemy: &crate::EnemyInstance, now: f64) -> EnemyState {
    EnemyState {
        id: enemy.id,
        kind: enemy.kind.as_str().to_owned(),
        health: enemy.health,
        max_health: enemy.max_health,
        position: enemy.position,
        path_index: enemy.path_index,
        speed: enemy.speed,
        armor: enemy.armor,
        magic_resist: enemy.magic_resist,
        bounty: enemy.bounty,
        regen: enemy.regen,
        slow: timed_state(&enemy.slow, now),
        poison: timed_state(&enemy.poison, now),
        stun_remaining: (enemy.stun_until - now).max(0.0),
        armor_debuff: timed_state(&enemy.armor_debuff, now),
    }
}

fn restore_enemy(entry: &EnemyState, now: f64, path_version: u64) -> Option<crate::EnemyInstance> {
    let kind = EnemyKind::parse(&entry.kind)?;
    Some(crate::EnemyInstance {
        id: entry.id,
        kind,
        health: entry.health,
        max_health: entry.max_health,
        position: entry.position,
        path_index: entry.path_index,
        // The grid is pinned to the same version, so the persisted index
        // stays valid; a snap only happens on a genuine later path change.
        path_version,
        speed: entry.speed,
        armor: entry.armor,
        magic_resist: entry.magic_resist,
        regen: entry.regen,
        bounty: entry.bounty,
        flying: kind.def().flying,
        slow: restore_timed(&entry.slow, now),
        poison: restore_timed(&entry.poison, now),
        stun_until: now + entry.stun_remaining,
        armor_debuff: restore_timed(&entry.armor_debuff, now),
        next_poison_tick: now + POISON_TICK_SECONDS,
        last_hit_by: None,
    })
}

fn projectile_state(projectile: &Projectile) -> ProjectileState {
    let payload = &projectile.payload;
    ProjectileState {
        id: projectile.id,
        owner: projectile.owner,
        target: projectile.target,
        position: projectile.position,
        target_point: projectile.target_point,
        speed: projectile.speed,
        payload: PayloadState {
            amount: payload.amount,
            kind: payload.kind,
            splash: payload.splash.map(|splash| SplashState {
                radius: splash.radius,
                factor: splash.factor,
            }),
            chain: payload.chain.map(|chain| ChainState {
                jumps: chain.jumps,
                decay: chain.decay,
                radius: chain.radius,
            }),
            slow: payload.slow.map(|slow| TimedEffectState {
                magnitude: slow.magnitude,
                remaining: slow.duration,
            }),
            poison: payload.poison.map(|poison| TimedEffectState {
                magnitude: poison.dps,
                remaining: poison.duration,
            }),
            stun: payload.stun,
            armor_debuff: payload.armor_debuff.map(|debuff| TimedEffectState {
                magnitude: debuff.magnitude,
                remaining: debuff.duration,
            }),
            execute_threshold: payload.execute_threshold,
            teleport_back: payload.teleport_back,
        },
    }
}

fn restore_projectile(entry: &ProjectileState) -> Projectile {
    let payload = &entry.payload;
    Projectile {
        id: entry.id,
        owner: entry.owner,
        target: entry.target,
        position: entry.position,
        target_point: entry.target_point,
        speed: entry.speed,
        payload: DamagePayload {
            amount: payload.amount,
            kind: payload.kind,
            splash: payload.splash.map(|splash| SplashDef {
                radius: splash.radius,
                factor: splash.factor,
            }),
            chain: payload.chain.map(|chain| ChainDef {
                jumps: chain.jumps,
                decay: chain.decay,
                radius: chain.radius,
            }),
            slow: payload.slow.map(|slow| TimedMagnitude {
                magnitude: slow.magnitude,
                duration: slow.remaining,
            }),
            poison: payload.poison.map(|poison| PoisonDef {
                dps: poison.magnitude,
                duration: poison.remaining,
            }),
            stun: payload.stun,
            armor_debuff: payload.armor_debuff.map(|debuff| TimedMagnitude {
                magnitude: debuff.magnitude,
                duration: debuff.remaining,
            }),
            execute_threshold: payload.execute_threshold,
            teleport_back: payload.teleport_back,
        },
    }
}

fn wave_state(wave: &Wave, spawn_timer: f64) -> WaveState {
    WaveState {
        number: wave.number,
        name: wave.name.clone(),
        tags: wave.tags.clone(),
        mutators: wave
            .mutators
            .iter()
            .map(|mutator| mutator.as_str().to_owned())
            .collect(),
        entries: wave
            .entries
            .iter()
            .map(|entry| WaveEntryState {
                kind: entry.kind.as_str().to_owned(),
                count: entry.count,
            })
            .collect(),
        health_multiplier: wave.health_multiplier,
        speed_multiplier: wave.speed_multiplier,
        bounty_multiplier: wave.bounty_multiplier,
        regen_bonus: wave.regen_bonus,
        armor_bonus: wave.armor_bonus,
        resist_bonus: wave.resist_bonus,
        spawn_interval: wave.spawn_interval,
        spawn_index: wave.spawn_index,
        spawn_timer,
        completed: wave.completed,
    }
}

fn restore_wave(entry: &WaveState) -> Wave {
    Wave {
        number: entry.number,
        name: entry.name.clone(),
        tags: entry.tags.clone(),
        mutators: entry
            .mutators
            .iter()
            .filter_map(|mutator| WaveMutator::parse(mutator))
            .collect(),
        entries: entry
            .entries
            .iter()
            .filter_map(|wire| {
                EnemyKind::parse(&wire.kind).map(|kind| WaveEntry {
                    kind,
                    count: wire.count,
                })
            })
            .collect(),
        health_multiplier: entry.health_multiplier,
        speed_multiplier: entry.speed_multiplier,
        bounty_multiplier: entry.bounty_multiplier,
        regen_bonus: entry.regen_bonus,
        armor_bonus: entry.armor_bonus,
        resist_bonus: entry.resist_bonus,
        spawn_interval: entry.spawn_interval,
        spawn_index: entry.spawn_index,
        completed: entry.completed,
    }
}

fn funding_state(request: &FundingRequest) -> FundingState {
    FundingState {
        id: request.id,
        requester: request.requester,
        label: request.label.clone(),
        goal: request.goal,
        contributed: request.contributed,
    }
}

fn timed_state(slot: &Option<TimedStatus>, now: f64) -> Option<TimedEffectState> {
    slot.and_then(|status| {
        let remaining = status.expires_at - now;
        (remaining > 0.0).then_some(TimedEffectState {
            magnitude: status.magnitude,
            remaining,
        })
    })
}

fn restore_timed(entry: &Option<TimedEffectState>, now: f64) -> Option<TimedStatus> {
    entry.map(|status| TimedStatus {
        magnitude: status.magnitude,
        expires_at: now + status.remaining,
    })
}
