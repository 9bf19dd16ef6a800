//! Fixed-order tick resolver.
//!
//! Each phase fully flushes before the next begins, so within one tick the
//! outcome is independent of wall-clock jitter. Entity deaths discovered
//! mid-phase are collected and processed after the iteration that found
//! them, never by mutating the collection being walked.

use std::collections::VecDeque;
use std::mem;

use rampart_core::{
    calculate_interest, should_award_lumber, AbilityEffect, DamageKind, EnemyId, EnemyKind, Event,
    Phase, PlayerId, Position, AURA_CAP, INTEREST_RATE, RESET_GRACE_SECONDS,
};
use rampart_system_wave_generation as wavegen;
use tracing::info;

use crate::enemy::EnemyInstance;
use crate::player::DamageBuff;
use crate::projectile::{travel_speed, DamagePayload, Projectile};
use crate::GameState;

/// Per-wave income base before difficulty scaling.
const WAVE_INCOME_BASE: u32 = 20;
/// Per-wave income growth per wave number.
const WAVE_INCOME_STEP: u32 = 4;

/// Drives [`GameState`] forward and buffers the events each tick produces.
#[derive(Debug, Default)]
pub struct GameLoop {
    events: VecDeque<Event>,
    last_path_version: u64,
}

/// One projectile arrival waiting to be applied.
struct Impact {
    owner: PlayerId,
    target: EnemyId,
    point: Position,
    payload: DamagePayload,
    target_alive: bool,
}

impl GameLoop {
    /// Creates a loop with an empty event queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every event buffered since the last drain.
    ///
    /// Draining never touches simulation state and may happen at any
    /// cadence.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    /// Advances the simulation by `delta` seconds.
    pub fn tick(&mut self, state: &mut GameState, delta: f64) {
        state.sim_time += delta;
        let now = state.sim_time;
        self.events.extend(state.pending_events.drain(..));

        self.emit_path_change(state);
        self.auto_start_wave(state, now);
        self.spawn_enemies(state, delta);
        recompute_auras(state);
        self.resolve_abilities(state, now);
        expire_buffs(state, now);
        self.update_enemies(state, delta, now);
        fire_towers(state, delta, now);
        self.advance_projectiles(state, delta, now);
        self.complete_wave(state, now);
        self.check_end(state, now);

        self.events.extend(state.pending_events.drain(..));
    }

    fn emit_path_change(&mut self, state: &GameState) {
        if state.grid.version() != self.last_path_version {
            self.last_path_version = state.grid.version();
            self.events.push_back(Event::PathChanged {
                version: state.grid.version(),
                waypoints: state.grid.waypoints().to_vec(),
            });
        }
    }

    fn auto_start_wave(&mut self, state: &mut GameState, now: f64) {
        if !matches!(state.phase, Phase::Playing | Phase::WaveComplete) {
            return;
        }
        let due = state
            .next_wave_deadline
            .map_or(false, |deadline| now >= deadline);
        if due {
            self.begin_wave(state);
        }
    }

    fn begin_wave(&mut self, state: &mut GameState) {
        state.wave_number += 1;
        let wave = wavegen::generate(
            state.wave_number,
            state.players.len() as u32,
            state.modifiers.forced_mutators.as_deref(),
        );
        state.wave_base_total = wave.total_count();
        state.spawn_timer = 0.0;
        state.phase = Phase::WaveActive;
        state.next_wave_deadline = None;
        info!(
            wave = wave.number,
            enemies = wave.total_count(),
            mutators = wave.mutators.len(),
            "wave started"
        );
        self.events.push_back(Event::WaveStarted {
            wave_number: wave.number,
            name: wave.name.clone(),
            enemy_total: wave.total_count(),
            mutators: wave.mutators.clone(),
        });
        state.current_wave = Some(wave);
    }

    fn spawn_enemies(&mut self, state: &mut GameState, delta: f64) {
        if state.phase != Phase::WaveActive {
            return;
        }
        if state
            .current_wave
            .as_ref()
            .map_or(true, |wave| wave.completed)
        {
            return;
        }
        state.spawn_timer -= delta;
        while state.spawn_timer <= 0.0 {
            let spawned = {
                let Some(wave) = state.current_wave.as_mut() else {
                    return;
                };
                if wave.completed {
                    break;
                }
                let Some(kind) = wave.kind_at(wave.spawn_index) else {
                    wave.completed = true;
                    break;
                };
                let spawn_index = wave.spawn_index;
                wave.spawn_index += 1;
                if wave.spawn_index >= wave.total_count() {
                    wave.completed = true;
                }
                SpawnParams {
                    kind,
                    spawn_index,
                    health_multiplier: wave.health_multiplier,
                    speed_multiplier: wave.speed_multiplier,
                    bounty_multiplier: wave.bounty_multiplier,
                    armor_bonus: wave.armor_bonus,
                    resist_bonus: wave.resist_bonus,
                    interval: wave.spawn_interval,
                }
            };
            spawn_enemy(state, &spawned);
            state.spawn_timer += spawned.interval;
        }
    }

    fn resolve_abilities(&mut self, state: &mut GameState, now: f64) {
        let queued = mem::take(&mut state.queued_abilities);
        for activation in queued {
            let player = activation.player;
            match activation.ability.def().effect {
                AbilityEffect::PointDamage { damage, radius } => {
                    let Some(target) = activation.target else {
                        continue;
                    };
                    for enemy in &mut state.enemies {
                        if !enemy.is_dead() && enemy.position.distance(target) <= radius {
                            enemy.last_hit_by = Some(player);
                            enemy.take_hit(damage, DamageKind::Magic, now);
                        }
                    }
                }
                AbilityEffect::PointFreeze {
                    radius,
                    slow,
                    slow_duration,
                    stun,
                } => {
                    let Some(target) = activation.target else {
                        continue;
                    };
                    for enemy in &mut state.enemies {
                        if !enemy.is_dead() && enemy.position.distance(target) <= radius {
                            enemy.apply_slow(slow, slow_duration, now);
                            enemy.apply_stun(stun, now);
                        }
                    }
                }
                AbilityEffect::GlobalNuke { damage, targets } => {
                    let mut order: Vec<usize> = (0..state.enemies.len())
                        .filter(|index| !state.enemies[*index].is_dead())
                        .collect();
                    order.sort_by(|a, b| {
                        state.enemies[*b]
                            .health
                            .partial_cmp(&state.enemies[*a].health)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                    for index in order.into_iter().take(targets as usize) {
                        let enemy = &mut state.enemies[index];
                        enemy.last_hit_by = Some(player);
                        enemy.take_hit(damage, DamageKind::Magic, now);
                    }
                }
                AbilityEffect::GlobalExecute { threshold } => {
                    for enemy in &mut state.enemies {
                        if !enemy.is_dead() && enemy.health <= enemy.max_health * threshold {
                            enemy.last_hit_by = Some(player);
                            enemy.health = 0.0;
                        }
                    }
                }
                AbilityEffect::GlobalStun { duration } => {
                    for enemy in &mut state.enemies {
                        enemy.apply_stun(duration, now);
                    }
                }
                AbilityEffect::Rally {
                    lives,
                    damage_mult,
                    duration,
                } => {
                    state.shared_lives += lives;
                    for entry in &mut state.players {
                        entry.damage_buff = Some(DamageBuff {
                            magnitude: damage_mult,
                            expires_at: now + duration,
                        });
                    }
                }
            }
            self.events.push_back(Event::AbilityUsed {
                player,
                ability: activation.ability,
            });
        }
    }

    fn update_enemies(&mut self, state: &mut GameState, delta: f64, now: f64) {
        // Deaths from the ability phase come out first.
        process_deaths(state);

        let wave_regen = state
            .current_wave
            .as_ref()
            .map_or(0.0, |wave| wave.regen_bonus);
        let ground = waypoint_positions(state.grid.waypoints());
        let flight: Vec<Position> = state
            .grid
            .flight_waypoints()
            .iter()
            .map(|cell| cell.center())
            .collect();
        let version = state.grid.version();

        let mut leaked: Vec<EnemyId> = Vec::new();
        for enemy in &mut state.enemies {
            enemy.expire_statuses(now);
            enemy.poison_tick(now);
            if enemy.is_dead() {
                continue;
            }
            enemy.regenerate(delta, wave_regen);
            let path: &[Position] = if enemy.flying { &flight } else { &ground };
            if !enemy.flying && enemy.path_version != version {
                enemy.path_index = nearest_waypoint(path, enemy.position);
                enemy.path_version = version;
            }
            if enemy.is_stunned(now) {
                continue;
            }
            let mut budget = enemy.current_speed(now) * delta;
            while budget > 0.0 && enemy.path_index < path.len() {
                let target = path[enemy.path_index];
                let distance = enemy.position.distance(target);
                if distance <= budget {
                    enemy.position = target;
                    enemy.path_index += 1;
                    budget -= distance;
                } else {
                    let fraction = budget / distance;
                    enemy.position = Position::new(
                        enemy.position.x + (target.x - enemy.position.x) * fraction,
                        enemy.position.y + (target.y - enemy.position.y) * fraction,
                    );
                    budget = 0.0;
                }
            }
            if enemy.path_index >= path.len() {
                leaked.push(enemy.id);
            }
        }

        for id in &leaked {
            let Some(index) = state.enemies.iter().position(|enemy| enemy.id == *id) else {
                continue;
            };
            let escaped = state.enemies.remove(index);
            state.shared_lives -= escaped.kind.def().lives_cost as i32;
            for player in &mut state.players {
                player.leaks += 1;
            }
        }

        // Poison may have finished someone off during this pass.
        process_deaths(state);
    }

    fn advance_projectiles(&mut self, state: &mut GameState, delta: f64, now: f64) {
        let mut impacts: Vec<Impact> = Vec::new();
        let enemies = &state.enemies;
        state.projectiles.retain_mut(|projectile| {
            let mut alive = false;
            if let Some(enemy) = enemies
                .iter()
                .find(|enemy| enemy.id == projectile.target && !enemy.is_dead())
            {
                projectile.target_point = enemy.position;
                alive = true;
            }
            let distance = projectile.position.distance(projectile.target_point);
            let step = projectile.speed * delta;
            if distance <= step {
                impacts.push(Impact {
                    owner: projectile.owner,
                    target: projectile.target,
                    point: projectile.target_point,
                    payload: projectile.payload,
                    target_alive: alive,
                });
                return false;
            }
            let fraction = step / distance;
            projectile.position = Position::new(
                projectile.position.x + (projectile.target_point.x - projectile.position.x) * fraction,
                projectile.position.y + (projectile.target_point.y - projectile.position.y) * fraction,
            );
            true
        });

        if impacts.is_empty() {
            return;
        }
        let ground = waypoint_positions(state.grid.waypoints());
        let flight: Vec<Position> = state
            .grid
            .flight_waypoints()
            .iter()
            .map(|cell| cell.center())
            .collect();
        for impact in impacts {
            apply_impact(state, &impact, &ground, &flight, now);
        }
        process_deaths(state);
    }

    fn complete_wave(&mut self, state: &mut GameState, now: f64) {
        if state.phase != Phase::WaveActive {
            return;
        }
        let finished = state
            .current_wave
            .as_ref()
            .map_or(false, |wave| wave.completed)
            && state.enemies.is_empty()
            && state.projectiles.is_empty();
        if !finished {
            return;
        }
        let wave_number = state.wave_number;
        let pot = (f64::from(WAVE_INCOME_BASE + WAVE_INCOME_STEP * wave_number)
            * wavegen::difficulty_multiplier(wave_number)
            * state.modifiers.income)
            .floor() as u32;
        let share = if state.settings.money_sharing || state.players.is_empty() {
            pot
        } else {
            pot / state.players.len() as u32
        };
        let lumber = should_award_lumber(wave_number);
        let mut total_interest = 0;
        for player in &mut state.players {
            player.money += share;
            let rate = INTEREST_RATE * player.bonuses.interest;
            let interest = calculate_interest(player.money, rate, wave_number);
            player.money += interest;
            total_interest += interest;
            if lumber {
                player.lumber += 1;
            }
        }

        apply_queued_upgrades(state);

        state.phase = Phase::WaveComplete;
        state.current_wave = None;
        state.next_wave_deadline = Some(now + state.settings.auto_start_seconds);
        info!(wave = wave_number, income = pot, interest = total_interest, "wave completed");
        self.events.push_back(Event::WaveCompleted {
            wave_number,
            income: pot,
            interest: total_interest,
            lumber_awarded: lumber,
        });
    }

    fn check_end(&mut self, state: &mut GameState, now: f64) {
        match state.phase {
            Phase::GameOver | Phase::Victory => {
                let expired = state.grace_deadline.map_or(false, |deadline| now >= deadline);
                if expired {
                    state.reset_game();
                }
            }
            Phase::Playing | Phase::WaveActive | Phase::WaveComplete => {
                if state.shared_lives <= 0 {
                    state.phase = Phase::GameOver;
                    state.grace_deadline = Some(now + RESET_GRACE_SECONDS);
                    info!("game over, lives exhausted");
                    self.events.push_back(Event::GameOver {
                        victory: false,
                        summaries: state.summaries(),
                    });
                } else if state.phase == Phase::WaveComplete
                    && !state.settings.endless
                    && state.wave_number >= state.settings.victory_wave
                    && state.enemies.is_empty()
                {
                    state.phase = Phase::Victory;
                    state.grace_deadline = Some(now + RESET_GRACE_SECONDS);
                    info!(wave = state.wave_number, "victory");
                    self.events.push_back(Event::GameOver {
                        victory: true,
                        summaries: state.summaries(),
                    });
                }
            }
            Phase::Lobby => {}
        }
    }
}

struct SpawnParams {
    kind: EnemyKind,
    spawn_index: u32,
    health_multiplier: f64,
    speed_multiplier: f64,
    bounty_multiplier: f64,
    armor_bonus: f64,
    resist_bonus: f64,
    interval: f64,
}

fn spawn_enemy(state: &mut GameState, params: &SpawnParams) {
    let def = params.kind.def();
    let id = state.allocate_enemy_id();
    let health = def.health * params.health_multiplier * state.modifiers.enemy_health;
    let bounty = (f64::from(def.bounty)
        * params.bounty_multiplier
        * state.spawn_bounty_multiplier(params.spawn_index))
    .floor() as u32;
    state.enemies.push(EnemyInstance {
        id,
        kind: params.kind,
        health,
        max_health: health,
        position: state.grid.spawn().center(),
        path_index: 1,
        path_version: state.grid.version(),
        speed: def.speed * params.speed_multiplier * state.modifiers.enemy_speed,
        armor: (def.armor + params.armor_bonus).min(0.9),
        magic_resist: (def.magic_resist + params.resist_bonus).min(0.9),
        regen: def.regen,
        bounty,
        flying: def.flying,
        slow: None,
        poison: None,
        stun_until: 0.0,
        armor_debuff: None,
        next_poison_tick: 0.0,
        last_hit_by: None,
    });
}

/// Removes dead enemies, paying bounties and spawning death-splits.
///
/// Splits are inserted after the removal pass so an iteration that killed a
/// splitter never sees its broodlings mid-walk.
fn process_deaths(state: &mut GameState) {
    let mut credits: Vec<(PlayerId, u32)> = Vec::new();
    let mut splits: Vec<(EnemyKind, u32, Position, usize)> = Vec::new();
    let wave_health = state
        .current_wave
        .as_ref()
        .map_or(1.0, |wave| wave.health_multiplier);
    let wave_bounty = state
        .current_wave
        .as_ref()
        .map_or(1.0, |wave| wave.bounty_multiplier);
    state.enemies.retain(|enemy| {
        if !enemy.is_dead() {
            return true;
        }
        if let Some(killer) = enemy.last_hit_by {
            credits.push((killer, enemy.bounty));
        }
        if let Some(split) = enemy.kind.def().split {
            splits.push((split.kind, split.count, enemy.position, enemy.path_index));
        }
        false
    });
    for (killer, bounty) in credits {
        if let Ok(player) = state.player_mut(killer) {
            let payout = (f64::from(bounty) * player.bonuses.bounty).floor() as u32;
            player.money += payout;
            player.kills += 1;
        }
    }
    for (kind, count, position, path_index) in splits {
        let def = kind.def();
        let health = def.health * wave_health * state.modifiers.enemy_health;
        let bounty = (f64::from(def.bounty) * wave_bounty).floor() as u32;
        for _ in 0..count {
            let id = state.allocate_enemy_id();
            state.enemies.push(EnemyInstance {
                id,
                kind,
                health,
                max_health: health,
                position,
                path_index,
                path_version: state.grid.version(),
                speed: def.speed * state.modifiers.enemy_speed,
                armor: def.armor,
                magic_resist: def.magic_resist,
                regen: def.regen,
                bounty,
                flying: def.flying,
                slow: None,
                poison: None,
                stun_until: 0.0,
                armor_debuff: None,
                next_poison_tick: 0.0,
                last_hit_by: None,
            });
        }
    }
}

/// Buys queued upgrades in tower-id order once the wave income has landed.
///
/// A queued flag always clears, whether or not the owner can pay.
fn apply_queued_upgrades(state: &mut GameState) {
    for index in 0..state.towers.len() {
        if !state.towers[index].queued_upgrade {
            continue;
        }
        state.towers[index].queued_upgrade = false;
        let Some(base) = state.towers[index].next_upgrade_cost() else {
            continue;
        };
        let owner = state.towers[index].owner;
        let Ok(cost) = state.discounted_tower_price(owner, base) else {
            continue;
        };
        let Ok(player) = state.player_mut(owner) else {
            continue;
        };
        if player.money < cost {
            continue;
        }
        player.money -= cost;
        state.towers[index].upgrade();
    }
}

fn recompute_auras(state: &mut GameState) {
    let sources: Vec<(rampart_core::TowerId, Position, f64, f64)> = state
        .towers
        .iter()
        .filter_map(|tower| {
            tower.kind.def().aura.map(|aura| {
                let range_mult = state
                    .player(tower.owner)
                    .map_or(1.0, |player| player.bonuses.range);
                (tower.id, tower.cell.center(), aura.radius * range_mult, aura.bonus)
            })
        })
        .collect();
    for tower in &mut state.towers {
        tower.aura_mult = 1.0;
        for (source, center, radius, bonus) in &sources {
            if tower.id != *source && tower.cell.center().distance(*center) <= *radius {
                tower.aura_mult += bonus;
            }
        }
        tower.aura_mult = tower.aura_mult.min(AURA_CAP);
    }
}

fn expire_buffs(state: &mut GameState, now: f64) {
    for player in &mut state.players {
        if player
            .damage_buff
            .map_or(false, |buff| buff.expires_at <= now)
        {
            player.damage_buff = None;
        }
    }
}

fn fire_towers(state: &mut GameState, delta: f64, now: f64) {
    for tower in &mut state.towers {
        tower.cooldown = (tower.cooldown - delta).max(0.0);
    }
    for index in 0..state.towers.len() {
        let (target, payload, speed, position) = {
            let tower = &state.towers[index];
            if tower.stats.fire_rate <= 0.0 || tower.cooldown > 0.0 {
                continue;
            }
            let Ok(owner) = state.player(tower.owner) else {
                continue;
            };
            let range = tower.stats.range * owner.bonuses.range;
            let center = tower.cell.center();
            let Some(target) = pick_target(state, tower.targeting, center, range) else {
                continue;
            };
            let damage_mult = owner.bonuses.damage * owner.damage_buff_multiplier(now);
            (
                target,
                DamagePayload::bake(tower, damage_mult),
                travel_speed(tower.kind),
                center,
            )
        };
        let id = state.allocate_projectile_id();
        let target_point = state
            .enemies
            .iter()
            .find(|enemy| enemy.id == target)
            .map_or(position, |enemy| enemy.position);
        state.projectiles.push(Projectile {
            id,
            owner: state.towers[index].owner,
            target,
            position,
            target_point,
            speed,
            payload,
        });
        state.towers[index].cooldown = 1.0 / state.towers[index].stats.fire_rate;
    }
}

/// Picks a target among in-range live enemies; ties go to the first
/// encountered in spawn order.
fn pick_target(
    state: &GameState,
    mode: rampart_core::TargetingMode,
    center: Position,
    range: f64,
) -> Option<EnemyId> {
    use rampart_core::TargetingMode::*;
    let mut best: Option<(&EnemyInstance, f64)> = None;
    for enemy in &state.enemies {
        if enemy.is_dead() {
            continue;
        }
        let distance = center.distance(enemy.position);
        if distance > range {
            continue;
        }
        let better = match (&best, mode) {
            (None, _) => true,
            (Some((current, _)), First) => enemy.path_index > current.path_index,
            (Some((current, _)), Last) => enemy.path_index < current.path_index,
            (Some((_, current_distance)), Closest) => distance < *current_distance,
            (Some((current, _)), Strongest) => enemy.health > current.health,
        };
        if better {
            best = Some((enemy, distance));
        }
    }
    best.map(|(enemy, _)| enemy.id)
}

fn apply_impact(
    state: &mut GameState,
    impact: &Impact,
    ground: &[Position],
    flight: &[Position],
    now: f64,
) {
    let payload = &impact.payload;
    let mut hit: Vec<EnemyId> = vec![impact.target];
    let mut chain_origin = impact.point;

    if impact.target_alive {
        if let Some(enemy) = state.enemy_mut(impact.target) {
            enemy.last_hit_by = Some(impact.owner);
            if payload.execute_threshold > 0.0
                && enemy.health <= enemy.max_health * payload.execute_threshold
            {
                enemy.health = 0.0;
            } else {
                enemy.take_hit(payload.amount, payload.kind, now);
                if let Some(slow) = payload.slow {
                    enemy.apply_slow(slow.magnitude, slow.duration, now);
                }
                if let Some(poison) = payload.poison {
                    enemy.apply_poison(poison.dps, poison.duration, now);
                }
                if let Some(stun) = payload.stun {
                    enemy.apply_stun(stun, now);
                }
                if let Some(debuff) = payload.armor_debuff {
                    enemy.apply_armor_debuff(debuff.magnitude, debuff.duration, now);
                }
                if payload.teleport_back > 0 && !enemy.is_dead() {
                    let path: &[Position] = if enemy.flying { flight } else { ground };
                    push_back(enemy, path, f64::from(payload.teleport_back));
                }
            }
            chain_origin = enemy.position;
        }
    }

    if let Some(chain) = payload.chain {
        let mut damage = payload.amount;
        for _ in 0..chain.jumps {
            damage *= chain.decay;
            let mut nearest: Option<(EnemyId, f64)> = None;
            for enemy in &state.enemies {
                if enemy.is_dead() || hit.contains(&enemy.id) {
                    continue;
                }
                let distance = chain_origin.distance(enemy.position);
                if distance > chain.radius {
                    continue;
                }
                if nearest.map_or(true, |(_, best)| distance < best) {
                    nearest = Some((enemy.id, distance));
                }
            }
            let Some((next, _)) = nearest else { break };
            if let Some(enemy) = state.enemy_mut(next) {
                enemy.last_hit_by = Some(impact.owner);
                enemy.take_hit(damage, payload.kind, now);
                chain_origin = enemy.position;
            }
            hit.push(next);
        }
    }

    if let Some(splash) = payload.splash {
        let amount = payload.amount * splash.factor;
        for enemy in &mut state.enemies {
            if enemy.is_dead() || enemy.id == impact.target {
                continue;
            }
            if impact.point.distance(enemy.position) <= splash.radius {
                enemy.last_hit_by = Some(impact.owner);
                enemy.take_hit(amount, payload.kind, now);
            }
        }
    }
}

/// Walks an enemy backward along its waypoint polyline by `cells` units.
fn push_back(enemy: &mut EnemyInstance, path: &[Position], cells: f64) {
    let mut remaining = cells;
    while remaining > 0.0 && enemy.path_index >= 1 && enemy.path_index <= path.len() {
        let previous = path[enemy.path_index - 1];
        let distance = enemy.position.distance(previous);
        if distance >= remaining {
            if distance > 0.0 {
                let fraction = remaining / distance;
                enemy.position = Position::new(
                    enemy.position.x + (previous.x - enemy.position.x) * fraction,
                    enemy.position.y + (previous.y - enemy.position.y) * fraction,
                );
            }
            remaining = 0.0;
        } else {
            enemy.position = previous;
            remaining -= distance;
            if enemy.path_index > 1 {
                enemy.path_index -= 1;
            } else {
                break;
            }
        }
    }
}

fn waypoint_positions(cells: &[rampart_core::CellCoord]) -> Vec<Position> {
    cells.iter().map(|cell| cell.center()).collect()
}

fn nearest_waypoint(path: &[Position], position: Position) -> usize {
    let mut best_index = path.len().saturating_sub(1);
    let mut best_distance = f64::INFINITY;
    for (index, waypoint) in path.iter().enumerate() {
        let distance = position.distance(*waypoint);
        if distance < best_distance {
            best_distance = distance;
            best_index = index;
        }
    }
    best_index
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_core::{CellCoord, Governor, TowerKind};

    fn running_game() -> (GameState, GameLoop, rampart_core::PlayerId) {
        let mut state = GameState::new();
        let player = state.add_player("ada").expect("join");
        state.select_governor(player, Governor::Pyro).expect("governor");
        state.set_player_ready(player, true).expect("ready");
        state.start_game().expect("start");
        let game_loop = GameLoop::new();
        (state, game_loop, player)
    }

    #[test]
    fn first_tick_announces_the_initial_path() {
        let (mut state, mut game_loop, _) = running_game();
        game_loop.tick(&mut state, 0.1);
        let events = game_loop.drain_events();
        assert!(matches!(events.first(), Some(Event::PathChanged { version: 1, .. })));
    }

    #[test]
    fn manual_start_begins_the_wave_on_the_next_tick() {
        let (mut state, mut game_loop, player) = running_game();
        game_loop.tick(&mut state, 0.1);
        let _ = game_loop.drain_events();
        state.start_next_wave(player).expect("manual start");
        game_loop.tick(&mut state, 0.1);
        assert_eq!(state.phase(), Phase::WaveActive);
        assert_eq!(state.wave_number(), 1);
        let events = game_loop.drain_events();
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::WaveStarted { wave_number: 1, .. })));
    }

    #[test]
    fn auto_start_fires_after_the_countdown() {
        let (mut state, mut game_loop, _) = running_game();
        for _ in 0..301 {
            game_loop.tick(&mut state, 0.1);
        }
        assert_eq!(state.phase(), Phase::WaveActive);
    }

    #[test]
    fn enemies_spawn_on_the_wave_interval() {
        let (mut state, mut game_loop, player) = running_game();
        state.start_next_wave(player).expect("manual start");
        game_loop.tick(&mut state, 0.1);
        assert_eq!(state.enemies().len(), 1);
        game_loop.tick(&mut state, 0.8);
        assert_eq!(state.enemies().len(), 2);
    }

    #[test]
    fn towers_fire_and_kill_runts() {
        let (mut state, mut game_loop, player) = running_game();
        let _ = state
            .place_tower(player, TowerKind::Arrow, CellCoord::new(2, 7))
            .expect("place");
        state.start_next_wave(player).expect("manual start");
        let before = state.player(player).expect("player").money();
        for _ in 0..1200 {
            game_loop.tick(&mut state, 0.05);
            if state.phase() == Phase::WaveComplete {
                break;
            }
        }
        assert_eq!(state.phase(), Phase::WaveComplete);
        let after = state.player(player).expect("player").money();
        assert!(after > before, "kill bounties and income should pay out");
        assert!(state.player(player).expect("player").kills() > 0);
    }

    #[test]
    fn leaks_drain_the_shared_pool() {
        let (mut state, mut game_loop, player) = running_game();
        state.start_next_wave(player).expect("manual start");
        let lives = state.shared_lives();
        for _ in 0..2400 {
            game_loop.tick(&mut state, 0.05);
            if state.enemies().is_empty() && state.phase() != Phase::WaveActive {
                break;
            }
        }
        assert!(state.shared_lives() < lives);
        assert!(state.player(player).expect("player").leaks() > 0);
    }

    #[test]
    fn lives_exhaustion_ends_and_then_resets_the_game() {
        let (mut state, mut game_loop, _) = running_game();
        state.shared_lives = 0;
        game_loop.tick(&mut state, 0.1);
        assert_eq!(state.phase(), Phase::GameOver);
        let events = game_loop.drain_events();
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::GameOver { victory: false, .. })));
        for _ in 0..110 {
            game_loop.tick(&mut state, 0.1);
        }
        assert_eq!(state.phase(), Phase::Lobby);
        assert!(game_loop
            .drain_events()
            .iter()
            .any(|event| matches!(event, Event::GameReset)));
    }

    #[test]
    fn placing_a_tower_mid_wave_emits_a_path_change() {
        let (mut state, mut game_loop, player) = running_game();
        game_loop.tick(&mut state, 0.1);
        let _ = game_loop.drain_events();
        let _ = state
            .place_tower(player, TowerKind::Arrow, CellCoord::new(5, 8))
            .expect("place");
        game_loop.tick(&mut state, 0.1);
        let events = game_loop.drain_events();
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::PathChanged { version: 2, .. })));
    }
}
