#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative simulation state for the Rampart engine.
//!
//! [`GameState`] is the single logical owner of every entity: players,
//! towers, enemies, projectiles, the occupancy grid, and the active wave.
//! All mutation happens through its command methods or through
//! [`game_loop::GameLoop::tick`]; commands are expected to arrive between
//! ticks, never concurrently with one. Expected failures come back as typed
//! [`Rejection`] values for the host to surface as UI feedback.

pub mod game_loop;
pub mod grid;
pub mod snapshot;

mod enemy;
mod player;
mod projectile;
mod tower;

pub use enemy::{EnemyInstance, TimedStatus};
pub use player::{Bonuses, DamageBuff, Player};
pub use projectile::{DamagePayload, Projectile};
pub use tower::{upgrade_cost, TowerInstance, TowerStats};

use rampart_core::{
    Ability, CellCoord, EnemyId, EnemyKind, Event, GameModifiers, GameSettings, Governor, Phase,
    PlayerId, PlayerSummary, Position, ProjectileId, Rejection, TargetingMode, TechId, TowerId,
    TowerKind, Wave, WaveEntry, MANUAL_START_COOLDOWN, MAX_TOWER_LEVEL, SYNERGY_DAMAGE_BONUS,
};
use tracing::{debug, info};

use grid::OccupancyGrid;

/// Default grid width in cells.
pub const DEFAULT_GRID_WIDTH: u32 = 24;
/// Default grid height in cells.
pub const DEFAULT_GRID_HEIGHT: u32 = 16;

/// Multiplier on the bounty of enemies sent by other players.
const SENT_CREEP_BOUNTY_MULT: f64 = 1.25;

/// A pooled money request another player can pay into.
#[derive(Clone, Debug)]
pub struct FundingRequest {
    pub(crate) id: u32,
    pub(crate) requester: PlayerId,
    pub(crate) label: String,
    pub(crate) goal: u32,
    pub(crate) contributed: u32,
}

impl FundingRequest {
    /// Request identifier.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Player who opened the request.
    #[must_use]
    pub const fn requester(&self) -> PlayerId {
        self.requester
    }

    /// Short description shown to contributors.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Target amount.
    #[must_use]
    pub const fn goal(&self) -> u32 {
        self.goal
    }

    /// Amount contributed so far.
    #[must_use]
    pub const fn contributed(&self) -> u32 {
        self.contributed
    }
}

/// An open restart vote.
#[derive(Clone, Debug, Default)]
pub struct RestartVote {
    pub(crate) in_favor: Vec<PlayerId>,
    pub(crate) against: Vec<PlayerId>,
}

impl RestartVote {
    /// Players currently voting to restart.
    #[must_use]
    pub fn in_favor(&self) -> &[PlayerId] {
        &self.in_favor
    }

    /// Players currently voting against.
    #[must_use]
    pub fn against(&self) -> &[PlayerId] {
        &self.against
    }

    fn clear(&mut self, player: PlayerId) {
        self.in_favor.retain(|voter| *voter != player);
        self.against.retain(|voter| *voter != player);
    }
}

/// An ability activation waiting for the next tick to resolve.
#[derive(Clone, Copy, Debug)]
pub(crate) struct QueuedAbility {
    pub(crate) player: PlayerId,
    pub(crate) ability: Ability,
    pub(crate) target: Option<Position>,
}

/// The authoritative aggregate.
#[derive(Clone, Debug)]
pub struct GameState {
    pub(crate) phase: Phase,
    pub(crate) settings: GameSettings,
    pub(crate) modifiers: GameModifiers,
    pub(crate) grid: OccupancyGrid,
    pub(crate) players: Vec<Player>,
    pub(crate) towers: Vec<TowerInstance>,
    pub(crate) enemies: Vec<EnemyInstance>,
    pub(crate) projectiles: Vec<Projectile>,
    pub(crate) current_wave: Option<Wave>,
    pub(crate) wave_number: u32,
    pub(crate) wave_base_total: u32,
    pub(crate) shared_lives: i32,
    pub(crate) sim_time: f64,
    pub(crate) next_wave_deadline: Option<f64>,
    pub(crate) manual_start_ready_at: f64,
    pub(crate) grace_deadline: Option<f64>,
    pub(crate) spawn_timer: f64,
    pub(crate) queued_abilities: Vec<QueuedAbility>,
    pub(crate) funding: Vec<FundingRequest>,
    pub(crate) vote: Option<RestartVote>,
    pub(crate) next_player_id: u32,
    pub(crate) next_tower_id: u32,
    pub(crate) next_enemy_id: u32,
    pub(crate) next_projectile_id: u32,
    pub(crate) next_funding_id: u32,
    pub(crate) pending_events: Vec<Event>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Creates a fresh lobby with default settings and the standard map.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(GameSettings::default())
    }

    /// Creates a fresh lobby with the provided settings.
    #[must_use]
    pub fn with_settings(settings: GameSettings) -> Self {
        let starting_lives = settings.starting_lives;
        Self {
            phase: Phase::Lobby,
            settings,
            modifiers: GameModifiers::default(),
            grid: default_grid(),
            players: Vec::new(),
            towers: Vec::new(),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            current_wave: None,
            wave_number: 0,
            wave_base_total: 0,
            shared_lives: starting_lives,
            sim_time: 0.0,
            next_wave_deadline: None,
            manual_start_ready_at: 0.0,
            grace_deadline: None,
            spawn_timer: 0.0,
            queued_abilities: Vec::new(),
            funding: Vec::new(),
            vote: None,
            next_player_id: 0,
            next_tower_id: 0,
            next_enemy_id: 0,
            next_projectile_id: 0,
            next_funding_id: 0,
            pending_events: Vec::new(),
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Settings in force.
    #[must_use]
    pub const fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Mode modifiers in force.
    #[must_use]
    pub const fn modifiers(&self) -> &GameModifiers {
        &self.modifiers
    }

    /// The occupancy grid and cached path.
    #[must_use]
    pub const fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    /// Every player, in join order.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Every placed tower, in placement order.
    #[must_use]
    pub fn towers(&self) -> &[TowerInstance] {
        &self.towers
    }

    /// Every live enemy, in spawn order.
    #[must_use]
    pub fn enemies(&self) -> &[EnemyInstance] {
        &self.enemies
    }

    /// Every in-flight projectile.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// The active wave, if one is spawning or still has enemies alive.
    #[must_use]
    pub const fn current_wave(&self) -> Option<&Wave> {
        self.current_wave.as_ref()
    }

    /// Number of the last started wave, zero before the first.
    #[must_use]
    pub const fn wave_number(&self) -> u32 {
        self.wave_number
    }

    /// Remaining shared lives.
    #[must_use]
    pub const fn shared_lives(&self) -> i32 {
        self.shared_lives
    }

    /// Simulation time in seconds since the game was created.
    #[must_use]
    pub const fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Open funding requests.
    #[must_use]
    pub fn funding_requests(&self) -> &[FundingRequest] {
        &self.funding
    }

    /// The open restart vote, if any.
    #[must_use]
    pub const fn restart_vote(&self) -> Option<&RestartVote> {
        self.vote.as_ref()
    }

    // ----- lobby commands -------------------------------------------------

    /// Adds a player to the lobby.
    pub fn add_player(&mut self, name: &str) -> Result<PlayerId, Rejection> {
        self.require_phase(Phase::Lobby)?;
        if self.players.len() >= usize::from(self.settings.max_players) {
            return Err(Rejection::GameFull);
        }
        let id = PlayerId::new(self.next_player_id);
        self.next_player_id += 1;
        self.players
            .push(Player::new(id, name.to_owned(), self.settings.starting_money));
        info!(player = id.get(), name, "player joined");
        Ok(id)
    }

    /// Removes a player and tears down everything they own.
    ///
    /// Their towers are unblocked without refund since the recipient is
    /// gone; their open funding requests are dropped (contributions stay
    /// spent) and their votes are withdrawn.
    pub fn remove_player(&mut self, player: PlayerId) -> Result<(), Rejection> {
        if !self.players.iter().any(|entry| entry.id == player) {
            return Err(Rejection::UnknownPlayer(player));
        }
        let cells: Vec<CellCoord> = self
            .towers
            .iter()
            .filter(|tower| tower.owner == player)
            .map(|tower| tower.cell)
            .collect();
        self.towers.retain(|tower| tower.owner != player);
        for cell in cells {
            let _ = self.grid.remove(cell);
        }
        self.recompute_synergies();
        self.players.retain(|entry| entry.id != player);
        self.funding.retain(|request| request.requester != player);
        self.queued_abilities.retain(|queued| queued.player != player);
        if let Some(vote) = &mut self.vote {
            vote.clear(player);
        }
        info!(player = player.get(), "player removed");
        Ok(())
    }

    /// Picks a governor for the player; lobby only.
    pub fn select_governor(
        &mut self,
        player: PlayerId,
        governor: Governor,
    ) -> Result<(), Rejection> {
        self.require_phase(Phase::Lobby)?;
        let entry = self.player_mut(player)?;
        entry.governor = Some(governor);
        entry.recalculate_bonuses();
        Ok(())
    }

    /// Sets the player's lobby ready flag.
    pub fn set_player_ready(&mut self, player: PlayerId, ready: bool) -> Result<(), Rejection> {
        self.require_phase(Phase::Lobby)?;
        self.player_mut(player)?.ready = ready;
        Ok(())
    }

    /// Replaces the lobby settings; lobby only.
    pub fn update_settings(&mut self, settings: GameSettings) -> Result<(), Rejection> {
        self.require_phase(Phase::Lobby)?;
        if usize::from(settings.max_players) < self.players.len() {
            return Err(Rejection::InvalidAmount);
        }
        self.shared_lives = settings.starting_lives;
        for player in &mut self.players {
            player.money = settings.starting_money;
        }
        self.settings = settings;
        Ok(())
    }

    /// Applies mode modifiers (daily challenges and similar); lobby only.
    pub fn apply_modifiers(&mut self, modifiers: GameModifiers) -> Result<(), Rejection> {
        self.require_phase(Phase::Lobby)?;
        self.modifiers = modifiers;
        Ok(())
    }

    /// Leaves the lobby once every player picked a governor and readied up.
    pub fn start_game(&mut self) -> Result<(), Rejection> {
        self.require_phase(Phase::Lobby)?;
        if self.players.is_empty()
            || self
                .players
                .iter()
                .any(|player| !player.ready || player.governor.is_none())
        {
            return Err(Rejection::NotReady);
        }
        self.phase = Phase::Playing;
        self.shared_lives = self.settings.starting_lives;
        self.next_wave_deadline = Some(self.sim_time + self.settings.auto_start_seconds);
        info!(players = self.players.len(), "game started");
        Ok(())
    }

    // ----- wave commands --------------------------------------------------

    /// Starts the next wave ahead of the auto-start timer.
    ///
    /// Rate limited so one player cannot chain-start waves; the wave itself
    /// begins on the next tick.
    pub fn start_next_wave(&mut self, player: PlayerId) -> Result<(), Rejection> {
        let _ = self.player(player)?;
        if !matches!(self.phase, Phase::Playing | Phase::WaveComplete) {
            return Err(Rejection::WrongPhase { phase: self.phase });
        }
        let remaining = self.manual_start_ready_at - self.sim_time;
        if remaining > 0.0 {
            return Err(Rejection::ManualStartCooldown { remaining });
        }
        self.manual_start_ready_at = self.sim_time + MANUAL_START_COOLDOWN;
        self.next_wave_deadline = Some(self.sim_time);
        Ok(())
    }

    // ----- tower commands -------------------------------------------------

    /// Checks whether the player could place a tower of `kind` at `cell`.
    pub fn can_place_tower(
        &mut self,
        player: PlayerId,
        kind: TowerKind,
        cell: CellCoord,
    ) -> Result<(), Rejection> {
        self.require_running()?;
        let cost = self.tower_cost(player, kind)?;
        let entry = self.player(player)?;
        if entry.money < cost {
            return Err(Rejection::InsufficientMoney {
                needed: cost,
                have: entry.money,
            });
        }
        self.grid.can_place(cell)
    }

    /// Places a tower, charging the discounted cost and rerouting enemies.
    pub fn place_tower(
        &mut self,
        player: PlayerId,
        kind: TowerKind,
        cell: CellCoord,
    ) -> Result<TowerId, Rejection> {
        self.can_place_tower(player, kind, cell)?;
        let cost = self.tower_cost(player, kind)?;
        let element = self
            .player(player)?
            .governor
            .map(|governor| governor.def().element)
            .ok_or(Rejection::NoGovernor)?;
        self.grid.place(cell)?;
        self.player_mut(player)?.money -= cost;
        let id = TowerId::new(self.next_tower_id);
        self.next_tower_id += 1;
        self.towers
            .push(TowerInstance::new(id, player, kind, cell, element));
        self.recompute_synergies();
        debug!(player = player.get(), tower = id.get(), ?kind, "tower placed");
        Ok(id)
    }

    /// Sells a tower for the refund fraction of every coin invested.
    pub fn sell_tower(&mut self, player: PlayerId, tower: TowerId) -> Result<u32, Rejection> {
        let index = self.owned_tower_index(player, tower)?;
        let sold = self.towers.remove(index);
        let refund = sold.refund();
        let _ = self.grid.remove(sold.cell);
        self.player_mut(player)?.money += refund;
        self.recompute_synergies();
        Ok(refund)
    }

    /// Upgrades a tower immediately.
    pub fn upgrade_tower(&mut self, player: PlayerId, tower: TowerId) -> Result<(), Rejection> {
        let index = self.owned_tower_index(player, tower)?;
        let base = self.towers[index]
            .next_upgrade_cost()
            .ok_or(Rejection::MaxLevel)?;
        let cost = self.discounted_tower_price(player, base)?;
        let entry = self.player_mut(player)?;
        if entry.money < cost {
            return Err(Rejection::InsufficientMoney {
                needed: cost,
                have: entry.money,
            });
        }
        entry.money -= cost;
        self.towers[index].upgrade();
        Ok(())
    }

    /// Queues an upgrade to be bought when the current wave completes.
    pub fn queue_upgrade(&mut self, player: PlayerId, tower: TowerId) -> Result<(), Rejection> {
        let index = self.owned_tower_index(player, tower)?;
        if self.towers[index].level >= MAX_TOWER_LEVEL {
            return Err(Rejection::MaxLevel);
        }
        self.towers[index].queued_upgrade = true;
        Ok(())
    }

    /// Cancels a previously queued upgrade.
    pub fn cancel_queued_upgrade(
        &mut self,
        player: PlayerId,
        tower: TowerId,
    ) -> Result<(), Rejection> {
        let index = self.owned_tower_index(player, tower)?;
        self.towers[index].queued_upgrade = false;
        Ok(())
    }

    /// Changes a tower's targeting policy.
    pub fn set_tower_targeting(
        &mut self,
        player: PlayerId,
        tower: TowerId,
        mode: TargetingMode,
    ) -> Result<(), Rejection> {
        let index = self.owned_tower_index(player, tower)?;
        self.towers[index].targeting = mode;
        Ok(())
    }

    /// Hands a tower to another player without payment.
    ///
    /// The tower takes on the recipient's element, so the synergy layout is
    /// recomputed.
    pub fn gift_tower(
        &mut self,
        from: PlayerId,
        tower: TowerId,
        to: PlayerId,
    ) -> Result<(), Rejection> {
        let governor = self.player(to)?.governor.ok_or(Rejection::NoGovernor)?;
        let index = self.owned_tower_index(from, tower)?;
        self.towers[index].owner = to;
        self.towers[index].element = governor.def().element;
        self.recompute_synergies();
        Ok(())
    }

    // ----- economy commands -----------------------------------------------

    /// Buys one stack of a tech with lumber.
    pub fn purchase_tech(&mut self, player: PlayerId, tech: TechId) -> Result<(), Rejection> {
        let def = tech.def();
        let entry = self.player_mut(player)?;
        if entry.tech_stacks(tech) >= def.max_stacks {
            return Err(Rejection::MaxStacks);
        }
        if entry.lumber < def.lumber_cost {
            return Err(Rejection::InsufficientLumber {
                needed: def.lumber_cost,
                have: entry.lumber,
            });
        }
        entry.lumber -= def.lumber_cost;
        *entry.tech.entry(tech).or_insert(0) += 1;
        entry.recalculate_bonuses();
        Ok(())
    }

    /// Spends money to append extra enemies to the active wave.
    ///
    /// Sent creeps spawn with a bounty bump so defenders are compensated for
    /// the extra pressure.
    pub fn send_creeps(
        &mut self,
        player: PlayerId,
        kind: EnemyKind,
        count: u32,
    ) -> Result<(), Rejection> {
        if self.phase != Phase::WaveActive {
            return Err(Rejection::WrongPhase { phase: self.phase });
        }
        if count == 0 {
            return Err(Rejection::InvalidAmount);
        }
        let unit_cost = kind.def().send_cost.ok_or(Rejection::UnsendableCreep)?;
        let total = unit_cost.saturating_mul(count);
        let entry = self.player_mut(player)?;
        if entry.money < total {
            return Err(Rejection::InsufficientMoney {
                needed: total,
                have: entry.money,
            });
        }
        entry.money -= total;
        let wave = self
            .current_wave
            .as_mut()
            .ok_or(Rejection::WrongPhase { phase: Phase::WaveActive })?;
        wave.entries.push(WaveEntry { kind, count });
        if wave.completed {
            wave.completed = false;
            // Spawning had wound down; the reinforcements wait a full
            // interval instead of inheriting a stale timer.
            self.spawn_timer = wave.spawn_interval;
        }
        Ok(())
    }

    /// Transfers money between players.
    pub fn send_gold(
        &mut self,
        from: PlayerId,
        to: PlayerId,
        amount: u32,
    ) -> Result<(), Rejection> {
        if amount == 0 || from == to {
            return Err(Rejection::InvalidAmount);
        }
        let _ = self.player(to)?;
        let sender = self.player_mut(from)?;
        if sender.money < amount {
            return Err(Rejection::InsufficientMoney {
                needed: amount,
                have: sender.money,
            });
        }
        sender.money -= amount;
        self.player_mut(to)?.money += amount;
        Ok(())
    }

    /// Opens a funding request other players can pay into.
    pub fn request_funding(
        &mut self,
        player: PlayerId,
        label: &str,
        goal: u32,
    ) -> Result<u32, Rejection> {
        let _ = self.player(player)?;
        if goal == 0 {
            return Err(Rejection::InvalidAmount);
        }
        let id = self.next_funding_id;
        self.next_funding_id += 1;
        self.funding.push(FundingRequest {
            id,
            requester: player,
            label: label.to_owned(),
            goal,
            contributed: 0,
        });
        Ok(id)
    }

    /// Pays into a funding request; the pot pays out when the goal is met.
    pub fn contribute_funding(
        &mut self,
        player: PlayerId,
        funding: u32,
        amount: u32,
    ) -> Result<(), Rejection> {
        if amount == 0 {
            return Err(Rejection::InvalidAmount);
        }
        let index = self
            .funding
            .iter()
            .position(|request| request.id == funding)
            .ok_or(Rejection::UnknownFunding(funding))?;
        let entry = self.player_mut(player)?;
        if entry.money < amount {
            return Err(Rejection::InsufficientMoney {
                needed: amount,
                have: entry.money,
            });
        }
        entry.money -= amount;
        self.funding[index].contributed += amount;
        if self.funding[index].contributed >= self.funding[index].goal {
            let request = self.funding.remove(index);
            self.player_mut(request.requester)?.money += request.contributed;
        }
        Ok(())
    }

    // ----- abilities ------------------------------------------------------

    /// Queues the player's governor ability for the next tick.
    ///
    /// The cooldown starts when the activation is accepted, not when it
    /// resolves.
    pub fn use_ability(
        &mut self,
        player: PlayerId,
        target: Option<Position>,
    ) -> Result<(), Rejection> {
        self.require_running()?;
        let entry = self.player(player)?;
        let governor = entry.governor.ok_or(Rejection::NoGovernor)?;
        let ability = governor.def().ability;
        let remaining = entry.ability_ready_at - self.sim_time;
        if remaining > 0.0 {
            return Err(Rejection::CooldownActive { remaining });
        }
        if ability.def().targeted && target.is_none() {
            return Err(Rejection::MissingTarget);
        }
        let cooldown = ability.def().cooldown;
        self.player_mut(player)?.ability_ready_at = self.sim_time + cooldown;
        self.queued_abilities.push(QueuedAbility {
            player,
            ability,
            target,
        });
        Ok(())
    }

    // ----- votes and reset ------------------------------------------------

    /// Opens a restart vote with the initiator voting in favor.
    pub fn start_vote(&mut self, player: PlayerId) -> Result<(), Rejection> {
        let _ = self.player(player)?;
        if self.vote.is_some() {
            return Err(Rejection::VoteInProgress);
        }
        self.vote = Some(RestartVote {
            in_favor: vec![player],
            against: Vec::new(),
        });
        Ok(())
    }

    /// Records a vote, replacing the player's previous one.
    pub fn cast_vote(&mut self, player: PlayerId, in_favor: bool) -> Result<(), Rejection> {
        let _ = self.player(player)?;
        let vote = self.vote.as_mut().ok_or(Rejection::NoVote)?;
        vote.clear(player);
        if in_favor {
            vote.in_favor.push(player);
        } else {
            vote.against.push(player);
        }
        Ok(())
    }

    /// Tallies the open vote; a strict majority in favor restarts the game.
    pub fn resolve_vote(&mut self) -> Result<bool, Rejection> {
        let vote = self.vote.take().ok_or(Rejection::NoVote)?;
        let passed = vote.in_favor.len() * 2 > self.players.len();
        if passed {
            info!("restart vote passed");
            self.reset_game();
        }
        Ok(passed)
    }

    /// Resets to a fresh lobby, keeping the roster and governor picks.
    pub fn reset_game(&mut self) {
        let settings = self.settings.clone();
        let mut players = std::mem::take(&mut self.players);
        for player in &mut players {
            player.ready = false;
            player.money = settings.starting_money;
            player.lumber = 0;
            player.tech.clear();
            player.ability_ready_at = 0.0;
            player.damage_buff = None;
            player.kills = 0;
            player.leaks = 0;
            player.recalculate_bonuses();
        }
        let next_player_id = self.next_player_id;
        *self = Self::with_settings(settings);
        self.players = players;
        self.next_player_id = next_player_id;
        self.pending_events.push(Event::GameReset);
        info!("game reset to lobby");
    }

    // ----- shared internals ----------------------------------------------

    /// Final per-player statistics, reported with the game-over event.
    #[must_use]
    pub fn summaries(&self) -> Vec<PlayerSummary> {
        self.players
            .iter()
            .map(|player| PlayerSummary {
                player: player.id,
                name: player.name.clone(),
                kills: player.kills,
                leaks: player.leaks,
                money: player.money,
            })
            .collect()
    }

    pub(crate) fn player(&self, id: PlayerId) -> Result<&Player, Rejection> {
        self.players
            .iter()
            .find(|player| player.id == id)
            .ok_or(Rejection::UnknownPlayer(id))
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, Rejection> {
        self.players
            .iter_mut()
            .find(|player| player.id == id)
            .ok_or(Rejection::UnknownPlayer(id))
    }

    pub(crate) fn enemy_mut(&mut self, id: EnemyId) -> Option<&mut EnemyInstance> {
        self.enemies.iter_mut().find(|enemy| enemy.id == id)
    }

    fn owned_tower_index(&self, player: PlayerId, tower: TowerId) -> Result<usize, Rejection> {
        let _ = self.player(player)?;
        let index = self
            .towers
            .iter()
            .position(|entry| entry.id == tower)
            .ok_or(Rejection::UnknownTower(tower))?;
        if self.towers[index].owner != player {
            return Err(Rejection::NotOwner);
        }
        Ok(index)
    }

    fn tower_cost(&self, player: PlayerId, kind: TowerKind) -> Result<u32, Rejection> {
        let entry = self.player(player)?;
        if kind.def().ultimate && !entry.has_ultimate_unlock() {
            return Err(Rejection::UltimateLocked);
        }
        self.discounted_tower_price(player, kind.def().cost)
    }

    pub(crate) fn discounted_tower_price(
        &self,
        player: PlayerId,
        base: u32,
    ) -> Result<u32, Rejection> {
        let entry = self.player(player)?;
        let discounted = entry.discounted_cost(base);
        Ok((f64::from(discounted) * self.modifiers.tower_cost).floor() as u32)
    }

    fn require_phase(&self, phase: Phase) -> Result<(), Rejection> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(Rejection::WrongPhase { phase: self.phase })
        }
    }

    fn require_running(&self) -> Result<(), Rejection> {
        if matches!(
            self.phase,
            Phase::Playing | Phase::WaveActive | Phase::WaveComplete
        ) {
            Ok(())
        } else {
            Err(Rejection::WrongPhase { phase: self.phase })
        }
    }

    /// Recomputes every tower's synergy multiplier from the full layout.
    ///
    /// Two towers of different elements on orthogonally adjacent cells form
    /// a synergy pair; each member fires with the synergy bonus.
    pub(crate) fn recompute_synergies(&mut self) {
        let placements: Vec<(CellCoord, rampart_core::Element)> = self
            .towers
            .iter()
            .map(|tower| (tower.cell, tower.element))
            .collect();
        for tower in &mut self.towers {
            let linked = placements.iter().any(|(cell, element)| {
                *element != tower.element && cell.is_orthogonal_neighbor(tower.cell)
            });
            tower.synergy_mult = if linked { SYNERGY_DAMAGE_BONUS } else { 1.0 };
        }
    }

    /// Bounty multiplier applied to an enemy spawned at `spawn_index`.
    pub(crate) fn spawn_bounty_multiplier(&self, spawn_index: u32) -> f64 {
        if spawn_index >= self.wave_base_total {
            SENT_CREEP_BOUNTY_MULT
        } else {
            1.0
        }
    }

    pub(crate) fn allocate_enemy_id(&mut self) -> EnemyId {
        let id = EnemyId::new(self.next_enemy_id);
        self.next_enemy_id += 1;
        id
    }

    pub(crate) fn allocate_projectile_id(&mut self) -> ProjectileId {
        let id = ProjectileId::new(self.next_projectile_id);
        self.next_projectile_id += 1;
        id
    }
}

fn default_grid() -> OccupancyGrid {
    OccupancyGrid::new(
        DEFAULT_GRID_WIDTH,
        DEFAULT_GRID_HEIGHT,
        CellCoord::new(0, 8),
        CellCoord::new(DEFAULT_GRID_WIDTH - 1, 8),
        vec![CellCoord::new(DEFAULT_GRID_WIDTH / 2, 8)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby_with_two_players() -> (GameState, PlayerId, PlayerId) {
        let mut state = GameState::new();
        let first = state.add_player("ada").expect("join");
        let second = state.add_player("brin").expect("join");
        (state, first, second)
    }

    fn running_game() -> (GameState, PlayerId) {
        let mut state = GameState::new();
        let player = state.add_player("ada").expect("join");
        state.select_governor(player, Governor::Pyro).expect("governor");
        state.set_player_ready(player, true).expect("ready");
        state.start_game().expect("start");
        (state, player)
    }

    #[test]
    fn lobby_rejects_joins_beyond_max_players() {
        let mut state = GameState::new();
        for index in 0..4 {
            let _ = state.add_player(&format!("p{index}")).expect("join");
        }
        assert!(matches!(state.add_player("late"), Err(Rejection::GameFull)));
    }

    #[test]
    fn start_game_requires_everyone_ready_with_a_governor() {
        let (mut state, first, second) = lobby_with_two_players();
        assert!(matches!(state.start_game(), Err(Rejection::NotReady)));
        state.select_governor(first, Governor::Pyro).expect("governor");
        state.set_player_ready(first, true).expect("ready");
        state.select_governor(second, Governor::Cryo).expect("governor");
        assert!(matches!(state.start_game(), Err(Rejection::NotReady)));
        state.set_player_ready(second, true).expect("ready");
        state.start_game().expect("start");
        assert_eq!(state.phase(), Phase::Playing);
    }

    #[test]
    fn placement_charges_the_discounted_cost() {
        let (mut state, player) = running_game();
        let before = state.player(player).expect("player").money();
        let _ = state
            .place_tower(player, TowerKind::Arrow, CellCoord::new(3, 3))
            .expect("place");
        let after = state.player(player).expect("player").money();
        assert_eq!(before - after, 10);
    }

    #[test]
    fn terra_discount_applies_to_placement() {
        let mut state = GameState::new();
        let player = state.add_player("ada").expect("join");
        state.select_governor(player, Governor::Terra).expect("governor");
        state.set_player_ready(player, true).expect("ready");
        state.start_game().expect("start");
        let before = state.player(player).expect("player").money();
        let _ = state
            .place_tower(player, TowerKind::Arrow, CellCoord::new(3, 3))
            .expect("place");
        let after = state.player(player).expect("player").money();
        assert_eq!(before - after, 9);
    }

    #[test]
    fn placement_requires_funds() {
        let (mut state, player) = running_game();
        assert!(matches!(
            state.place_tower(player, TowerKind::Prism, CellCoord::new(3, 3)),
            Err(Rejection::UltimateLocked)
        ));
        assert!(matches!(
            state.place_tower(player, TowerKind::Sniper, CellCoord::new(3, 3)),
            Err(Rejection::InsufficientMoney { needed: 50, have: 30 })
        ));
    }

    #[test]
    fn selling_refunds_and_unblocks() {
        let (mut state, player) = running_game();
        let tower = state
            .place_tower(player, TowerKind::Arrow, CellCoord::new(3, 3))
            .expect("place");
        let refund = state.sell_tower(player, tower).expect("sell");
        assert_eq!(refund, 7);
        assert!(!state.grid().is_blocked(CellCoord::new(3, 3)));
        assert!(state.towers().is_empty());
    }

    #[test]
    fn only_the_owner_may_sell() {
        let (mut state, first, second) = lobby_with_two_players();
        state.select_governor(first, Governor::Pyro).expect("governor");
        state.select_governor(second, Governor::Cryo).expect("governor");
        state.set_player_ready(first, true).expect("ready");
        state.set_player_ready(second, true).expect("ready");
        state.start_game().expect("start");
        let tower = state
            .place_tower(first, TowerKind::Arrow, CellCoord::new(3, 3))
            .expect("place");
        assert!(matches!(
            state.sell_tower(second, tower),
            Err(Rejection::NotOwner)
        ));
    }

    #[test]
    fn upgrades_stop_at_max_level() {
        let (mut state, player) = running_game();
        state.player_mut(player).expect("player").money = 1_000;
        let tower = state
            .place_tower(player, TowerKind::Arrow, CellCoord::new(3, 3))
            .expect("place");
        for _ in 1..MAX_TOWER_LEVEL {
            state.upgrade_tower(player, tower).expect("upgrade");
        }
        assert!(matches!(
            state.upgrade_tower(player, tower),
            Err(Rejection::MaxLevel)
        ));
    }

    #[test]
    fn adjacent_cross_element_towers_gain_synergy() {
        let (mut state, first, second) = lobby_with_two_players();
        state.select_governor(first, Governor::Pyro).expect("governor");
        state.select_governor(second, Governor::Cryo).expect("governor");
        state.set_player_ready(first, true).expect("ready");
        state.set_player_ready(second, true).expect("ready");
        state.start_game().expect("start");
        let fire = state
            .place_tower(first, TowerKind::Arrow, CellCoord::new(3, 3))
            .expect("place");
        assert!((state.towers()[0].synergy_mult - 1.0).abs() < 1e-9);
        let _ = state
            .place_tower(second, TowerKind::Arrow, CellCoord::new(3, 4))
            .expect("place");
        for tower in state.towers() {
            assert!((tower.synergy_mult - SYNERGY_DAMAGE_BONUS).abs() < 1e-9);
        }
        let _ = state.sell_tower(first, fire).expect("sell");
        assert!((state.towers()[0].synergy_mult - 1.0).abs() < 1e-9);
    }

    #[test]
    fn same_element_neighbors_never_synergize() {
        let (mut state, player) = running_game();
        state.player_mut(player).expect("player").money = 1_000;
        let _ = state
            .place_tower(player, TowerKind::Arrow, CellCoord::new(3, 3))
            .expect("place");
        let _ = state
            .place_tower(player, TowerKind::Cannon, CellCoord::new(3, 4))
            .expect("place");
        for tower in state.towers() {
            assert!((tower.synergy_mult - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn gifting_restamps_the_element_and_recomputes_synergies() {
        let (mut state, first, second) = lobby_with_two_players();
        state.select_governor(first, Governor::Pyro).expect("governor");
        state.select_governor(second, Governor::Cryo).expect("governor");
        state.set_player_ready(first, true).expect("ready");
        state.set_player_ready(second, true).expect("ready");
        state.start_game().expect("start");
        let kept = state
            .place_tower(first, TowerKind::Arrow, CellCoord::new(3, 3))
            .expect("place");
        let gifted = state
            .place_tower(first, TowerKind::Arrow, CellCoord::new(3, 4))
            .expect("place");
        // Same owner, same element, no synergy yet.
        for tower in state.towers() {
            assert!((tower.synergy_mult - 1.0).abs() < 1e-9);
        }

        state.gift_tower(first, gifted, second).expect("gift");
        let moved = state
            .towers()
            .iter()
            .find(|tower| tower.id() == gifted)
            .expect("gifted tower");
        assert_eq!(moved.owner(), second);
        assert_eq!(moved.element(), Governor::Cryo.def().element);
        assert_ne!(
            moved.element(),
            state
                .towers()
                .iter()
                .find(|tower| tower.id() == kept)
                .expect("kept tower")
                .element()
        );
        for tower in state.towers() {
            assert!((tower.synergy_mult - SYNERGY_DAMAGE_BONUS).abs() < 1e-9);
        }
    }

    #[test]
    fn tech_purchases_respect_lumber_and_stack_caps() {
        let (mut state, player) = running_game();
        assert!(matches!(
            state.purchase_tech(player, TechId::UltimateMastery),
            Err(Rejection::InsufficientLumber { needed: 3, have: 0 })
        ));
        state.player_mut(player).expect("player").lumber = 10;
        state
            .purchase_tech(player, TechId::UltimateMastery)
            .expect("purchase");
        assert!(matches!(
            state.purchase_tech(player, TechId::UltimateMastery),
            Err(Rejection::MaxStacks)
        ));
        assert!(state.player(player).expect("player").has_ultimate_unlock());
    }

    #[test]
    fn send_gold_moves_money_between_players() {
        let (mut state, first, second) = lobby_with_two_players();
        state.send_gold(first, second, 10).expect("transfer");
        assert_eq!(state.player(first).expect("player").money(), 20);
        assert_eq!(state.player(second).expect("player").money(), 40);
        assert!(matches!(
            state.send_gold(first, second, 0),
            Err(Rejection::InvalidAmount)
        ));
    }

    #[test]
    fn funding_pays_out_when_the_goal_is_met() {
        let (mut state, first, second) = lobby_with_two_players();
        let request = state.request_funding(first, "tesla fund", 25).expect("open");
        state.contribute_funding(second, request, 25).expect("pay");
        assert_eq!(state.player(first).expect("player").money(), 55);
        assert!(state.funding_requests().is_empty());
        assert!(matches!(
            state.contribute_funding(second, request, 5),
            Err(Rejection::UnknownFunding(_))
        ));
    }

    #[test]
    fn restart_vote_needs_a_strict_majority() {
        let (mut state, first, second) = lobby_with_two_players();
        state.start_vote(first).expect("open");
        assert!(matches!(state.start_vote(second), Err(Rejection::VoteInProgress)));
        assert!(!state.resolve_vote().expect("resolve"));
        state.start_vote(first).expect("open");
        state.cast_vote(second, true).expect("cast");
        assert!(state.resolve_vote().expect("resolve"));
        assert_eq!(state.phase(), Phase::Lobby);
    }

    #[test]
    fn reset_keeps_the_roster_but_clears_progress() {
        let (mut state, player) = running_game();
        state.player_mut(player).expect("player").kills = 9;
        let _ = state
            .place_tower(player, TowerKind::Arrow, CellCoord::new(3, 3))
            .expect("place");
        state.reset_game();
        assert_eq!(state.phase(), Phase::Lobby);
        assert_eq!(state.players().len(), 1);
        let restored = state.player(player).expect("player");
        assert_eq!(restored.kills(), 0);
        assert_eq!(restored.money(), 30);
        assert_eq!(restored.governor(), Some(Governor::Pyro));
        assert!(state.towers().is_empty());
    }

    #[test]
    fn ability_use_needs_a_target_when_the_ability_is_targeted() {
        let (mut state, player) = running_game();
        assert!(matches!(
            state.use_ability(player, None),
            Err(Rejection::MissingTarget)
        ));
        state
            .use_ability(player, Some(Position::new(3.0, 8.0)))
            .expect("queue");
        assert!(matches!(
            state.use_ability(player, Some(Position::new(3.0, 8.0))),
            Err(Rejection::CooldownActive { .. })
        ));
    }

    #[test]
    fn manual_start_is_rate_limited() {
        let (mut state, player) = running_game();
        state.start_next_wave(player).expect("manual start");
        assert!(matches!(
            state.start_next_wave(player),
            Err(Rejection::ManualStartCooldown { .. })
        ));
    }

    #[test]
    fn removed_players_towers_are_torn_down() {
        let (mut state, first, second) = lobby_with_two_players();
        state.select_governor(first, Governor::Pyro).expect("governor");
        state.select_governor(second, Governor::Cryo).expect("governor");
        state.set_player_ready(first, true).expect("ready");
        state.set_player_ready(second, true).expect("ready");
        state.start_game().expect("start");
        let _ = state
            .place_tower(first, TowerKind::Arrow, CellCoord::new(3, 3))
            .expect("place");
        state.remove_player(first).expect("remove");
        assert!(state.towers().is_empty());
        assert!(!state.grid().is_blocked(CellCoord::new(3, 3)));
        assert_eq!(state.players().len(), 1);
    }
}
