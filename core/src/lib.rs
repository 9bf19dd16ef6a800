#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Rampart simulation engine.
//!
//! This crate defines the types that connect the host layer (lobby, UI,
//! networking) with the authoritative world: identifiers, grid coordinates,
//! the closed kind enums and their static stat tables, the [`Event`] union
//! drained from the game loop, the [`Rejection`] errors returned by command
//! methods, and the versioned [`snapshot`] wire contract used for host
//! migration and replay.

pub mod defs;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defs::{
    Ability, AbilityDef, AbilityEffect, AuraDef, ChainDef, EnemyDef, EnemyKind, Governor,
    GovernorDef, PoisonDef, SplashDef, SplitDef, TechDef, TechId, TimedMagnitude, TowerDef,
    TowerKind, WaveMutator,
};

/// Maximum upgrade level a tower can reach.
pub const MAX_TOWER_LEVEL: u8 = 4;
/// Fraction of the base cost charged per upgrade level.
pub const UPGRADE_COST_FACTOR: f64 = 0.6;
/// Fraction of every invested coin returned when selling a tower.
pub const SELL_REFUND_FACTOR: f64 = 0.7;
/// Damage multiplier applied by each tower upgrade.
pub const UPGRADE_DAMAGE_MULT: f64 = 1.5;
/// Range multiplier applied by each tower upgrade.
pub const UPGRADE_RANGE_MULT: f64 = 1.15;
/// Fire-rate multiplier applied by each tower upgrade.
pub const UPGRADE_RATE_MULT: f64 = 1.2;
/// Base interest rate applied to a player's money after each wave.
pub const INTEREST_RATE: f64 = 0.05;
/// Flat component of the per-wave interest cap.
pub const INTEREST_CAP_BASE: u32 = 50;
/// Per-wave growth of the interest cap.
pub const INTEREST_CAP_PER_WAVE: u32 = 10;
/// Lumber is awarded after every wave divisible by this stride.
pub const LUMBER_WAVE_STRIDE: u32 = 5;
/// Upper clamp for the combined aura multiplier on a single tower.
pub const AURA_CAP: f64 = 1.6;
/// Damage multiplier granted to each member of an active synergy pair.
pub const SYNERGY_DAMAGE_BONUS: f64 = 1.10;
/// First wave number eligible for random mutators.
pub const MUTATOR_START_WAVE: u32 = 8;
/// Seconds a manual wave start stays on cooldown.
pub const MANUAL_START_COOLDOWN: f64 = 5.0;
/// Grace period before a finished game resets back to the lobby.
pub const RESET_GRACE_SECONDS: f64 = 10.0;
/// Interval between poison damage ticks.
pub const POISON_TICK_SECONDS: f64 = 1.0;
/// Wire contract revision written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Computes the interest paid on `money` after wave `wave`.
///
/// The payout is `floor(money * rate)` clamped to a cap that grows linearly
/// with the wave number, so late-game banking stays bounded.
#[must_use]
pub fn calculate_interest(money: u32, rate: f64, wave: u32) -> u32 {
    let cap = INTEREST_CAP_BASE.saturating_add(INTEREST_CAP_PER_WAVE.saturating_mul(wave));
    let raw = (money as f64 * rate).floor();
    if raw <= 0.0 {
        return 0;
    }
    (raw as u32).min(cap)
}

/// Reports whether completing `wave` awards lumber.
#[must_use]
pub fn should_award_lumber(wave: u32) -> bool {
    wave > 0 && wave % LUMBER_WAVE_STRIDE == 0
}

/// Unique identifier assigned to a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an in-flight projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new projectile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Continuous position at the center of this cell.
    #[must_use]
    pub fn center(self) -> Position {
        Position::new(f64::from(self.column) + 0.5, f64::from(self.row) + 0.5)
    }

    /// Reports whether the other cell shares an edge with this one.
    #[must_use]
    pub fn is_orthogonal_neighbor(self, other: CellCoord) -> bool {
        self.manhattan_distance(other) == 1
    }
}

/// Continuous position expressed in cell units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate in cell units.
    pub x: f64,
    /// Vertical coordinate in cell units.
    pub y: f64,
}

impl Position {
    /// Creates a new continuous position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn distance(self, other: Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Element associated with a governor and with every tower it places.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// Fire towers and abilities.
    Fire,
    /// Frost towers and abilities.
    Frost,
    /// Lightning towers and abilities.
    Lightning,
    /// Shadow towers and abilities.
    Shadow,
    /// Earth towers and abilities.
    Earth,
    /// Light towers and abilities.
    Light,
}

/// Kind of damage a tower or ability deals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageKind {
    /// Reduced by enemy armor.
    Physical,
    /// Reduced by enemy magic resistance.
    Magic,
}

/// Targeting policy a tower uses to pick among in-range enemies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetingMode {
    /// Enemy furthest along its path.
    First,
    /// Enemy least far along its path.
    Last,
    /// Enemy closest to the tower.
    Closest,
    /// Enemy with the highest current health.
    Strongest,
}

/// Lifecycle phase of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Players are joining, picking governors, and readying up.
    Lobby,
    /// Game started, waiting for the first or next wave.
    Playing,
    /// A wave is spawning or enemies from it remain alive.
    WaveActive,
    /// The last wave finished; the next one has not started yet.
    WaveComplete,
    /// The shared life pool was exhausted.
    GameOver,
    /// The victory wave was cleared.
    Victory,
}

/// Tunable settings chosen in the lobby.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    /// Maximum number of players allowed in the game.
    pub max_players: u8,
    /// Money each player starts with.
    pub starting_money: u32,
    /// Size of the shared life pool.
    pub starting_lives: i32,
    /// Clearing this wave wins the game (unless endless).
    pub victory_wave: u32,
    /// Endless games never reach victory and keep scaling past the table.
    pub endless: bool,
    /// When enabled every player receives the full wave income pot.
    pub money_sharing: bool,
    /// Seconds between wave completion and the automatic next start.
    pub auto_start_seconds: f64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_players: 4,
            starting_money: 30,
            starting_lives: 50,
            victory_wave: 40,
            endless: false,
            money_sharing: false,
            auto_start_seconds: 30.0,
        }
    }
}

/// Scalar modifiers applied by external game modes such as daily challenges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameModifiers {
    /// Multiplier on every spawned enemy's health.
    pub enemy_health: f64,
    /// Multiplier on every spawned enemy's movement speed.
    pub enemy_speed: f64,
    /// Multiplier on wave completion income.
    pub income: f64,
    /// Multiplier on tower purchase and upgrade costs.
    pub tower_cost: f64,
    /// Mutator list forced onto every eligible wave, replacing random rolls.
    pub forced_mutators: Option<Vec<WaveMutator>>,
}

impl Default for GameModifiers {
    fn default() -> Self {
        Self {
            enemy_health: 1.0,
            enemy_speed: 1.0,
            income: 1.0,
            tower_cost: 1.0,
            forced_mutators: None,
        }
    }
}

/// One (enemy kind, count) pair inside a wave composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveEntry {
    /// Kind of enemy to spawn.
    pub kind: EnemyKind,
    /// Number of enemies of this kind.
    pub count: u32,
}

/// A single wave's composition, modifiers, and spawn progress.
#[derive(Clone, Debug, PartialEq)]
pub struct Wave {
    /// Monotonically increasing wave number, starting at 1.
    pub number: u32,
    /// Name of the set-piece encounter, if this wave has one.
    pub name: Option<String>,
    /// Descriptive tags such as `boss` or `air`.
    pub tags: Vec<String>,
    /// Mutators applied to this wave.
    pub mutators: Vec<WaveMutator>,
    /// Ordered composition; enemies spawn entry by entry.
    pub entries: Vec<WaveEntry>,
    /// Multiplier on each enemy's base health.
    pub health_multiplier: f64,
    /// Multiplier on each enemy's base speed.
    pub speed_multiplier: f64,
    /// Multiplier on each enemy's bounty.
    pub bounty_multiplier: f64,
    /// Extra health regeneration as a fraction of max health per second.
    pub regen_bonus: f64,
    /// Extra armor granted by shield-style mutators.
    pub armor_bonus: f64,
    /// Extra magic resistance granted by shield-style mutators.
    pub resist_bonus: f64,
    /// Seconds between consecutive spawns.
    pub spawn_interval: f64,
    /// Number of enemies already spawned from this wave.
    pub spawn_index: u32,
    /// Set once every enemy in the composition has spawned.
    pub completed: bool,
}

impl Wave {
    /// Total number of enemies this wave will spawn.
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.entries.iter().map(|entry| entry.count).sum()
    }

    /// Enemy kind at the provided flattened spawn position.
    #[must_use]
    pub fn kind_at(&self, index: u32) -> Option<EnemyKind> {
        let mut remaining = index;
        for entry in &self.entries {
            if remaining < entry.count {
                return Some(entry.kind);
            }
            remaining -= entry.count;
        }
        None
    }

    /// Reports whether this wave is tagged as a boss encounter.
    #[must_use]
    pub fn is_boss(&self) -> bool {
        self.tags.iter().any(|tag| tag == "boss")
    }
}

/// Per-player statistics reported when a game ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    /// Identifier of the player.
    pub player: PlayerId,
    /// Display name of the player.
    pub name: String,
    /// Enemies this player's towers and abilities killed.
    pub kills: u32,
    /// Enemies that leaked while this player was in the game.
    pub leaks: u32,
    /// Money the player held when the game ended.
    pub money: u32,
}

/// Events drained from the game loop after each tick.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The occupancy grid changed and enemy paths moved.
    PathChanged {
        /// Grid version after the change.
        version: u64,
        /// Simplified waypoint path from spawn to end.
        waypoints: Vec<CellCoord>,
    },
    /// A new wave began spawning.
    WaveStarted {
        /// Number of the wave that started.
        wave_number: u32,
        /// Name of the encounter, if any.
        name: Option<String>,
        /// Total enemies the wave will spawn.
        enemy_total: u32,
        /// Mutators applied to the wave.
        mutators: Vec<WaveMutator>,
    },
    /// The active wave finished and income was paid out.
    WaveCompleted {
        /// Number of the wave that completed.
        wave_number: u32,
        /// Income paid into the economy for this wave.
        income: u32,
        /// Total interest paid across all players.
        interest: u32,
        /// Whether this wave awarded lumber.
        lumber_awarded: bool,
    },
    /// A governor ability resolved.
    AbilityUsed {
        /// Player that activated the ability.
        player: PlayerId,
        /// Ability that resolved.
        ability: Ability,
    },
    /// The game ended in defeat or victory.
    GameOver {
        /// True when the victory wave was cleared.
        victory: bool,
        /// Final statistics for every player.
        summaries: Vec<PlayerSummary>,
    },
    /// The game state was reset to a fresh lobby.
    GameReset,
}

/// Expected, recoverable reasons a command is rejected.
///
/// Every variant renders a human-readable reason for the host to surface as
/// UI feedback; none of these conditions aborts the simulation.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Rejection {
    /// The player cannot afford the requested purchase.
    #[error("not enough money: need {needed}, have {have}")]
    InsufficientMoney {
        /// Money required by the purchase.
        needed: u32,
        /// Money the player currently holds.
        have: u32,
    },
    /// The player cannot afford the requested tech purchase.
    #[error("not enough lumber: need {needed}, have {have}")]
    InsufficientLumber {
        /// Lumber required by the purchase.
        needed: u32,
        /// Lumber the player currently holds.
        have: u32,
    },
    /// Blocking the cell would disconnect spawn from exit.
    #[error("blocking cell ({column}, {row}) would cut off the maze")]
    PathBlocked {
        /// Column of the rejected cell.
        column: u32,
        /// Row of the rejected cell.
        row: u32,
    },
    /// The cell is out of bounds, reserved, or already occupied.
    #[error("cell ({column}, {row}) is not placeable")]
    InvalidCell {
        /// Column of the rejected cell.
        column: u32,
        /// Row of the rejected cell.
        row: u32,
    },
    /// The governor ability has not finished cooling down.
    #[error("ability on cooldown for another {remaining:.1}s")]
    CooldownActive {
        /// Seconds until the ability is ready.
        remaining: f64,
    },
    /// Manual wave starts are rate limited.
    #[error("manual start on cooldown for another {remaining:.1}s")]
    ManualStartCooldown {
        /// Seconds until the next manual start is allowed.
        remaining: f64,
    },
    /// The command is not valid in the current phase.
    #[error("not allowed while the game is in the {phase:?} phase")]
    WrongPhase {
        /// Phase the game was in when the command arrived.
        phase: Phase,
    },
    /// No player with the provided identifier exists.
    #[error("unknown player {0:?}")]
    UnknownPlayer(PlayerId),
    /// No tower with the provided identifier exists.
    #[error("unknown tower {0:?}")]
    UnknownTower(TowerId),
    /// The tower belongs to a different player.
    #[error("tower belongs to another player")]
    NotOwner,
    /// The tower is already at its maximum level.
    #[error("tower is already at max level")]
    MaxLevel,
    /// Ultimate towers require the unlocking tech.
    #[error("ultimate towers require the Ultimate Mastery tech")]
    UltimateLocked,
    /// The tech stack is already full.
    #[error("tech is already at max stacks")]
    MaxStacks,
    /// The player has not chosen a governor yet.
    #[error("no governor selected")]
    NoGovernor,
    /// The lobby already holds the maximum number of players.
    #[error("game is full")]
    GameFull,
    /// Not every player is ready to start.
    #[error("all players must pick a governor and ready up")]
    NotReady,
    /// Another vote is currently being held.
    #[error("a vote is already in progress")]
    VoteInProgress,
    /// There is no vote to cast on or resolve.
    #[error("no vote in progress")]
    NoVote,
    /// The funding request does not exist.
    #[error("unknown funding request {0}")]
    UnknownFunding(u32),
    /// A zero or otherwise nonsensical amount was supplied.
    #[error("invalid amount")]
    InvalidAmount,
    /// The enemy kind cannot be sent as a creep.
    #[error("that enemy kind cannot be sent")]
    UnsendableCreep,
    /// The ability needs a target point but none was provided.
    #[error("ability requires a target location")]
    MissingTarget,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn ids_round_trip_through_bincode() {
        assert_round_trip(&PlayerId::new(3));
        assert_round_trip(&TowerId::new(42));
        assert_round_trip(&EnemyId::new(7));
        assert_round_trip(&ProjectileId::new(9));
    }

    #[test]
    fn cell_coord_round_trips_through_bincode() {
        assert_round_trip(&CellCoord::new(5, 7));
    }

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn phase_serializes_as_snake_case() {
        let json = serde_json::to_string(&Phase::WaveActive).expect("serialize");
        assert_eq!(json, "\"wave_active\"");
    }

    #[test]
    fn interest_is_monotonic_in_wave_up_to_cap() {
        let money = 10_000;
        let mut previous = 0;
        for wave in 1..=60 {
            let interest = calculate_interest(money, INTEREST_RATE, wave);
            assert!(interest >= previous);
            assert!(interest <= INTEREST_CAP_BASE + wave * INTEREST_CAP_PER_WAVE);
            previous = interest;
        }
    }

    #[test]
    fn interest_is_floored_and_capped() {
        assert_eq!(calculate_interest(19, INTEREST_RATE, 1), 0);
        assert_eq!(calculate_interest(200, INTEREST_RATE, 1), 10);
        assert_eq!(calculate_interest(1_000_000, INTEREST_RATE, 2), 70);
    }

    #[test]
    fn lumber_awarded_on_every_fifth_wave() {
        assert!(should_award_lumber(5));
        assert!(should_award_lumber(10));
        assert!(!should_award_lumber(3));
        assert!(!should_award_lumber(0));
    }

    #[test]
    fn wave_kind_lookup_walks_entries_in_order() {
        let wave = Wave {
            number: 1,
            name: None,
            tags: Vec::new(),
            mutators: Vec::new(),
            entries: vec![
                WaveEntry {
                    kind: EnemyKind::Runt,
                    count: 2,
                },
                WaveEntry {
                    kind: EnemyKind::Grunt,
                    count: 1,
                },
            ],
            health_multiplier: 1.0,
            speed_multiplier: 1.0,
            bounty_multiplier: 1.0,
            regen_bonus: 0.0,
            armor_bonus: 0.0,
            resist_bonus: 0.0,
            spawn_interval: 0.8,
            spawn_index: 0,
            completed: false,
        };
        assert_eq!(wave.total_count(), 3);
        assert_eq!(wave.kind_at(0), Some(EnemyKind::Runt));
        assert_eq!(wave.kind_at(1), Some(EnemyKind::Runt));
        assert_eq!(wave.kind_at(2), Some(EnemyKind::Grunt));
        assert_eq!(wave.kind_at(3), None);
    }

    #[test]
    fn rejection_renders_a_reason_string() {
        let rejection = Rejection::InsufficientMoney {
            needed: 10,
            have: 4,
        };
        assert_eq!(rejection.to_string(), "not enough money: need 10, have 4");
    }
}
