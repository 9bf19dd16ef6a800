//! Versioned wire contract for full-state snapshots.
//!
//! A [`Snapshot`] is an explicit plain-data mirror of the authoritative
//! state, not a reflection of internal structures. Field names are part of
//! the contract consumed by the host's replication and replay layers, so
//! they are spelled out here with camelCase renames and never derived from
//! internals. Entity kinds travel as strings; a peer running a newer
//! catalog can ship a kind this build does not know, and reconstruction
//! skips it instead of failing.
//!
//! All duration-like fields hold *remaining* seconds rather than absolute
//! deadlines, so a snapshot is meaningful on a peer whose simulation clock
//! starts from a different origin.

use serde::{Deserialize, Serialize};

use crate::{
    CellCoord, DamageKind, EnemyId, GameModifiers, GameSettings, Phase, PlayerId, Position,
    ProjectileId, TargetingMode, TowerId,
};

/// Full-state snapshot used for host migration and replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Wire contract revision that produced this snapshot.
    pub snapshot_version: u32,
    /// Lifecycle phase at capture time.
    pub phase: Phase,
    /// Number of the last started wave, zero before the first.
    pub wave_number: u32,
    /// Remaining shared lives.
    pub shared_lives: i32,
    /// Seconds until the next wave auto-starts, if a countdown is running.
    pub next_wave_countdown: Option<f64>,
    /// Seconds until another manual wave start is allowed.
    pub manual_start_cooldown: f64,
    /// Every player, sorted by id.
    pub players: Vec<PlayerState>,
    /// Every tower, sorted by id.
    pub towers: Vec<TowerState>,
    /// Every live enemy, sorted by id.
    pub enemies: Vec<EnemyState>,
    /// Every in-flight projectile, sorted by id.
    pub projectiles: Vec<ProjectileState>,
    /// The active wave, if one is spawning or still has enemies alive.
    pub current_wave: Option<WaveState>,
    /// Lobby settings in force.
    pub settings: GameSettings,
    /// Grid geometry and the current path.
    pub map: MapState,
    /// Simulation time at capture, in milliseconds.
    pub timestamp: u64,
    /// Mode modifiers, present only when a mode applied any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<GameModifiers>,
    /// Open funding requests, present only when any exist.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub funding: Vec<FundingState>,
}

/// Wire form of one player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    /// Player identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Chosen governor's wire name, if one was picked.
    pub governor: Option<String>,
    /// Lobby ready flag.
    pub ready: bool,
    /// Money on hand.
    pub money: u32,
    /// Lumber on hand.
    pub lumber: u32,
    /// Owned tech stacks, sorted by tech wire name.
    pub tech: Vec<TechStackState>,
    /// Seconds until the governor ability is ready again.
    pub ability_cooldown: f64,
    /// Timed damage buff, if one is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_buff: Option<TimedEffectState>,
    /// Enemies killed by this player's towers and abilities.
    pub kills: u32,
    /// Enemies leaked while this player was in the game.
    pub leaks: u32,
}

/// One owned tech stack on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechStackState {
    /// Tech wire name.
    pub id: String,
    /// Stacks owned.
    pub stacks: u32,
}

/// A magnitude with its remaining duration, used for buffs and debuffs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedEffectState {
    /// Strength of the effect.
    pub magnitude: f64,
    /// Seconds left before the effect expires.
    pub remaining: f64,
}

/// Wire form of one tower.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TowerState {
    /// Tower identifier.
    pub id: TowerId,
    /// Owning player.
    pub owner: PlayerId,
    /// Tower kind's wire name.
    pub kind: String,
    /// Occupied grid cell.
    pub cell: CellCoord,
    /// Upgrade level, 1 through the maximum.
    pub level: u8,
    /// Active targeting policy.
    pub targeting: TargetingMode,
    /// Seconds until the tower may fire again.
    pub cooldown: f64,
    /// Whether an upgrade is queued for the end of the wave.
    pub queued_upgrade: bool,
}

/// Wire form of one live enemy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyState {
    /// Enemy identifier.
    pub id: EnemyId,
    /// Enemy kind's wire name.
    pub kind: String,
    /// Current health.
    pub health: f64,
    /// Health the enemy spawned with, after wave scaling.
    pub max_health: f64,
    /// Continuous position in cell units.
    pub position: Position,
    /// Index of the next path cell the enemy walks toward.
    pub path_index: usize,
    /// Movement speed after wave scaling, in cells per second.
    pub speed: f64,
    /// Physical damage reduction after wave bonuses.
    pub armor: f64,
    /// Magic damage reduction after wave bonuses.
    pub magic_resist: f64,
    /// Bounty after wave scaling.
    pub bounty: u32,
    /// Health regenerated per second after wave bonuses.
    pub regen: f64,
    /// Active slow, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow: Option<TimedEffectState>,
    /// Active poison damage per second with its remaining duration, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poison: Option<TimedEffectState>,
    /// Seconds of stun remaining.
    pub stun_remaining: f64,
    /// Active armor debuff, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor_debuff: Option<TimedEffectState>,
}

/// Wire form of a projectile's baked damage payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadState {
    /// Damage before the target's reduction.
    pub amount: f64,
    /// Whether armor or magic resistance reduces the hit.
    pub kind: DamageKind,
    /// Splash radius and fraction, if the shot splashes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splash: Option<SplashState>,
    /// Chain jump parameters, if the shot chains.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<ChainState>,
    /// Slow applied on impact, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow: Option<TimedEffectState>,
    /// Poison applied on impact, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poison: Option<TimedEffectState>,
    /// Stun seconds applied on impact, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stun: Option<f64>,
    /// Armor debuff applied on impact, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor_debuff: Option<TimedEffectState>,
    /// Health fraction at or below which the target dies instantly.
    pub execute_threshold: f64,
    /// Path cells the target is pushed back on impact.
    pub teleport_back: u32,
}

/// Splash parameters on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplashState {
    /// Radius around the impact, in cells.
    pub radius: f64,
    /// Fraction of the base damage dealt to secondary targets.
    pub factor: f64,
}

/// Chain parameters on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainState {
    /// Maximum additional jumps.
    pub jumps: u32,
    /// Geometric damage decay per jump.
    pub decay: f64,
    /// Search radius for each jump, in cells.
    pub radius: f64,
}

/// Wire form of one in-flight projectile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileState {
    /// Projectile identifier.
    pub id: ProjectileId,
    /// Player whose tower fired the shot.
    pub owner: PlayerId,
    /// Enemy the shot homes toward.
    pub target: EnemyId,
    /// Current position in cell units.
    pub position: Position,
    /// Last known target position, flown to if the target died.
    pub target_point: Position,
    /// Travel speed in cells per second.
    pub speed: f64,
    /// Baked damage payload.
    pub payload: PayloadState,
}

/// Wire form of the active wave.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveState {
    /// Wave number.
    pub number: u32,
    /// Encounter name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Descriptive tags such as `boss` or `air`.
    pub tags: Vec<String>,
    /// Mutator wire names applied to this wave.
    pub mutators: Vec<String>,
    /// Ordered composition entries.
    pub entries: Vec<WaveEntryState>,
    /// Health multiplier on each spawn.
    pub health_multiplier: f64,
    /// Speed multiplier on each spawn.
    pub speed_multiplier: f64,
    /// Bounty multiplier on each spawn.
    pub bounty_multiplier: f64,
    /// Extra regeneration as a fraction of max health per second.
    pub regen_bonus: f64,
    /// Extra armor on each spawn.
    pub armor_bonus: f64,
    /// Extra magic resistance on each spawn.
    pub resist_bonus: f64,
    /// Seconds between consecutive spawns.
    pub spawn_interval: f64,
    /// Enemies already spawned.
    pub spawn_index: u32,
    /// Seconds until the next spawn is due.
    pub spawn_timer: f64,
    /// Whether every enemy in the composition has spawned.
    pub completed: bool,
}

/// One composition entry on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveEntryState {
    /// Enemy kind's wire name.
    pub kind: String,
    /// Number of enemies of this kind.
    pub count: u32,
}

/// Grid geometry and path data on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapState {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Simplified waypoint path from spawn to end.
    pub path: Vec<CellCoord>,
    /// Monotonic path version counter.
    pub path_version: u64,
    /// Every cell the full path crosses, in walk order.
    pub path_cells: Vec<CellCoord>,
    /// Spawn cell.
    pub spawn: CellCoord,
    /// Exit cell.
    pub end: CellCoord,
    /// Ordered intermediate checkpoints.
    pub checkpoints: Vec<CellCoord>,
}

/// Wire form of one open funding request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingState {
    /// Request identifier.
    pub id: u32,
    /// Player who opened the request.
    pub requester: PlayerId,
    /// Short description shown to contributors.
    pub label: String,
    /// Target amount.
    pub goal: u32,
    /// Amount contributed so far.
    pub contributed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SNAPSHOT_VERSION;

    fn minimal_snapshot() -> Snapshot {
        Snapshot {
            snapshot_version: SNAPSHOT_VERSION,
            phase: Phase::Lobby,
            wave_number: 0,
            shared_lives: 50,
            next_wave_countdown: None,
            manual_start_cooldown: 0.0,
            players: vec![PlayerState {
                id: PlayerId::new(0),
                name: "host".to_owned(),
                governor: Some("pyro".to_owned()),
                ready: true,
                money: 30,
                lumber: 0,
                tech: Vec::new(),
                ability_cooldown: 0.0,
                damage_buff: None,
                kills: 0,
                leaks: 0,
            }],
            towers: Vec::new(),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            current_wave: None,
            settings: GameSettings::default(),
            map: MapState {
                width: 20,
                height: 15,
                path: vec![CellCoord::new(0, 7), CellCoord::new(19, 7)],
                path_version: 1,
                path_cells: Vec::new(),
                spawn: CellCoord::new(0, 7),
                end: CellCoord::new(19, 7),
                checkpoints: Vec::new(),
            },
            timestamp: 0,
            modifiers: None,
            funding: Vec::new(),
        }
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let json = serde_json::to_string(&minimal_snapshot()).expect("serialize");
        assert!(json.contains("\"waveNumber\""));
        assert!(json.contains("\"sharedLives\""));
        assert!(json.contains("\"manualStartCooldown\""));
        assert!(json.contains("\"pathVersion\""));
        assert!(json.contains("\"pathCells\""));
        assert!(json.contains("\"currentWave\""));
    }

    #[test]
    fn absent_optional_mode_fields_stay_off_the_wire() {
        let json = serde_json::to_string(&minimal_snapshot()).expect("serialize");
        assert!(!json.contains("\"modifiers\""));
        assert!(!json.contains("\"funding\""));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = minimal_snapshot();
        let json = serde_json::to_string(&snapshot).expect("serialize");
        let restored: Snapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn unknown_entity_kind_survives_decoding() {
        let mut snapshot = minimal_snapshot();
        snapshot.enemies.push(EnemyState {
            id: EnemyId::new(1),
            kind: "chronovore".to_owned(),
            health: 10.0,
            max_health: 10.0,
            position: Position::new(0.5, 7.5),
            path_index: 0,
            speed: 1.0,
            armor: 0.0,
            magic_resist: 0.0,
            bounty: 1,
            regen: 0.0,
            slow: None,
            poison: None,
            stun_remaining: 0.0,
            armor_debuff: None,
        });
        let json = serde_json::to_string(&snapshot).expect("serialize");
        let restored: Snapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored.enemies[0].kind, "chronovore");
    }
}
