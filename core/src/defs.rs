//! Static definition tables for towers, enemies, governors, tech, and wave
//! mutators.
//!
//! Every kind is a closed enum with a `def()` accessor into a `'static`
//! table, so an invalid key is unrepresentable rather than a runtime lookup
//! failure. The `as_str`/`parse` pairs exist only for the wire snapshot,
//! where kinds travel as strings for cross-version tolerance.

use serde::{Deserialize, Serialize};

use crate::{DamageKind, Element};

/// Splash damage parameters attached to a tower.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplashDef {
    /// Radius around the impact point, in cells.
    pub radius: f64,
    /// Fraction of the base damage dealt to secondary targets.
    pub factor: f64,
}

/// Chain lightning parameters attached to a tower.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChainDef {
    /// Maximum number of additional jumps after the primary target.
    pub jumps: u32,
    /// Geometric damage decay per jump.
    pub decay: f64,
    /// Search radius for the next jump, in cells.
    pub radius: f64,
}

/// A magnitude applied for a fixed duration, used by slows and debuffs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimedMagnitude {
    /// Strength of the effect as a fraction.
    pub magnitude: f64,
    /// Seconds the effect lasts.
    pub duration: f64,
}

/// Poison parameters attached to a tower.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoisonDef {
    /// Damage dealt per poison tick.
    pub dps: f64,
    /// Seconds the poison lasts.
    pub duration: f64,
}

/// Aura parameters for towers that boost their neighbors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AuraDef {
    /// Radius of the aura, in cells.
    pub radius: f64,
    /// Damage bonus added to each tower inside the aura.
    pub bonus: f64,
}

/// Static definition of a tower kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerDef {
    /// Money cost to build the tower.
    pub cost: u32,
    /// Base damage per shot.
    pub damage: f64,
    /// Base targeting range, in cells.
    pub range: f64,
    /// Shots per second; zero means the tower never fires.
    pub fire_rate: f64,
    /// Whether shots are reduced by armor or by magic resistance.
    pub damage_kind: DamageKind,
    /// Projectile travel speed, in cells per second.
    pub projectile_speed: f64,
    /// Splash damage dealt around the impact, if any.
    pub splash: Option<SplashDef>,
    /// Chain lightning jumps after the impact, if any.
    pub chain: Option<ChainDef>,
    /// Slow applied to the primary target, if any.
    pub slow: Option<TimedMagnitude>,
    /// Poison applied to the primary target, if any.
    pub poison: Option<PoisonDef>,
    /// Stun duration applied to the primary target, if any.
    pub stun: Option<f64>,
    /// Armor debuff applied to the primary target, if any.
    pub armor_debuff: Option<TimedMagnitude>,
    /// Targets at or below this health fraction die instantly; zero disables.
    pub execute_threshold: f64,
    /// Path cells the primary target is pushed back on impact.
    pub teleport_back: u32,
    /// Aura granted to nearby towers, if any.
    pub aura: Option<AuraDef>,
    /// Ultimate towers require the unlocking tech to build.
    pub ultimate: bool,
}

const fn plain_tower(cost: u32, damage: f64, range: f64, fire_rate: f64) -> TowerDef {
    TowerDef {
        cost,
        damage,
        range,
        fire_rate,
        damage_kind: DamageKind::Physical,
        projectile_speed: 12.0,
        splash: None,
        chain: None,
        slow: None,
        poison: None,
        stun: None,
        armor_debuff: None,
        execute_threshold: 0.0,
        teleport_back: 0,
        aura: None,
        ultimate: false,
    }
}

/// Types of towers that can be constructed in the maze.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TowerKind {
    /// Cheap single-target opener.
    Arrow,
    /// Slow splash-damage artillery.
    Cannon,
    /// Slowing magic tower.
    Frost,
    /// Poison-applying tower.
    Venom,
    /// Chain-lightning tower.
    Tesla,
    /// Non-attacking aura source.
    Banner,
    /// Long-range high-damage shot.
    Sniper,
    /// Ultimate: executes low-health targets.
    Reaper,
    /// Ultimate: splash plus teleport-back beam.
    Prism,
}

impl TowerKind {
    /// Every tower kind in definition order.
    pub const ALL: [TowerKind; 9] = [
        TowerKind::Arrow,
        TowerKind::Cannon,
        TowerKind::Frost,
        TowerKind::Venom,
        TowerKind::Tesla,
        TowerKind::Banner,
        TowerKind::Sniper,
        TowerKind::Reaper,
        TowerKind::Prism,
    ];

    /// Static definition for this tower kind.
    #[must_use]
    pub const fn def(self) -> &'static TowerDef {
        match self {
            TowerKind::Arrow => &ARROW,
            TowerKind::Cannon => &CANNON,
            TowerKind::Frost => &FROST,
            TowerKind::Venom => &VENOM,
            TowerKind::Tesla => &TESLA,
            TowerKind::Banner => &BANNER,
            TowerKind::Sniper => &SNIPER,
            TowerKind::Reaper => &REAPER,
            TowerKind::Prism => &PRISM,
        }
    }

    /// Wire name of this tower kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TowerKind::Arrow => "arrow",
            TowerKind::Cannon => "cannon",
            TowerKind::Frost => "frost",
            TowerKind::Venom => "venom",
            TowerKind::Tesla => "tesla",
            TowerKind::Banner => "banner",
            TowerKind::Sniper => "sniper",
            TowerKind::Reaper => "reaper",
            TowerKind::Prism => "prism",
        }
    }

    /// Parses a wire name back into a tower kind.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

const ARROW: TowerDef = plain_tower(10, 8.0, 3.0, 1.2);

const CANNON: TowerDef = TowerDef {
    splash: Some(SplashDef {
        radius: 1.5,
        factor: 0.5,
    }),
    projectile_speed: 8.0,
    ..plain_tower(25, 14.0, 2.8, 0.7)
};

const FROST: TowerDef = TowerDef {
    damage_kind: DamageKind::Magic,
    slow: Some(TimedMagnitude {
        magnitude: 0.3,
        duration: 2.0,
    }),
    ..plain_tower(20, 6.0, 3.0, 1.0)
};

const VENOM: TowerDef = TowerDef {
    poison: Some(PoisonDef {
        dps: 4.0,
        duration: 4.0,
    }),
    ..plain_tower(20, 5.0, 3.0, 1.1)
};

const TESLA: TowerDef = TowerDef {
    damage_kind: DamageKind::Magic,
    chain: Some(ChainDef {
        jumps: 3,
        decay: 0.65,
        radius: 3.0,
    }),
    projectile_speed: 20.0,
    ..plain_tower(40, 12.0, 3.2, 0.9)
};

const BANNER: TowerDef = TowerDef {
    aura: Some(AuraDef {
        radius: 2.5,
        bonus: 0.15,
    }),
    ..plain_tower(30, 0.0, 0.0, 0.0)
};

const SNIPER: TowerDef = TowerDef {
    projectile_speed: 30.0,
    armor_debuff: Some(TimedMagnitude {
        magnitude: 0.2,
        duration: 3.0,
    }),
    ..plain_tower(50, 40.0, 6.0, 0.35)
};

const REAPER: TowerDef = TowerDef {
    damage_kind: DamageKind::Magic,
    execute_threshold: 0.15,
    ultimate: true,
    ..plain_tower(100, 30.0, 3.5, 0.8)
};

const PRISM: TowerDef = TowerDef {
    damage_kind: DamageKind::Magic,
    splash: Some(SplashDef {
        radius: 1.5,
        factor: 0.4,
    }),
    teleport_back: 4,
    projectile_speed: 16.0,
    ultimate: true,
    ..plain_tower(120, 25.0, 4.0, 0.9)
};

/// Death-split behavior for enemies that burst into smaller copies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitDef {
    /// Kind of enemy spawned at the death location.
    pub kind: EnemyKind,
    /// Number of copies spawned.
    pub count: u32,
}

/// Static definition of an enemy kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyDef {
    /// Base health before wave scaling.
    pub health: f64,
    /// Base movement speed in cells per second.
    pub speed: f64,
    /// Fraction of physical damage absorbed.
    pub armor: f64,
    /// Fraction of magic damage absorbed.
    pub magic_resist: f64,
    /// Money paid to the killer.
    pub bounty: u32,
    /// Lives drained from the shared pool on a leak.
    pub lives_cost: u32,
    /// Health regenerated per second.
    pub regen: f64,
    /// Flying enemies ignore the maze and fly the checkpoint line.
    pub flying: bool,
    /// Copies spawned on death, if any.
    pub split: Option<SplitDef>,
    /// Money cost to send this kind as a creep; `None` forbids sending.
    pub send_cost: Option<u32>,
}

const fn plain_enemy(health: f64, speed: f64, bounty: u32, send_cost: u32) -> EnemyDef {
    EnemyDef {
        health,
        speed,
        armor: 0.0,
        magic_resist: 0.0,
        bounty,
        lives_cost: 1,
        regen: 0.0,
        flying: false,
        split: None,
        send_cost: Some(send_cost),
    }
}

/// Types of enemies that march through the maze.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Weakest fodder unit.
    Runt,
    /// Standard line infantry.
    Grunt,
    /// Fast but fragile.
    Runner,
    /// Heavy physical-damage absorber.
    Armored,
    /// Heavy magic-damage absorber.
    Shielded,
    /// Ignores the maze entirely.
    Flyer,
    /// Recovers health while alive.
    Regenerator,
    /// Splits into broodlings on death.
    Splitter,
    /// Spawn of a dead splitter.
    Broodling,
    /// Set-piece encounter unit.
    Boss,
}

impl EnemyKind {
    /// Every enemy kind in definition order.
    pub const ALL: [EnemyKind; 10] = [
        EnemyKind::Runt,
        EnemyKind::Grunt,
        EnemyKind::Runner,
        EnemyKind::Armored,
        EnemyKind::Shielded,
        EnemyKind::Flyer,
        EnemyKind::Regenerator,
        EnemyKind::Splitter,
        EnemyKind::Broodling,
        EnemyKind::Boss,
    ];

    /// Static definition for this enemy kind.
    #[must_use]
    pub const fn def(self) -> &'static EnemyDef {
        match self {
            EnemyKind::Runt => &RUNT,
            EnemyKind::Grunt => &GRUNT,
            EnemyKind::Runner => &RUNNER,
            EnemyKind::Armored => &ARMORED,
            EnemyKind::Shielded => &SHIELDED,
            EnemyKind::Flyer => &FLYER,
            EnemyKind::Regenerator => &REGENERATOR,
            EnemyKind::Splitter => &SPLITTER,
            EnemyKind::Broodling => &BROODLING,
            EnemyKind::Boss => &BOSS,
        }
    }

    /// Wire name of this enemy kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EnemyKind::Runt => "runt",
            EnemyKind::Grunt => "grunt",
            EnemyKind::Runner => "runner",
            EnemyKind::Armored => "armored",
            EnemyKind::Shielded => "shielded",
            EnemyKind::Flyer => "flyer",
            EnemyKind::Regenerator => "regenerator",
            EnemyKind::Splitter => "splitter",
            EnemyKind::Broodling => "broodling",
            EnemyKind::Boss => "boss",
        }
    }

    /// Parses a wire name back into an enemy kind.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

const RUNT: EnemyDef = plain_enemy(20.0, 1.4, 2, 4);
const GRUNT: EnemyDef = EnemyDef {
    armor: 0.1,
    ..plain_enemy(45.0, 1.1, 4, 8)
};
const RUNNER: EnemyDef = plain_enemy(28.0, 2.0, 3, 6);
const ARMORED: EnemyDef = EnemyDef {
    armor: 0.5,
    ..plain_enemy(70.0, 0.9, 6, 14)
};
const SHIELDED: EnemyDef = EnemyDef {
    magic_resist: 0.5,
    ..plain_enemy(60.0, 1.0, 6, 14)
};
const FLYER: EnemyDef = EnemyDef {
    magic_resist: 0.2,
    flying: true,
    ..plain_enemy(40.0, 1.3, 5, 12)
};
const REGENERATOR: EnemyDef = EnemyDef {
    armor: 0.1,
    magic_resist: 0.1,
    regen: 2.0,
    ..plain_enemy(80.0, 0.9, 7, 16)
};
const SPLITTER: EnemyDef = EnemyDef {
    split: Some(SplitDef {
        kind: EnemyKind::Broodling,
        count: 2,
    }),
    ..plain_enemy(55.0, 1.0, 5, 15)
};
const BROODLING: EnemyDef = EnemyDef {
    send_cost: None,
    ..plain_enemy(15.0, 1.6, 1, 0)
};
const BOSS: EnemyDef = EnemyDef {
    armor: 0.3,
    magic_resist: 0.3,
    lives_cost: 5,
    regen: 1.0,
    send_cost: None,
    ..plain_enemy(600.0, 0.7, 60, 0)
};

/// Effect resolved when a governor ability activates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AbilityEffect {
    /// Damage every enemy within a radius of the target point.
    PointDamage {
        /// Magic damage dealt before resistances.
        damage: f64,
        /// Radius around the target point, in cells.
        radius: f64,
    },
    /// Slow and stun every enemy within a radius of the target point.
    PointFreeze {
        /// Radius around the target point, in cells.
        radius: f64,
        /// Slow fraction applied.
        slow: f64,
        /// Seconds the slow lasts.
        slow_duration: f64,
        /// Seconds the stun lasts.
        stun: f64,
    },
    /// Strike the highest-health enemies anywhere on the map.
    GlobalNuke {
        /// Magic damage dealt to each struck enemy.
        damage: f64,
        /// Maximum number of enemies struck.
        targets: u32,
    },
    /// Instantly kill every enemy at or below a health fraction.
    GlobalExecute {
        /// Health fraction at or below which enemies die.
        threshold: f64,
    },
    /// Stun every enemy on the map.
    GlobalStun {
        /// Seconds the stun lasts.
        duration: f64,
    },
    /// Restore shared lives and grant a timed damage buff to all players.
    Rally {
        /// Lives restored to the shared pool.
        lives: i32,
        /// Damage multiplier granted while the buff lasts.
        damage_mult: f64,
        /// Seconds the buff lasts.
        duration: f64,
    },
}

/// Static definition of a governor ability.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AbilityDef {
    /// Seconds between activations.
    pub cooldown: f64,
    /// Whether the ability needs a target point.
    pub targeted: bool,
    /// Effect resolved on activation.
    pub effect: AbilityEffect,
}

/// Named governor abilities, one per governor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    /// Pyro's point-blast nuke.
    FlameBurst,
    /// Cryo's point slow-and-stun.
    DeepFreeze,
    /// Storm's global multi-target nuke.
    ChainTempest,
    /// Umbra's global low-health execute.
    Cull,
    /// Terra's global stun.
    Quake,
    /// Lumen's heal-and-buff rally.
    Sanctify,
}

impl Ability {
    /// Static definition for this ability.
    #[must_use]
    pub const fn def(self) -> &'static AbilityDef {
        match self {
            Ability::FlameBurst => &FLAME_BURST,
            Ability::DeepFreeze => &DEEP_FREEZE,
            Ability::ChainTempest => &CHAIN_TEMPEST,
            Ability::Cull => &CULL,
            Ability::Quake => &QUAKE,
            Ability::Sanctify => &SANCTIFY,
        }
    }
}

const FLAME_BURST: AbilityDef = AbilityDef {
    cooldown: 45.0,
    targeted: true,
    effect: AbilityEffect::PointDamage {
        damage: 150.0,
        radius: 2.5,
    },
};

const DEEP_FREEZE: AbilityDef = AbilityDef {
    cooldown: 45.0,
    targeted: true,
    effect: AbilityEffect::PointFreeze {
        radius: 2.5,
        slow: 0.5,
        slow_duration: 4.0,
        stun: 1.5,
    },
};

const CHAIN_TEMPEST: AbilityDef = AbilityDef {
    cooldown: 60.0,
    targeted: false,
    effect: AbilityEffect::GlobalNuke {
        damage: 120.0,
        targets: 8,
    },
};

const CULL: AbilityDef = AbilityDef {
    cooldown: 75.0,
    targeted: false,
    effect: AbilityEffect::GlobalExecute { threshold: 0.2 },
};

const QUAKE: AbilityDef = AbilityDef {
    cooldown: 60.0,
    targeted: false,
    effect: AbilityEffect::GlobalStun { duration: 2.0 },
};

const SANCTIFY: AbilityDef = AbilityDef {
    cooldown: 60.0,
    targeted: false,
    effect: AbilityEffect::Rally {
        lives: 3,
        damage_mult: 1.2,
        duration: 10.0,
    },
};

/// Static definition of a governor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GovernorDef {
    /// Element stamped onto every tower the governor's player places.
    pub element: Element,
    /// Passive damage multiplier.
    pub damage_mult: f64,
    /// Passive range multiplier.
    pub range_mult: f64,
    /// Passive cost multiplier.
    pub cost_mult: f64,
    /// Passive interest multiplier.
    pub interest_mult: f64,
    /// Passive bounty multiplier.
    pub bounty_mult: f64,
    /// The governor's single named ability.
    pub ability: Ability,
}

const fn plain_governor(element: Element, ability: Ability) -> GovernorDef {
    GovernorDef {
        element,
        damage_mult: 1.0,
        range_mult: 1.0,
        cost_mult: 1.0,
        interest_mult: 1.0,
        bounty_mult: 1.0,
        ability,
    }
}

/// Elemental factions a player can govern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Governor {
    /// Fire: raw damage.
    Pyro,
    /// Frost: reach.
    Cryo,
    /// Lightning: balanced offense.
    Storm,
    /// Shadow: bounty hunting.
    Umbra,
    /// Earth: cheap construction.
    Terra,
    /// Light: banking.
    Lumen,
}

impl Governor {
    /// Every governor in definition order.
    pub const ALL: [Governor; 6] = [
        Governor::Pyro,
        Governor::Cryo,
        Governor::Storm,
        Governor::Umbra,
        Governor::Terra,
        Governor::Lumen,
    ];

    /// Static definition for this governor.
    #[must_use]
    pub const fn def(self) -> &'static GovernorDef {
        match self {
            Governor::Pyro => &PYRO,
            Governor::Cryo => &CRYO,
            Governor::Storm => &STORM,
            Governor::Umbra => &UMBRA,
            Governor::Terra => &TERRA,
            Governor::Lumen => &LUMEN,
        }
    }

    /// Wire name of this governor.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Governor::Pyro => "pyro",
            Governor::Cryo => "cryo",
            Governor::Storm => "storm",
            Governor::Umbra => "umbra",
            Governor::Terra => "terra",
            Governor::Lumen => "lumen",
        }
    }

    /// Parses a wire name back into a governor.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|governor| governor.as_str() == name)
    }
}

const PYRO: GovernorDef = GovernorDef {
    damage_mult: 1.10,
    ..plain_governor(Element::Fire, Ability::FlameBurst)
};
const CRYO: GovernorDef = GovernorDef {
    range_mult: 1.10,
    ..plain_governor(Element::Frost, Ability::DeepFreeze)
};
const STORM: GovernorDef = GovernorDef {
    damage_mult: 1.05,
    range_mult: 1.05,
    ..plain_governor(Element::Lightning, Ability::ChainTempest)
};
const UMBRA: GovernorDef = GovernorDef {
    bounty_mult: 1.15,
    ..plain_governor(Element::Shadow, Ability::Cull)
};
const TERRA: GovernorDef = GovernorDef {
    cost_mult: 0.90,
    ..plain_governor(Element::Earth, Ability::Quake)
};
const LUMEN: GovernorDef = GovernorDef {
    interest_mult: 1.25,
    ..plain_governor(Element::Light, Ability::Sanctify)
};

/// Static definition of a tech upgrade.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TechDef {
    /// Lumber cost per stack.
    pub lumber_cost: u32,
    /// Maximum stacks a player may own; enforced at purchase time.
    pub max_stacks: u32,
    /// Additive damage bonus per stack.
    pub damage_bonus: f64,
    /// Additive range bonus per stack.
    pub range_bonus: f64,
    /// Additive interest bonus per stack.
    pub interest_bonus: f64,
    /// Additive cost reduction per stack.
    pub cost_reduction: f64,
    /// Whether owning this tech unlocks ultimate towers.
    pub unlocks_ultimate: bool,
}

const fn plain_tech(lumber_cost: u32, max_stacks: u32) -> TechDef {
    TechDef {
        lumber_cost,
        max_stacks,
        damage_bonus: 0.0,
        range_bonus: 0.0,
        interest_bonus: 0.0,
        cost_reduction: 0.0,
        unlocks_ultimate: false,
    }
}

/// Lumber-purchased tech upgrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechId {
    /// Stacking damage bonus.
    SharpenedSteel,
    /// Stacking range bonus.
    KeenSights,
    /// Stacking interest bonus.
    Compounding,
    /// Stacking cost reduction.
    Logistics,
    /// Unlocks ultimate towers.
    UltimateMastery,
}

impl TechId {
    /// Every tech in definition order.
    pub const ALL: [TechId; 5] = [
        TechId::SharpenedSteel,
        TechId::KeenSights,
        TechId::Compounding,
        TechId::Logistics,
        TechId::UltimateMastery,
    ];

    /// Static definition for this tech.
    #[must_use]
    pub const fn def(self) -> &'static TechDef {
        match self {
            TechId::SharpenedSteel => &SHARPENED_STEEL,
            TechId::KeenSights => &KEEN_SIGHTS,
            TechId::Compounding => &COMPOUNDING,
            TechId::Logistics => &LOGISTICS,
            TechId::UltimateMastery => &ULTIMATE_MASTERY,
        }
    }

    /// Wire name of this tech.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TechId::SharpenedSteel => "sharpened_steel",
            TechId::KeenSights => "keen_sights",
            TechId::Compounding => "compounding",
            TechId::Logistics => "logistics",
            TechId::UltimateMastery => "ultimate_mastery",
        }
    }

    /// Parses a wire name back into a tech.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tech| tech.as_str() == name)
    }
}

const SHARPENED_STEEL: TechDef = TechDef {
    damage_bonus: 0.05,
    ..plain_tech(1, 5)
};
const KEEN_SIGHTS: TechDef = TechDef {
    range_bonus: 0.05,
    ..plain_tech(1, 3)
};
const COMPOUNDING: TechDef = TechDef {
    interest_bonus: 0.10,
    ..plain_tech(1, 3)
};
const LOGISTICS: TechDef = TechDef {
    cost_reduction: 0.05,
    ..plain_tech(1, 3)
};
const ULTIMATE_MASTERY: TechDef = TechDef {
    unlocks_ultimate: true,
    ..plain_tech(3, 1)
};

/// Temporary modifiers applied to a single wave's enemies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveMutator {
    /// Enemies move 30% faster.
    Swift,
    /// Enemies have 50% more health.
    Vigorous,
    /// Enemies pay 50% more bounty.
    Gilded,
    /// Twice as many enemies with half health each.
    Swarm,
    /// Enemies regenerate a fraction of max health per second.
    Regenerating,
    /// Enemies gain bonus armor and magic resistance.
    Shielded,
    /// Enemy types are rerolled at random.
    Chaotic,
}

impl WaveMutator {
    /// Every mutator in catalog order.
    pub const ALL: [WaveMutator; 7] = [
        WaveMutator::Swift,
        WaveMutator::Vigorous,
        WaveMutator::Gilded,
        WaveMutator::Swarm,
        WaveMutator::Regenerating,
        WaveMutator::Shielded,
        WaveMutator::Chaotic,
    ];

    /// Wire name of this mutator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            WaveMutator::Swift => "swift",
            WaveMutator::Vigorous => "vigorous",
            WaveMutator::Gilded => "gilded",
            WaveMutator::Swarm => "swarm",
            WaveMutator::Regenerating => "regenerating",
            WaveMutator::Shielded => "shielded",
            WaveMutator::Chaotic => "chaotic",
        }
    }

    /// Parses a wire name back into a mutator.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mutator| mutator.as_str() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in TowerKind::ALL {
            assert_eq!(TowerKind::parse(kind.as_str()), Some(kind));
        }
        for kind in EnemyKind::ALL {
            assert_eq!(EnemyKind::parse(kind.as_str()), Some(kind));
        }
        for governor in Governor::ALL {
            assert_eq!(Governor::parse(governor.as_str()), Some(governor));
        }
        for tech in TechId::ALL {
            assert_eq!(TechId::parse(tech.as_str()), Some(tech));
        }
        for mutator in WaveMutator::ALL {
            assert_eq!(WaveMutator::parse(mutator.as_str()), Some(mutator));
        }
    }

    #[test]
    fn unknown_wire_names_parse_to_none() {
        assert_eq!(TowerKind::parse("ballista"), None);
        assert_eq!(EnemyKind::parse("dragon"), None);
    }

    #[test]
    fn arrow_tower_costs_ten() {
        assert_eq!(TowerKind::Arrow.def().cost, 10);
    }

    #[test]
    fn armored_enemy_absorbs_half_physical_damage() {
        let def = EnemyKind::Armored.def();
        assert!((def.armor - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn every_governor_has_a_distinct_element_and_ability() {
        for (index, governor) in Governor::ALL.into_iter().enumerate() {
            for other in Governor::ALL.into_iter().skip(index + 1) {
                assert_ne!(governor.def().element, other.def().element);
                assert_ne!(governor.def().ability, other.def().ability);
            }
        }
    }

    #[test]
    fn banner_never_fires() {
        let def = TowerKind::Banner.def();
        assert_eq!(def.fire_rate, 0.0);
        assert!(def.aura.is_some());
    }

    #[test]
    fn ultimates_are_flagged() {
        assert!(TowerKind::Reaper.def().ultimate);
        assert!(TowerKind::Prism.def().ultimate);
        assert!(!TowerKind::Arrow.def().ultimate);
    }
}
