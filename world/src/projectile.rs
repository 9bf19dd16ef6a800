//! In-flight projectiles and the damage payloads they carry.

use rampart_core::{
    ChainDef, DamageKind, EnemyId, PlayerId, PoisonDef, Position, ProjectileId, SplashDef,
    TimedMagnitude, TowerKind,
};

use crate::tower::TowerInstance;

/// Damage snapshot baked into a projectile when it is fired.
///
/// Copied from the firing tower so later upgrades or sales never
/// retroactively change shots already in the air.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamagePayload {
    /// Damage before the target's reduction, owner multipliers included.
    pub amount: f64,
    /// Whether armor or magic resistance reduces the hit.
    pub kind: DamageKind,
    /// Splash dealt around the impact, if any.
    pub splash: Option<SplashDef>,
    /// Chain jumps after the impact, if any.
    pub chain: Option<ChainDef>,
    /// Slow applied to the primary target, if any.
    pub slow: Option<TimedMagnitude>,
    /// Poison applied to the primary target, if any.
    pub poison: Option<PoisonDef>,
    /// Stun seconds applied to the primary target, if any.
    pub stun: Option<f64>,
    /// Armor debuff applied to the primary target, if any.
    pub armor_debuff: Option<TimedMagnitude>,
    /// Health fraction at or below which the target dies instantly.
    pub execute_threshold: f64,
    /// Path cells the primary target is pushed back on impact.
    pub teleport_back: u32,
}

impl DamagePayload {
    /// Bakes a payload from the firing tower and its owner's multipliers.
    #[must_use]
    pub(crate) fn bake(tower: &TowerInstance, owner_damage_mult: f64) -> Self {
        let def = tower.kind.def();
        Self {
            amount: tower.stats.damage * owner_damage_mult * tower.aura_mult * tower.synergy_mult,
            kind: def.damage_kind,
            splash: def.splash,
            chain: def.chain,
            slow: def.slow,
            poison: def.poison,
            stun: def.stun,
            armor_debuff: def.armor_debuff,
            execute_threshold: def.execute_threshold,
            teleport_back: def.teleport_back,
        }
    }
}

/// One shot in flight toward an enemy.
#[derive(Clone, Debug)]
pub struct Projectile {
    pub(crate) id: ProjectileId,
    pub(crate) owner: PlayerId,
    pub(crate) target: EnemyId,
    pub(crate) position: Position,
    pub(crate) target_point: Position,
    pub(crate) speed: f64,
    pub(crate) payload: DamagePayload,
}

impl Projectile {
    /// Projectile identifier.
    #[must_use]
    pub const fn id(&self) -> ProjectileId {
        self.id
    }

    /// Current position in cell units.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Enemy the shot homes toward.
    #[must_use]
    pub const fn target(&self) -> EnemyId {
        self.target
    }
}

/// Projectile travel speed for a tower kind, in cells per second.
#[must_use]
pub(crate) fn travel_speed(kind: TowerKind) -> f64 {
    kind.def().projectile_speed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_core::{CellCoord, Element};

    #[test]
    fn payload_bakes_owner_and_aura_multipliers_in() {
        let mut tower = TowerInstance::new(
            rampart_core::TowerId::new(1),
            PlayerId::new(0),
            TowerKind::Arrow,
            CellCoord::new(1, 1),
            Element::Fire,
        );
        tower.aura_mult = 1.15;
        tower.synergy_mult = 1.10;
        let payload = DamagePayload::bake(&tower, 1.10);
        let expected = 8.0 * 1.10 * 1.15 * 1.10;
        assert!((payload.amount - expected).abs() < 1e-9);
        assert_eq!(payload.kind, DamageKind::Physical);
        assert!(payload.splash.is_none());
    }

    #[test]
    fn later_upgrades_do_not_touch_baked_payloads() {
        let mut tower = TowerInstance::new(
            rampart_core::TowerId::new(1),
            PlayerId::new(0),
            TowerKind::Arrow,
            CellCoord::new(1, 1),
            Element::Fire,
        );
        let payload = DamagePayload::bake(&tower, 1.0);
        tower.upgrade();
        assert!((payload.amount - 8.0).abs() < 1e-9);
    }
}
