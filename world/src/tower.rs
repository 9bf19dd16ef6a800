//! Tower instances and the upgrade/refund money math.

use rampart_core::{
    CellCoord, Element, PlayerId, TargetingMode, TowerId, TowerKind, MAX_TOWER_LEVEL,
    SELL_REFUND_FACTOR, UPGRADE_COST_FACTOR, UPGRADE_DAMAGE_MULT, UPGRADE_RANGE_MULT,
    UPGRADE_RATE_MULT,
};

/// Mutable combat stats, cloned from the base table and amplified by
/// upgrades.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerStats {
    /// Damage per shot before owner multipliers.
    pub damage: f64,
    /// Targeting range in cells before owner multipliers.
    pub range: f64,
    /// Shots per second.
    pub fire_rate: f64,
}

/// One placed tower.
#[derive(Clone, Debug)]
pub struct TowerInstance {
    pub(crate) id: TowerId,
    pub(crate) owner: PlayerId,
    pub(crate) kind: TowerKind,
    pub(crate) cell: CellCoord,
    pub(crate) element: Element,
    pub(crate) stats: TowerStats,
    pub(crate) level: u8,
    pub(crate) targeting: TargetingMode,
    pub(crate) synergy_mult: f64,
    pub(crate) aura_mult: f64,
    pub(crate) cooldown: f64,
    pub(crate) queued_upgrade: bool,
}

impl TowerInstance {
    pub(crate) fn new(
        id: TowerId,
        owner: PlayerId,
        kind: TowerKind,
        cell: CellCoord,
        element: Element,
    ) -> Self {
        let def = kind.def();
        Self {
            id,
            owner,
            kind,
            cell,
            element,
            stats: TowerStats {
                damage: def.damage,
                range: def.range,
                fire_rate: def.fire_rate,
            },
            level: 1,
            targeting: TargetingMode::First,
            synergy_mult: 1.0,
            aura_mult: 1.0,
            cooldown: 0.0,
            queued_upgrade: false,
        }
    }

    /// Tower identifier.
    #[must_use]
    pub const fn id(&self) -> TowerId {
        self.id
    }

    /// Owning player.
    #[must_use]
    pub const fn owner(&self) -> PlayerId {
        self.owner
    }

    /// Tower kind.
    #[must_use]
    pub const fn kind(&self) -> TowerKind {
        self.kind
    }

    /// Occupied grid cell.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Element inherited from the owner's governor.
    #[must_use]
    pub const fn element(&self) -> Element {
        self.element
    }

    /// Upgrade level, 1 through [`MAX_TOWER_LEVEL`].
    #[must_use]
    pub const fn level(&self) -> u8 {
        self.level
    }

    /// Current combat stats.
    #[must_use]
    pub const fn stats(&self) -> &TowerStats {
        &self.stats
    }

    /// Active targeting policy.
    #[must_use]
    pub const fn targeting(&self) -> TargetingMode {
        self.targeting
    }

    /// Whether an upgrade is queued for the end of the wave.
    #[must_use]
    pub const fn has_queued_upgrade(&self) -> bool {
        self.queued_upgrade
    }

    /// Money the next upgrade costs, before owner discounts.
    ///
    /// `None` once the tower is at max level.
    #[must_use]
    pub fn next_upgrade_cost(&self) -> Option<u32> {
        if self.level >= MAX_TOWER_LEVEL {
            return None;
        }
        Some(upgrade_cost(self.kind, self.level))
    }

    /// Amplifies stats by one level.
    ///
    /// Also the replay primitive for snapshot reconstruction, which never
    /// trusts serialized stats and instead replays this from the base table.
    pub(crate) fn upgrade(&mut self) {
        self.level += 1;
        self.stats.damage *= UPGRADE_DAMAGE_MULT;
        self.stats.range *= UPGRADE_RANGE_MULT;
        self.stats.fire_rate *= UPGRADE_RATE_MULT;
    }

    /// Money returned when selling: the refund fraction of every coin
    /// invested, floored per component.
    #[must_use]
    pub fn refund(&self) -> u32 {
        let base = self.kind.def().cost;
        let mut refund = (f64::from(base) * SELL_REFUND_FACTOR).floor() as u32;
        for level in 1..self.level {
            let invested = upgrade_cost(self.kind, level);
            refund += (f64::from(invested) * SELL_REFUND_FACTOR).floor() as u32;
        }
        refund
    }
}

/// Cost of upgrading a tower of `kind` away from `level`.
#[must_use]
pub fn upgrade_cost(kind: TowerKind, level: u8) -> u32 {
    (f64::from(kind.def().cost) * UPGRADE_COST_FACTOR * f64::from(level)).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrow() -> TowerInstance {
        TowerInstance::new(
            TowerId::new(1),
            PlayerId::new(0),
            TowerKind::Arrow,
            CellCoord::new(2, 2),
            Element::Fire,
        )
    }

    #[test]
    fn arrow_refund_at_level_one_is_seven() {
        assert_eq!(arrow().refund(), 7);
    }

    #[test]
    fn arrow_refund_after_one_upgrade_is_eleven() {
        let mut tower = arrow();
        assert_eq!(tower.next_upgrade_cost(), Some(6));
        tower.upgrade();
        assert_eq!(tower.refund(), 11);
    }

    #[test]
    fn upgrade_costs_scale_with_the_level_left_behind() {
        assert_eq!(upgrade_cost(TowerKind::Arrow, 1), 6);
        assert_eq!(upgrade_cost(TowerKind::Arrow, 2), 12);
        assert_eq!(upgrade_cost(TowerKind::Arrow, 3), 18);
    }

    #[test]
    fn upgrades_amplify_stats_multiplicatively() {
        let mut tower = arrow();
        let base = *tower.stats();
        tower.upgrade();
        assert!((tower.stats().damage - base.damage * 1.5).abs() < 1e-9);
        assert!((tower.stats().range - base.range * 1.15).abs() < 1e-9);
        assert!((tower.stats().fire_rate - base.fire_rate * 1.2).abs() < 1e-9);
    }

    #[test]
    fn no_upgrade_cost_at_max_level() {
        let mut tower = arrow();
        while tower.level() < MAX_TOWER_LEVEL {
            tower.upgrade();
        }
        assert_eq!(tower.next_upgrade_cost(), None);
    }
}
