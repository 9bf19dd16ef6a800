//! Enemy instances and timed status-effect bookkeeping.

use rampart_core::{DamageKind, EnemyId, EnemyKind, PlayerId, Position};

/// A magnitude paired with the simulation time it expires.
///
/// Merge rule: strongest wins; a weaker application only takes over once the
/// current one has expired.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimedStatus {
    /// Strength of the effect.
    pub magnitude: f64,
    /// Simulation time at which the effect expires.
    pub expires_at: f64,
}

impl TimedStatus {
    fn merge(slot: &mut Option<TimedStatus>, incoming: TimedStatus, now: f64) {
        match slot {
            Some(current) if current.expires_at > now && current.magnitude > incoming.magnitude => {}
            _ => *slot = Some(incoming),
        }
    }

    fn active(slot: &Option<TimedStatus>, now: f64) -> Option<f64> {
        match slot {
            Some(status) if status.expires_at > now => Some(status.magnitude),
            _ => None,
        }
    }
}

/// One live enemy marching toward the exit.
#[derive(Clone, Debug)]
pub struct EnemyInstance {
    pub(crate) id: EnemyId,
    pub(crate) kind: EnemyKind,
    pub(crate) health: f64,
    pub(crate) max_health: f64,
    pub(crate) position: Position,
    pub(crate) path_index: usize,
    pub(crate) path_version: u64,
    pub(crate) speed: f64,
    pub(crate) armor: f64,
    pub(crate) magic_resist: f64,
    pub(crate) regen: f64,
    pub(crate) bounty: u32,
    pub(crate) flying: bool,
    pub(crate) slow: Option<TimedStatus>,
    pub(crate) poison: Option<TimedStatus>,
    pub(crate) stun_until: f64,
    pub(crate) armor_debuff: Option<TimedStatus>,
    pub(crate) next_poison_tick: f64,
    /// Player whose shot or ability last damaged this enemy; poison and
    /// execute kills credit them.
    pub(crate) last_hit_by: Option<PlayerId>,
}

impl EnemyInstance {
    /// Enemy identifier.
    #[must_use]
    pub const fn id(&self) -> EnemyId {
        self.id
    }

    /// Enemy kind.
    #[must_use]
    pub const fn kind(&self) -> EnemyKind {
        self.kind
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> f64 {
        self.health
    }

    /// Health the enemy spawned with.
    #[must_use]
    pub const fn max_health(&self) -> f64 {
        self.max_health
    }

    /// Continuous position in cell units.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Index of the next waypoint the enemy walks toward.
    #[must_use]
    pub const fn path_index(&self) -> usize {
        self.path_index
    }

    /// Whether the enemy ignores the maze.
    #[must_use]
    pub const fn is_flying(&self) -> bool {
        self.flying
    }

    #[must_use]
    pub(crate) fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    #[must_use]
    pub(crate) fn is_stunned(&self, now: f64) -> bool {
        self.stun_until > now
    }

    /// Movement speed after the active slow, in cells per second.
    #[must_use]
    pub(crate) fn current_speed(&self, now: f64) -> f64 {
        match TimedStatus::active(&self.slow, now) {
            Some(magnitude) => self.speed * (1.0 - magnitude).max(0.0),
            None => self.speed,
        }
    }

    /// Damage reduction applied against the given damage kind.
    #[must_use]
    pub(crate) fn reduction(&self, kind: DamageKind, now: f64) -> f64 {
        match kind {
            DamageKind::Physical => {
                let debuff = TimedStatus::active(&self.armor_debuff, now).unwrap_or(0.0);
                (self.armor - debuff).max(0.0)
            }
            DamageKind::Magic => self.magic_resist,
        }
    }

    /// Applies damage after reduction; every hit deals at least 1.
    pub(crate) fn take_hit(&mut self, amount: f64, kind: DamageKind, now: f64) {
        let dealt = (amount * (1.0 - self.reduction(kind, now))).max(1.0);
        self.health -= dealt;
    }

    /// Applies damage that bypasses armor and resistance entirely.
    pub(crate) fn take_true_damage(&mut self, amount: f64) {
        self.health -= amount.max(1.0);
    }

    pub(crate) fn apply_slow(&mut self, magnitude: f64, duration: f64, now: f64) {
        TimedStatus::merge(
            &mut self.slow,
            TimedStatus {
                magnitude,
                expires_at: now + duration,
            },
            now,
        );
    }

    pub(crate) fn apply_poison(&mut self, dps: f64, duration: f64, now: f64) {
        if self.poison.is_none() {
            self.next_poison_tick = now + rampart_core::POISON_TICK_SECONDS;
        }
        TimedStatus::merge(
            &mut self.poison,
            TimedStatus {
                magnitude: dps,
                expires_at: now + duration,
            },
            now,
        );
    }

    pub(crate) fn apply_stun(&mut self, duration: f64, now: f64) {
        self.stun_until = self.stun_until.max(now + duration);
    }

    pub(crate) fn apply_armor_debuff(&mut self, magnitude: f64, duration: f64, now: f64) {
        TimedStatus::merge(
            &mut self.armor_debuff,
            TimedStatus {
                magnitude,
                expires_at: now + duration,
            },
            now,
        );
    }

    /// Drops expired statuses so the wire snapshot never carries dead timers.
    pub(crate) fn expire_statuses(&mut self, now: f64) {
        if TimedStatus::active(&self.slow, now).is_none() {
            self.slow = None;
        }
        if TimedStatus::active(&self.armor_debuff, now).is_none() {
            self.armor_debuff = None;
        }
        if TimedStatus::active(&self.poison, now).is_none() {
            self.poison = None;
        }
    }

    /// Runs the once-per-second poison tick if one is due.
    ///
    /// Ticks even while stunned. Poison is direct damage, unaffected by
    /// armor or resistance.
    pub(crate) fn poison_tick(&mut self, now: f64) {
        let Some(poison) = self.poison else {
            return;
        };
        if poison.expires_at <= now {
            self.poison = None;
            return;
        }
        if now >= self.next_poison_tick {
            self.take_true_damage(poison.magnitude);
            self.next_poison_tick += rampart_core::POISON_TICK_SECONDS;
        }
    }

    pub(crate) fn regenerate(&mut self, delta: f64, wave_regen_fraction: f64) {
        let amount = self.regen * delta + self.max_health * wave_regen_fraction * delta;
        if amount > 0.0 {
            self.health = (self.health + amount).min(self.max_health);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_core::EnemyKind;

    fn grunt() -> EnemyInstance {
        let def = EnemyKind::Armored.def();
        EnemyInstance {
            id: EnemyId::new(1),
            kind: EnemyKind::Armored,
            health: 100.0,
            max_health: 100.0,
            position: Position::new(0.5, 0.5),
            path_index: 0,
            path_version: 1,
            speed: def.speed,
            armor: def.armor,
            magic_resist: def.magic_resist,
            regen: 0.0,
            bounty: def.bounty,
            flying: false,
            slow: None,
            poison: None,
            stun_until: 0.0,
            armor_debuff: None,
            next_poison_tick: 0.0,
            last_hit_by: None,
        }
    }

    #[test]
    fn armor_halves_physical_damage() {
        let mut enemy = grunt();
        enemy.take_hit(100.0, DamageKind::Physical, 0.0);
        assert!((enemy.health - 50.0).abs() < 1e-9);
    }

    #[test]
    fn every_hit_deals_at_least_one_damage() {
        let mut enemy = grunt();
        enemy.take_hit(1.0, DamageKind::Physical, 0.0);
        assert!((enemy.health - 99.0).abs() < 1e-9);
    }

    #[test]
    fn weaker_slow_does_not_overwrite_a_stronger_one() {
        let mut enemy = grunt();
        enemy.apply_slow(0.5, 4.0, 0.0);
        enemy.apply_slow(0.3, 10.0, 1.0);
        assert!((enemy.current_speed(2.0) - enemy.speed * 0.5).abs() < 1e-9);
    }

    #[test]
    fn weaker_slow_takes_over_after_expiry() {
        let mut enemy = grunt();
        enemy.apply_slow(0.5, 2.0, 0.0);
        enemy.apply_slow(0.3, 10.0, 3.0);
        assert!((enemy.current_speed(4.0) - enemy.speed * 0.7).abs() < 1e-9);
    }

    #[test]
    fn armor_debuff_reduces_physical_reduction() {
        let mut enemy = grunt();
        enemy.apply_armor_debuff(0.2, 3.0, 0.0);
        assert!((enemy.reduction(DamageKind::Physical, 1.0) - 0.3).abs() < 1e-9);
        assert!((enemy.reduction(DamageKind::Physical, 5.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn poison_ticks_once_per_second() {
        let mut enemy = grunt();
        enemy.apply_poison(4.0, 4.0, 0.0);
        enemy.poison_tick(0.5);
        assert!((enemy.health - 100.0).abs() < 1e-9);
        enemy.poison_tick(1.0);
        assert!((enemy.health - 96.0).abs() < 1e-9);
        enemy.poison_tick(1.2);
        assert!((enemy.health - 96.0).abs() < 1e-9);
        enemy.poison_tick(2.0);
        assert!((enemy.health - 92.0).abs() < 1e-9);
    }

    #[test]
    fn stuns_extend_but_never_shorten() {
        let mut enemy = grunt();
        enemy.apply_stun(2.0, 0.0);
        enemy.apply_stun(0.5, 1.0);
        assert!(enemy.is_stunned(1.9));
        assert!(!enemy.is_stunned(2.1));
    }

    #[test]
    fn regen_caps_at_max_health() {
        let mut enemy = grunt();
        enemy.health = 99.5;
        enemy.regen = 2.0;
        enemy.regenerate(1.0, 0.0);
        assert!((enemy.health - 100.0).abs() < 1e-9);
    }
}
