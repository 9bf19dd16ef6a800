//! Player economy, governor choice, and derived bonuses.

use std::collections::BTreeMap;

use rampart_core::{Governor, PlayerId, TechId};

/// Multiplicative bonuses derived from governor and tech.
///
/// Never patched incrementally; [`Player::recalculate_bonuses`] is the only
/// writer and always recomputes from neutral values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bonuses {
    /// Multiplier on every fired shot's damage.
    pub damage: f64,
    /// Multiplier on tower range.
    pub range: f64,
    /// Multiplier on tower build and upgrade costs.
    pub cost: f64,
    /// Multiplier on post-wave interest.
    pub interest: f64,
    /// Multiplier on kill bounties.
    pub bounty: f64,
}

impl Bonuses {
    const NEUTRAL: Bonuses = Bonuses {
        damage: 1.0,
        range: 1.0,
        cost: 1.0,
        interest: 1.0,
        bounty: 1.0,
    };
}

/// Timed damage buff granted by rally-style abilities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageBuff {
    /// Damage multiplier while active.
    pub magnitude: f64,
    /// Simulation time at which the buff expires.
    pub expires_at: f64,
}

/// One player's economy, governor, tech, and running statistics.
#[derive(Clone, Debug)]
pub struct Player {
    pub(crate) id: PlayerId,
    pub(crate) name: String,
    pub(crate) governor: Option<Governor>,
    pub(crate) ready: bool,
    pub(crate) money: u32,
    pub(crate) lumber: u32,
    pub(crate) tech: BTreeMap<TechId, u32>,
    pub(crate) bonuses: Bonuses,
    pub(crate) ability_ready_at: f64,
    pub(crate) damage_buff: Option<DamageBuff>,
    pub(crate) kills: u32,
    pub(crate) leaks: u32,
}

impl Player {
    pub(crate) fn new(id: PlayerId, name: String, starting_money: u32) -> Self {
        Self {
            id,
            name,
            governor: None,
            ready: false,
            money: starting_money,
            lumber: 0,
            tech: BTreeMap::new(),
            bonuses: Bonuses::NEUTRAL,
            ability_ready_at: 0.0,
            damage_buff: None,
            kills: 0,
            leaks: 0,
        }
    }

    /// Player identifier.
    #[must_use]
    pub const fn id(&self) -> PlayerId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Chosen governor, if one was picked.
    #[must_use]
    pub const fn governor(&self) -> Option<Governor> {
        self.governor
    }

    /// Lobby ready flag.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Money on hand.
    #[must_use]
    pub const fn money(&self) -> u32 {
        self.money
    }

    /// Lumber on hand.
    #[must_use]
    pub const fn lumber(&self) -> u32 {
        self.lumber
    }

    /// Derived multiplicative bonuses.
    #[must_use]
    pub const fn bonuses(&self) -> &Bonuses {
        &self.bonuses
    }

    /// Enemies killed by this player's towers and abilities.
    #[must_use]
    pub const fn kills(&self) -> u32 {
        self.kills
    }

    /// Enemies leaked while this player was in the game.
    #[must_use]
    pub const fn leaks(&self) -> u32 {
        self.leaks
    }

    /// Stacks owned of the given tech.
    #[must_use]
    pub fn tech_stacks(&self, tech: TechId) -> u32 {
        self.tech.get(&tech).copied().unwrap_or(0)
    }

    /// Whether ultimate towers are unlocked for this player.
    #[must_use]
    pub fn has_ultimate_unlock(&self) -> bool {
        self.tech
            .iter()
            .any(|(tech, stacks)| tech.def().unlocks_ultimate && *stacks > 0)
    }

    /// Recomputes every bonus from neutral values.
    ///
    /// Single source of truth for bonuses: governor passive first, then each
    /// owned tech stack additively. Max-stack caps are enforced at purchase
    /// time, not here.
    pub(crate) fn recalculate_bonuses(&mut self) {
        let mut bonuses = Bonuses::NEUTRAL;
        if let Some(governor) = self.governor {
            let def = governor.def();
            bonuses.damage *= def.damage_mult;
            bonuses.range *= def.range_mult;
            bonuses.cost *= def.cost_mult;
            bonuses.interest *= def.interest_mult;
            bonuses.bounty *= def.bounty_mult;
        }
        for (tech, stacks) in &self.tech {
            let def = tech.def();
            let stacks = f64::from(*stacks);
            bonuses.damage += def.damage_bonus * stacks;
            bonuses.range += def.range_bonus * stacks;
            bonuses.interest += def.interest_bonus * stacks;
            bonuses.cost -= def.cost_reduction * stacks;
        }
        bonuses.cost = bonuses.cost.max(0.1);
        self.bonuses = bonuses;
    }

    /// Damage multiplier from an active rally buff, 1.0 when none.
    #[must_use]
    pub(crate) fn damage_buff_multiplier(&self, now: f64) -> f64 {
        match self.damage_buff {
            Some(buff) if buff.expires_at > now => buff.magnitude,
            _ => 1.0,
        }
    }

    /// Build or upgrade cost after the player's cost multiplier.
    #[must_use]
    pub(crate) fn discounted_cost(&self, base: u32) -> u32 {
        (f64::from(base) * self.bonuses.cost).floor() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_player_has_neutral_bonuses() {
        let player = Player::new(PlayerId::new(0), "host".to_owned(), 30);
        assert_eq!(player.bonuses, Bonuses::NEUTRAL);
        assert_eq!(player.money(), 30);
        assert!(!player.has_ultimate_unlock());
    }

    #[test]
    fn governor_passive_feeds_the_recompute() {
        let mut player = Player::new(PlayerId::new(0), "host".to_owned(), 30);
        player.governor = Some(Governor::Pyro);
        player.recalculate_bonuses();
        assert!((player.bonuses.damage - 1.10).abs() < 1e-9);
        assert!((player.bonuses.range - 1.0).abs() < 1e-9);
    }

    #[test]
    fn tech_stacks_add_on_top_of_the_passive() {
        let mut player = Player::new(PlayerId::new(0), "host".to_owned(), 30);
        player.governor = Some(Governor::Pyro);
        let _ = player.tech.insert(TechId::SharpenedSteel, 3);
        player.recalculate_bonuses();
        assert!((player.bonuses.damage - 1.25).abs() < 1e-9);
    }

    #[test]
    fn recompute_never_drifts() {
        let mut player = Player::new(PlayerId::new(0), "host".to_owned(), 30);
        player.governor = Some(Governor::Terra);
        let _ = player.tech.insert(TechId::Logistics, 2);
        player.recalculate_bonuses();
        let first = player.bonuses;
        for _ in 0..10 {
            player.recalculate_bonuses();
        }
        assert_eq!(player.bonuses, first);
    }

    #[test]
    fn ultimate_mastery_unlocks_ultimates() {
        let mut player = Player::new(PlayerId::new(0), "host".to_owned(), 30);
        let _ = player.tech.insert(TechId::UltimateMastery, 1);
        assert!(player.has_ultimate_unlock());
    }

    #[test]
    fn expired_damage_buff_reads_as_neutral() {
        let mut player = Player::new(PlayerId::new(0), "host".to_owned(), 30);
        player.damage_buff = Some(DamageBuff {
            magnitude: 1.2,
            expires_at: 5.0,
        });
        assert!((player.damage_buff_multiplier(2.0) - 1.2).abs() < 1e-9);
        assert!((player.damage_buff_multiplier(6.0) - 1.0).abs() < 1e-9);
    }
}
