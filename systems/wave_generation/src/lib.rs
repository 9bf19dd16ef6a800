#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave composition system.
//!
//! Pure except for the mutator roll: building a [`Wave`] from a wave number
//! and a player count touches no simulation state, and when a forced mutator
//! list is supplied (challenge modes) the output is fully deterministic,
//! with Chaotic re-rolls drawn from a ChaCha stream seeded from the wave
//! number. Without a forced list the mutator roll uses the thread RNG, since
//! only the authoritative host generates waves.

use rand::rngs::ThreadRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rampart_core::{EnemyKind, Wave, WaveEntry, WaveMutator, MUTATOR_START_WAVE};
use sha2::{Digest, Sha256};

/// Last wave covered by the authored table; later waves follow the endless
/// rotation.
pub const AUTHORED_WAVES: u32 = 40;

/// Seconds between consecutive spawns in every wave.
pub const SPAWN_INTERVAL: f64 = 0.8;

const DIFFICULTY_STEP: f64 = 0.08;
const HEALTH_STEP: f64 = 0.15;
const PLAYER_STEP: f64 = 0.5;

const SWIFT_SPEED_MULT: f64 = 1.3;
const VIGOROUS_HEALTH_MULT: f64 = 1.5;
const GILDED_BOUNTY_MULT: f64 = 1.5;
const SWARM_HEALTH_MULT: f64 = 0.5;
const REGENERATING_BONUS: f64 = 0.01;
const SHIELDED_BONUS: f64 = 0.15;

/// Difficulty multiplier applied to enemy counts and wave income.
#[must_use]
pub fn difficulty_multiplier(number: u32) -> f64 {
    1.0 + DIFFICULTY_STEP * f64::from(number.saturating_sub(1))
}

/// Health multiplier applied to every enemy spawned by the wave.
#[must_use]
pub fn health_multiplier(number: u32) -> f64 {
    1.0 + HEALTH_STEP * f64::from(number.saturating_sub(1))
}

/// Count multiplier applied for the number of players in the game.
#[must_use]
pub fn player_count_multiplier(player_count: u32) -> f64 {
    1.0 + PLAYER_STEP * f64::from(player_count.saturating_sub(1))
}

/// Builds the composition and modifiers for wave `number`.
///
/// `player_count` scales enemy counts so that more players always face
/// strictly more enemies. `forced_mutators` replaces the random mutator roll
/// on eligible waves; boss waves and waves before [`MUTATOR_START_WAVE`]
/// never receive mutators from either path.
#[must_use]
pub fn generate(number: u32, player_count: u32, forced_mutators: Option<&[WaveMutator]>) -> Wave {
    let blueprint = blueprint(number);
    let is_boss = blueprint.tags.contains(&"boss");

    let mut entries = Vec::with_capacity(blueprint.entries.len());
    for &(kind, base) in blueprint.entries {
        let count = scaled_count(kind, base, number, player_count);
        entries.push(WaveEntry { kind, count });
    }

    let mut wave = Wave {
        number,
        name: blueprint.name.map(str::to_owned),
        tags: blueprint.tags.iter().map(|tag| (*tag).to_owned()).collect(),
        mutators: Vec::new(),
        entries,
        health_multiplier: health_multiplier(number),
        speed_multiplier: 1.0,
        bounty_multiplier: 1.0,
        regen_bonus: 0.0,
        armor_bonus: 0.0,
        resist_bonus: 0.0,
        spawn_interval: SPAWN_INTERVAL,
        spawn_index: 0,
        completed: false,
    };

    if number >= MUTATOR_START_WAVE && !is_boss {
        match forced_mutators {
            Some(forced) => {
                let mut rng = chaotic_rng(number);
                apply_mutators(&mut wave, forced, &mut rng);
            }
            None => {
                let mut rng = rand::thread_rng();
                let rolled = roll_mutators(&mut rng);
                apply_mutators(&mut wave, &rolled, &mut rng);
            }
        }
    }

    wave
}

fn scaled_count(kind: EnemyKind, base: u32, number: u32, player_count: u32) -> u32 {
    // Bosses scale with the head count only, never with the difficulty curve.
    if kind == EnemyKind::Boss {
        return base.saturating_mul(player_count.max(1));
    }
    let scaled =
        f64::from(base) * difficulty_multiplier(number) * player_count_multiplier(player_count);
    (scaled.floor() as u32).max(1)
}

fn roll_mutators(rng: &mut ThreadRng) -> Vec<WaveMutator> {
    let count = match rng.gen_range(0..100u32) {
        0..=49 => 0,
        50..=84 => 1,
        _ => 2,
    };
    let mut picked = Vec::with_capacity(count);
    while picked.len() < count {
        let candidate = WaveMutator::ALL[rng.gen_range(0..WaveMutator::ALL.len())];
        if !picked.contains(&candidate) {
            picked.push(candidate);
        }
    }
    picked
}

fn apply_mutators(wave: &mut Wave, mutators: &[WaveMutator], chaos: &mut dyn RngCore) {
    for &mutator in mutators {
        if wave.mutators.contains(&mutator) {
            continue;
        }
        wave.mutators.push(mutator);
        match mutator {
            WaveMutator::Swift => wave.speed_multiplier *= SWIFT_SPEED_MULT,
            WaveMutator::Vigorous => wave.health_multiplier *= VIGOROUS_HEALTH_MULT,
            WaveMutator::Gilded => wave.bounty_multiplier *= GILDED_BOUNTY_MULT,
            WaveMutator::Regenerating => wave.regen_bonus += REGENERATING_BONUS,
            WaveMutator::Shielded => {
                wave.armor_bonus += SHIELDED_BONUS;
                wave.resist_bonus += SHIELDED_BONUS;
            }
            WaveMutator::Chaotic => reroll_kinds(wave, chaos),
            // Applied after the loop so it doubles the final composition.
            WaveMutator::Swarm => {}
        }
    }
    if wave.mutators.contains(&WaveMutator::Swarm) {
        for entry in &mut wave.entries {
            entry.count = entry.count.saturating_mul(2);
        }
        wave.health_multiplier *= SWARM_HEALTH_MULT;
    }
}

fn reroll_kinds(wave: &mut Wave, rng: &mut dyn RngCore) {
    let pool: Vec<EnemyKind> = EnemyKind::ALL
        .into_iter()
        .filter(|kind| kind.def().send_cost.is_some())
        .collect();
    for entry in &mut wave.entries {
        if entry.kind == EnemyKind::Boss {
            continue;
        }
        let index = (rng.next_u32() as usize) % pool.len();
        entry.kind = pool[index];
    }
}

fn chaotic_rng(number: u32) -> ChaCha8Rng {
    let mut hasher = Sha256::new();
    hasher.update(b"rampart.wave.chaotic");
    hasher.update(number.to_le_bytes());
    let digest = hasher.finalize();
    let mut seed = [0_u8; 32];
    seed.copy_from_slice(&digest);
    ChaCha8Rng::from_seed(seed)
}

struct Blueprint {
    name: Option<&'static str>,
    tags: &'static [&'static str],
    entries: &'static [(EnemyKind, u32)],
}

const NO_TAGS: &[&str] = &[];
const BOSS_TAGS: &[&str] = &["boss"];
const AIR_TAGS: &[&str] = &["air"];

fn blueprint(number: u32) -> Blueprint {
    use EnemyKind::*;

    let ground = |entries: &'static [(EnemyKind, u32)]| Blueprint {
        name: None,
        tags: NO_TAGS,
        entries,
    };
    let air = |entries: &'static [(EnemyKind, u32)]| Blueprint {
        name: None,
        tags: AIR_TAGS,
        entries,
    };
    let boss = |name: &'static str, entries: &'static [(EnemyKind, u32)]| Blueprint {
        name: Some(name),
        tags: BOSS_TAGS,
        entries,
    };

    match number {
        0 | 1 => ground(&[(Runt, 8)]),
        2 => ground(&[(Runt, 10)]),
        3 => ground(&[(Runner, 8)]),
        4 => ground(&[(Grunt, 8)]),
        5 => ground(&[(Runt, 8), (Runner, 6)]),
        6 => ground(&[(Armored, 6)]),
        7 => air(&[(Flyer, 8)]),
        8 => ground(&[(Grunt, 8), (Runner, 4)]),
        9 => ground(&[(Shielded, 6)]),
        10 => boss("Gatekeeper", &[(Boss, 1), (Grunt, 6)]),
        11 => ground(&[(Regenerator, 5)]),
        12 => ground(&[(Runner, 12)]),
        13 => ground(&[(Armored, 6), (Shielded, 4)]),
        14 => air(&[(Flyer, 10)]),
        15 => ground(&[(Splitter, 8)]),
        16 => ground(&[(Grunt, 10), (Armored, 4)]),
        17 => ground(&[(Regenerator, 6), (Runner, 6)]),
        18 => ground(&[(Shielded, 8)]),
        19 => ground(&[(Splitter, 6), (Runner, 8)]),
        20 => boss("Ironmaw", &[(Boss, 1), (Armored, 6)]),
        21 => air(&[(Flyer, 12)]),
        22 => ground(&[(Grunt, 12), (Shielded, 4)]),
        23 => ground(&[(Armored, 8), (Regenerator, 4)]),
        24 => ground(&[(Runner, 14)]),
        25 => ground(&[(Splitter, 10)]),
        26 => ground(&[(Shielded, 8), (Armored, 4)]),
        27 => ground(&[(Regenerator, 8)]),
        28 => air(&[(Flyer, 10), (Runner, 6)]),
        29 => ground(&[(Grunt, 10), (Splitter, 6)]),
        30 => boss("The Shroud", &[(Boss, 1), (Shielded, 6)]),
        31 => ground(&[(Armored, 10)]),
        32 => ground(&[(Runner, 12), (Regenerator, 4)]),
        33 => ground(&[(Splitter, 8), (Shielded, 6)]),
        34 => ground(&[(Grunt, 14), (Armored, 6)]),
        35 => air(&[(Flyer, 14)]),
        36 => ground(&[(Regenerator, 10)]),
        37 => ground(&[(Armored, 8), (Shielded, 8)]),
        38 => ground(&[(Splitter, 12)]),
        39 => ground(&[(Runner, 10), (Grunt, 10), (Armored, 4)]),
        40 => boss("Overlord", &[(Boss, 2), (Regenerator, 6)]),
        endless if endless % 10 == 0 => boss("Endless Overlord", &[(Boss, 2), (Regenerator, 6)]),
        endless => match endless % 5 {
            1 => ground(&[(Grunt, 10), (Armored, 6)]),
            2 => ground(&[(Runner, 12), (Splitter, 6)]),
            3 => ground(&[(Shielded, 8), (Regenerator, 6)]),
            4 => air(&[(Flyer, 14)]),
            _ => ground(&[(Armored, 8), (Shielded, 8)]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boss_waves_are_tagged_and_named() {
        for number in [10, 20, 30, 40] {
            let wave = generate(number, 1, None);
            assert!(wave.is_boss(), "wave {number} should be a boss wave");
            assert!(wave.name.is_some());
            assert!(wave
                .entries
                .iter()
                .any(|entry| entry.kind == EnemyKind::Boss));
        }
        assert!(!generate(11, 1, None).is_boss());
    }

    #[test]
    fn more_players_always_means_strictly_more_enemies() {
        for number in 1..=45 {
            for players in 1..4u32 {
                let fewer = generate(number, players, Some(&[]));
                let more = generate(number, players + 1, Some(&[]));
                assert!(
                    more.total_count() > fewer.total_count(),
                    "wave {number}: {} players spawned {} enemies, {} players spawned {}",
                    players,
                    fewer.total_count(),
                    players + 1,
                    more.total_count(),
                );
            }
        }
    }

    #[test]
    fn counts_grow_with_the_difficulty_curve() {
        let early = generate(3, 1, Some(&[]));
        let late = generate(24, 1, Some(&[]));
        assert!(late.total_count() > early.total_count());
        assert!(late.health_multiplier > early.health_multiplier);
    }

    #[test]
    fn no_mutators_before_the_start_wave_or_on_boss_waves() {
        for number in 1..MUTATOR_START_WAVE {
            assert!(generate(number, 2, None).mutators.is_empty());
        }
        let forced = [WaveMutator::Swift, WaveMutator::Vigorous];
        assert!(generate(20, 2, Some(&forced)).mutators.is_empty());
        assert_eq!(
            generate(12, 2, Some(&forced)).mutators,
            vec![WaveMutator::Swift, WaveMutator::Vigorous]
        );
    }

    #[test]
    fn forced_mutator_waves_replay_bit_for_bit() {
        let forced = [WaveMutator::Chaotic, WaveMutator::Swarm];
        let first = generate(15, 3, Some(&forced));
        let second = generate(15, 3, Some(&forced));
        assert_eq!(first, second);
    }

    #[test]
    fn swarm_doubles_counts_and_halves_health() {
        let plain = generate(15, 2, Some(&[]));
        let swarm = generate(15, 2, Some(&[WaveMutator::Swarm]));
        assert_eq!(swarm.total_count(), plain.total_count() * 2);
        assert!((swarm.health_multiplier - plain.health_multiplier * 0.5).abs() < 1e-9);
    }

    #[test]
    fn chaotic_never_rolls_unsendable_kinds() {
        let wave = generate(25, 4, Some(&[WaveMutator::Chaotic]));
        for entry in &wave.entries {
            assert!(entry.kind.def().send_cost.is_some());
        }
    }

    #[test]
    fn shielded_mutator_raises_both_reductions() {
        let wave = generate(18, 1, Some(&[WaveMutator::Shielded]));
        assert!((wave.armor_bonus - 0.15).abs() < 1e-9);
        assert!((wave.resist_bonus - 0.15).abs() < 1e-9);
    }

    #[test]
    fn endless_waves_keep_coming_with_bosses_every_tenth() {
        let fifty = generate(50, 1, Some(&[]));
        assert!(fifty.is_boss());
        let forty_two = generate(42, 1, Some(&[]));
        assert!(!forty_two.is_boss());
        assert!(forty_two.total_count() > 0);
    }

    #[test]
    fn duplicate_forced_mutators_apply_once() {
        let wave = generate(12, 1, Some(&[WaveMutator::Vigorous, WaveMutator::Vigorous]));
        assert_eq!(wave.mutators, vec![WaveMutator::Vigorous]);
        let plain = generate(12, 1, Some(&[]));
        assert!((wave.health_multiplier - plain.health_multiplier * 1.5).abs() < 1e-9);
    }
}
