//! Cooperate-or-fight resolution for two organisms contesting one cell.

use crate::organism::Organism;
use crate::resource;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use territory_core::{FamilyId, InteractionKind, OrganismId};

/// The parts of an organism the resolver looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contestant {
    pub id: OrganismId,
    pub family: FamilyId,
    pub strength: i32,
}

impl From<&Organism> for Contestant {
    fn from(organism: &Organism) -> Self {
        Self {
            id: organism.id,
            family: organism.family,
            strength: organism.strength,
        }
    }
}

/// Result of a contact. The resolver never touches the grid; the caller
/// applies the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Both organisms receive `share` (half the reward, remainder dropped)
    Cooperate { share: i32 },
    /// `winner` receives the full `reward`; `loser` dies
    Fight {
        winner: OrganismId,
        loser: OrganismId,
        reward: i32,
    },
}

impl Outcome {
    pub fn kind(&self) -> InteractionKind {
        match self {
            Outcome::Cooperate { .. } => InteractionKind::Cooperate,
            Outcome::Fight { .. } => InteractionKind::Fight,
        }
    }
}

/// Value at stake when two organisms meet
pub fn contact_reward(rng: &mut ChaCha8Rng) -> i32 {
    resource::random_value(rng)
}

/// Probability that `mover` beats `defender`, or `None` when both are at zero
pub fn win_probability(mover: &Contestant, defender: &Contestant) -> Option<f64> {
    let total = mover.strength.max(0) + defender.strength.max(0);
    if total == 0 {
        return None;
    }
    Some(mover.strength.max(0) as f64 / total as f64)
}

/// Resolve a contact, drawing the fight roll from `rng`
pub fn resolve(
    mover: Contestant,
    defender: Contestant,
    reward: i32,
    rng: &mut ChaCha8Rng,
) -> Outcome {
    if mover.family == defender.family {
        return resolve_with_draw(mover, defender, reward, 0.0);
    }
    let draw: f64 = rng.gen();
    resolve_with_draw(mover, defender, reward, draw)
}

/// Resolve a contact with an explicit fight roll in `[0, 1)`.
///
/// Kin always cooperate. Strangers fight and the mover wins when `draw` is
/// below its share of the combined strength. With no strength on either side
/// the roll is a coin flip.
pub fn resolve_with_draw(
    mover: Contestant,
    defender: Contestant,
    reward: i32,
    draw: f64,
) -> Outcome {
    if mover.family == defender.family {
        return Outcome::Cooperate { share: reward / 2 };
    }

    let threshold = win_probability(&mover, &defender).unwrap_or(0.5);
    let (winner, loser) = if draw < threshold {
        (mover.id, defender.id)
    } else {
        (defender.id, mover.id)
    };

    Outcome::Fight {
        winner,
        loser,
        reward,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn contestant(id: u64, family: char, strength: i32) -> Contestant {
        Contestant {
            id: OrganismId(id),
            family: FamilyId(family),
            strength,
        }
    }

    #[test]
    fn test_same_family_cooperates() {
        let outcome = resolve_with_draw(contestant(1, 'A', 3), contestant(2, 'A', 9), 7, 0.99);
        assert_eq!(outcome, Outcome::Cooperate { share: 3 });
        assert_eq!(outcome.kind(), InteractionKind::Cooperate);
    }

    #[test]
    fn test_different_families_fight() {
        let mover = contestant(1, 'A', 5);
        let defender = contestant(2, 'B', 5);

        assert_eq!(
            resolve_with_draw(mover, defender, 6, 0.0),
            Outcome::Fight {
                winner: OrganismId(1),
                loser: OrganismId(2),
                reward: 6
            }
        );
        assert_eq!(
            resolve_with_draw(mover, defender, 6, 0.5),
            Outcome::Fight {
                winner: OrganismId(2),
                loser: OrganismId(1),
                reward: 6
            }
        );
    }

    #[test]
    fn test_win_probability_follows_strength() {
        let mover = contestant(1, 'A', 3);
        let defender = contestant(2, 'B', 1);
        assert_eq!(win_probability(&mover, &defender), Some(0.75));

        let outcome = resolve_with_draw(mover, defender, 4, 0.74);
        assert!(matches!(outcome, Outcome::Fight { winner: OrganismId(1), .. }));
        let outcome = resolve_with_draw(mover, defender, 4, 0.75);
        assert!(matches!(outcome, Outcome::Fight { winner: OrganismId(2), .. }));
    }

    #[test]
    fn test_zero_strength_is_coin_flip() {
        let mover = contestant(1, 'A', 0);
        let defender = contestant(2, 'B', 0);
        assert_eq!(win_probability(&mover, &defender), None);

        assert!(matches!(
            resolve_with_draw(mover, defender, 1, 0.2),
            Outcome::Fight { winner: OrganismId(1), .. }
        ));
        assert!(matches!(
            resolve_with_draw(mover, defender, 1, 0.8),
            Outcome::Fight { winner: OrganismId(2), .. }
        ));
    }

    #[test]
    fn test_fight_always_names_both_participants() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mover = contestant(10, 'C', 4);
        let defender = contestant(20, 'D', 6);

        for _ in 0..50 {
            match resolve(mover, defender, contact_reward(&mut rng), &mut rng) {
                Outcome::Fight { winner, loser, reward } => {
                    assert_ne!(winner, loser);
                    assert!([mover.id, defender.id].contains(&winner));
                    assert!([mover.id, defender.id].contains(&loser));
                    assert!((1..=10).contains(&reward));
                }
                Outcome::Cooperate { .. } => panic!("strangers never cooperate"),
            }
        }
    }

    #[test]
    fn test_odd_reward_drops_remainder() {
        let outcome = resolve_with_draw(contestant(1, 'E', 5), contestant(2, 'E', 5), 1, 0.0);
        assert_eq!(outcome, Outcome::Cooperate { share: 0 });
    }
}
