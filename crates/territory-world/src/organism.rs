//! Organism state and management.

use serde::{Deserialize, Serialize};
use territory_core::{FamilyId, OrganismId, Position};

/// Strength never rises above this after consumption
pub const MAX_STRENGTH: i32 = 10;

/// Minimum strength an organism needs to reproduce
pub const REPRODUCTION_THRESHOLD: i32 = 8;

/// An organism in the simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organism {
    pub id: OrganismId,
    pub family: FamilyId,
    pub strength: i32,
    /// `None` until the organism is placed on the grid
    pub position: Option<Position>,
    pub birth_step: u64,
    pub offspring_count: u32,
    pub resources_consumed: i32,
}

impl Organism {
    pub fn new(id: OrganismId, family: FamilyId, strength: i32) -> Self {
        Self::new_with_birth_step(id, family, strength, 0)
    }

    pub fn new_with_birth_step(
        id: OrganismId,
        family: FamilyId,
        strength: i32,
        birth_step: u64,
    ) -> Self {
        Self {
            id,
            family,
            strength: strength.clamp(0, MAX_STRENGTH),
            position: None,
            birth_step,
            offspring_count: 0,
            resources_consumed: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.strength > 0
    }

    /// Gain `amount` strength, capped at [`MAX_STRENGTH`]. Dead organisms are
    /// left untouched.
    pub fn consume(&mut self, amount: i32) {
        if !self.is_alive() {
            return;
        }
        self.strength = (self.strength + amount).clamp(0, MAX_STRENGTH);
        self.resources_consumed += amount.max(0);
    }

    /// Pay the per-step upkeep. Returns whether the organism survived it.
    pub fn decay(&mut self, cost: i32) -> bool {
        self.strength = (self.strength - cost).max(0);
        self.is_alive()
    }

    pub fn can_reproduce(&self) -> bool {
        self.strength >= REPRODUCTION_THRESHOLD
    }

    /// Split off an offspring of the same family.
    ///
    /// The parent's strength is halved and the unplaced child starts with the
    /// same halved strength. Below [`REPRODUCTION_THRESHOLD`] nothing happens.
    pub fn reproduce(&mut self, child_id: OrganismId, step: u64) -> Option<Organism> {
        if !self.can_reproduce() {
            return None;
        }

        self.strength /= 2;
        self.offspring_count += 1;
        Some(Organism::new_with_birth_step(
            child_id,
            self.family,
            self.strength,
            step,
        ))
    }

    pub fn move_to(&mut self, new_position: Position) {
        self.position = Some(new_position);
    }

    /// Age in steps relative to `step`
    pub fn age(&self, step: u64) -> u64 {
        step.saturating_sub(self.birth_step)
    }
}
