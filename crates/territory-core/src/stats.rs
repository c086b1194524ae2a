//! Per-family survival and interaction statistics.

use crate::{FamilyId, InteractionKind};
use serde::{Deserialize, Serialize};

/// Aggregated statistics for one family across a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyStats {
    pub family: FamilyId,
    /// Last step at which at least one member was alive (0 = never survived a step)
    pub last_step_seen: u64,
    /// Fights any member took part in
    pub fights: u32,
    /// Cooperations between members
    pub cooperations: u32,
    /// Offspring born into the family
    pub births: u32,
    /// Members lost to upkeep or fights
    pub deaths: u32,
    /// Largest number of members alive at the end of a step
    pub peak_population: usize,
}

impl FamilyStats {
    pub fn new(family: FamilyId) -> Self {
        Self {
            family,
            last_step_seen: 0,
            fights: 0,
            cooperations: 0,
            births: 0,
            deaths: 0,
            peak_population: 0,
        }
    }

    pub fn interactions(&self) -> u32 {
        self.fights + self.cooperations
    }
}

/// Collects [`FamilyStats`] in first-encountered family order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsReporter {
    families: Vec<FamilyStats>,
}

impl StatsReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a family; a no-op if it is already known
    pub fn register(&mut self, family: FamilyId) {
        self.entry(family);
    }

    pub fn record_interaction(&mut self, family: FamilyId, kind: InteractionKind) {
        let stats = self.entry(family);
        match kind {
            InteractionKind::Cooperate => stats.cooperations += 1,
            InteractionKind::Fight => stats.fights += 1,
        }
    }

    /// Mark `family` as alive at `step` with `alive` members
    pub fn record_survival(&mut self, family: FamilyId, step: u64, alive: usize) {
        let stats = self.entry(family);
        stats.last_step_seen = stats.last_step_seen.max(step);
        stats.peak_population = stats.peak_population.max(alive);
    }

    pub fn record_birth(&mut self, family: FamilyId) {
        self.entry(family).births += 1;
    }

    pub fn record_death(&mut self, family: FamilyId) {
        self.entry(family).deaths += 1;
    }

    pub fn get(&self, family: FamilyId) -> Option<&FamilyStats> {
        self.families.iter().find(|s| s.family == family)
    }

    pub fn families(&self) -> &[FamilyStats] {
        &self.families
    }

    /// The family with the greatest `last_step_seen`; ties go to the family
    /// encountered first
    pub fn longest_surviving(&self) -> Option<&FamilyStats> {
        self.families.iter().fold(None, |best, candidate| match best {
            Some(current) if current.last_step_seen >= candidate.last_step_seen => Some(current),
            _ => Some(candidate),
        })
    }

    fn entry(&mut self, family: FamilyId) -> &mut FamilyStats {
        let index = match self.families.iter().position(|s| s.family == family) {
            Some(index) => index,
            None => {
                self.families.push(FamilyStats::new(family));
                self.families.len() - 1
            }
        };
        &mut self.families[index]
    }
}
