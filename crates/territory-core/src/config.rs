//! Configuration types for the simulation.

use crate::{Error, FamilyId, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Upper bound on organism strength, mirrored by the world crate
const STRENGTH_CAP: i32 = 10;

/// Edge handling for neighbor queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Edges are hard walls
    #[default]
    Bounded,
    /// Neighbors wrap around to the opposite edge
    Toroidal,
}

/// Which neighboring cells an organism may pick as its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementPolicy {
    /// Any in-bounds neighbor; landing on an occupied cell triggers an interaction
    #[default]
    Contest,
    /// Only empty neighbors; organisms never collide
    EmptyOnly,
}

/// World configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Width of the world grid
    pub width: i32,
    /// Height of the world grid
    pub height: i32,
    /// Fraction of cells that receive a resource each step (0.0 to 1.0)
    pub resource_density: f64,
    /// Neighbor wraparound
    pub boundary: BoundaryPolicy,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            resource_density: 0.1,
            boundary: BoundaryPolicy::Bounded,
        }
    }
}

/// Rules governing the strength economy and movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Strength of each founding organism
    pub initial_strength: i32,
    /// Strength lost by every organism at the start of each step
    pub upkeep_cost: i32,
    /// Destination selection policy
    pub movement: MovementPolicy,
    /// Allow organisms to reproduce
    pub allow_reproduction: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            initial_strength: 5,
            upkeep_cost: 1,
            movement: MovementPolicy::Contest,
            allow_reproduction: true,
        }
    }
}

/// Full simulation run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of steps to run the simulation
    pub num_steps: u64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// World configuration
    pub world: WorldConfig,
    /// Rule configuration
    pub rules: RuleConfig,
    /// Founding families, one organism each
    pub families: Vec<FamilyId>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_steps: 100,
            seed: 0,
            world: WorldConfig::default(),
            rules: RuleConfig::default(),
            families: FamilyId::default_set(),
        }
    }
}

impl SimulationConfig {
    /// Reject configurations the engine cannot run. Values are never clamped.
    pub fn validate(&self) -> Result<()> {
        let world = &self.world;
        if world.width <= 0 || world.height <= 0 {
            return Err(Error::InvalidConfiguration(format!(
                "grid dimensions must be positive, got {}x{}",
                world.width, world.height
            )));
        }

        if !world.resource_density.is_finite() || !(0.0..=1.0).contains(&world.resource_density)
        {
            return Err(Error::InvalidConfiguration(format!(
                "resource density must be within [0, 1], got {}",
                world.resource_density
            )));
        }

        if !(1..=STRENGTH_CAP).contains(&self.rules.initial_strength) {
            return Err(Error::InvalidConfiguration(format!(
                "initial strength must be within 1..={}, got {}",
                STRENGTH_CAP, self.rules.initial_strength
            )));
        }

        if self.rules.upkeep_cost < 0 {
            return Err(Error::InvalidConfiguration(format!(
                "upkeep cost must not be negative, got {}",
                self.rules.upkeep_cost
            )));
        }

        if self.families.is_empty() {
            return Err(Error::InvalidConfiguration(
                "at least one founding family is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for family in &self.families {
            if !seen.insert(*family) {
                return Err(Error::InvalidConfiguration(format!(
                    "family {} is listed more than once",
                    family
                )));
            }
        }

        let cells = world.width as i64 * world.height as i64;
        if self.families.len() as i64 > cells {
            return Err(Error::InvalidConfiguration(format!(
                "{} families do not fit on a {}x{} grid",
                self.families.len(),
                world.width,
                world.height
            )));
        }

        Ok(())
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading simulation config");
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
