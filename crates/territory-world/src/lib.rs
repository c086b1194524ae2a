//! World simulation engine.
//!
//! This module implements the 2D grid world where organisms move, compete for
//! resources, cooperate with kin, fight strangers, reproduce and die.

pub mod grid;
pub mod organism;
pub mod resource;
pub mod interaction;
pub mod simulation;
pub mod snapshot;

pub use grid::Grid;
pub use organism::Organism;
pub use resource::{Resource, ResourceField};
pub use interaction::Outcome;
pub use simulation::Simulation;
pub use snapshot::{RunSummary, StepEvent, StepSnapshot, Termination};
