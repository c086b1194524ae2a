//! Per-step resource placement and consumption.

use crate::grid::Grid;
use rand::seq::index;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use territory_core::Position;

/// Smallest value a resource can carry
pub const MIN_RESOURCE_VALUE: i32 = 1;
/// Largest value a resource can carry
pub const MAX_RESOURCE_VALUE: i32 = 10;

/// A reward waiting on one cell for the current step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub position: Position,
    pub value: i32,
}

/// Number of resources generated per step: `round(width * height * density)`
pub fn resource_count(width: i32, height: i32, density: f64) -> usize {
    let cells = width.max(0) as usize * height.max(0) as usize;
    let count = (cells as f64 * density.clamp(0.0, 1.0)).round() as usize;
    count.min(cells)
}

/// Draw a resource value uniformly from the allowed range
pub fn random_value(rng: &mut ChaCha8Rng) -> i32 {
    rng.gen_range(MIN_RESOURCE_VALUE..=MAX_RESOURCE_VALUE)
}

/// The batch of resources available during a single step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceField {
    pending: Vec<Resource>,
}

impl ResourceField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the batch with a fresh one at distinct random cells
    pub fn generate(&mut self, grid: &Grid, density: f64, rng: &mut ChaCha8Rng) {
        let count = resource_count(grid.width, grid.height, density);
        let cells = grid.cell_count();

        self.pending.clear();
        for cell in index::sample(rng, cells, count).into_iter() {
            let position = grid.index_to_pos(cell);
            let value = random_value(rng);
            self.pending.push(Resource { position, value });
        }
    }

    /// Take the resource at `position`, if any. Each resource can be taken once.
    pub fn consume_if_present(&mut self, position: Position) -> Option<i32> {
        let index = self.pending.iter().position(|r| r.position == position)?;
        Some(self.pending.remove(index).value)
    }

    pub fn value_at(&self, position: Position) -> Option<i32> {
        self.pending
            .iter()
            .find(|r| r.position == position)
            .map(|r| r.value)
    }

    pub fn pending(&self) -> &[Resource] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop everything left over from the step
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use territory_core::BoundaryPolicy;

    #[test]
    fn test_resource_count() {
        assert_eq!(resource_count(10, 10, 0.0), 0);
        assert_eq!(resource_count(10, 10, 0.25), 25);
        assert_eq!(resource_count(5, 5, 0.1), 3);
        assert_eq!(resource_count(3, 3, 1.0), 9);
    }

    #[test]
    fn test_generate_distinct_positions() {
        let grid = Grid::new(6, 6, BoundaryPolicy::Bounded);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut field = ResourceField::new();
        field.generate(&grid, 0.5, &mut rng);

        assert_eq!(field.len(), 18);
        let positions: HashSet<_> = field.pending().iter().map(|r| r.position).collect();
        assert_eq!(positions.len(), 18);
        for resource in field.pending() {
            assert!(grid.contains(resource.position));
            assert!((MIN_RESOURCE_VALUE..=MAX_RESOURCE_VALUE).contains(&resource.value));
        }
    }

    #[test]
    fn test_full_density_covers_grid() {
        let grid = Grid::new(4, 3, BoundaryPolicy::Bounded);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut field = ResourceField::new();
        field.generate(&grid, 1.0, &mut rng);

        assert_eq!(field.len(), 12);
        for pos in grid.positions() {
            assert!(field.value_at(pos).is_some());
        }
    }

    #[test]
    fn test_generate_replaces_previous_batch() {
        let grid = Grid::new(5, 5, BoundaryPolicy::Bounded);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut field = ResourceField::new();
        field.generate(&grid, 0.4, &mut rng);
        field.generate(&grid, 0.0, &mut rng);
        assert!(field.is_empty());
    }

    #[test]
    fn test_consume_once() {
        let grid = Grid::new(4, 4, BoundaryPolicy::Bounded);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut field = ResourceField::new();
        field.generate(&grid, 0.25, &mut rng);

        let target = field.pending()[0];
        assert_eq!(field.consume_if_present(target.position), Some(target.value));
        assert_eq!(field.consume_if_present(target.position), None);
        assert_eq!(field.len(), 3);
    }

    #[test]
    fn test_same_seed_same_batch() {
        let grid = Grid::new(8, 8, BoundaryPolicy::Bounded);
        let mut a = ResourceField::new();
        let mut b = ResourceField::new();
        a.generate(&grid, 0.3, &mut ChaCha8Rng::seed_from_u64(11));
        b.generate(&grid, 0.3, &mut ChaCha8Rng::seed_from_u64(11));
        assert_eq!(a.pending(), b.pending());
    }
}
