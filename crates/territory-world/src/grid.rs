//! 2D occupancy grid for the world.

use territory_core::{BoundaryPolicy, Direction, Error, OrganismId, Position, Result, WorldConfig};
use serde::{Deserialize, Serialize};

/// A fixed-size grid holding at most one organism per cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    boundary: BoundaryPolicy,
    cells: Vec<Option<OrganismId>>,
    occupied: usize,
}

impl Grid {
    pub fn new(width: i32, height: i32, boundary: BoundaryPolicy) -> Self {
        let size = (width.max(0) as usize) * (height.max(0) as usize);
        Self {
            width,
            height,
            boundary,
            cells: vec![None; size],
            occupied: 0,
        }
    }

    /// Create an empty grid from world configuration
    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.width, config.height, config.boundary)
    }

    pub fn boundary(&self) -> BoundaryPolicy {
        self.boundary
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    /// Put `id` on an empty cell
    pub fn place(&mut self, id: OrganismId, pos: Position) -> Result<()> {
        let index = self.checked_index(pos)?;
        if self.cells[index].is_some() {
            return Err(Error::OccupiedCell { x: pos.x, y: pos.y });
        }
        self.cells[index] = Some(id);
        self.occupied += 1;
        Ok(())
    }

    /// Clear a cell, returning whatever was there
    pub fn remove(&mut self, pos: Position) -> Result<Option<OrganismId>> {
        let index = self.checked_index(pos)?;
        let previous = self.cells[index].take();
        if previous.is_some() {
            self.occupied -= 1;
        }
        Ok(previous)
    }

    pub fn occupant(&self, pos: Position) -> Result<Option<OrganismId>> {
        let index = self.checked_index(pos)?;
        Ok(self.cells[index])
    }

    /// Move the occupant of `from` onto the empty cell `to`
    pub fn move_occupant(&mut self, from: Position, to: Position) -> Result<()> {
        let to_index = self.checked_index(to)?;
        if self.cells[to_index].is_some() {
            return Err(Error::OccupiedCell { x: to.x, y: to.y });
        }
        let from_index = self.checked_index(from)?;
        self.cells[to_index] = self.cells[from_index].take();
        Ok(())
    }

    /// Orthogonally adjacent coordinates of `pos` under the grid's boundary policy.
    ///
    /// Bounded grids drop off-grid neighbors. Toroidal grids wrap them, and on
    /// grids one or two cells wide a wrapped neighbor can repeat or be `pos`
    /// itself; those are filtered out.
    pub fn valid_neighbors(&self, pos: Position) -> Vec<Position> {
        let mut neighbors = Vec::with_capacity(4);

        for direction in Direction::all() {
            let (dx, dy) = direction.to_delta();
            let candidate = pos.add(dx, dy);
            let neighbor = match self.boundary {
                BoundaryPolicy::Bounded if self.contains(candidate) => candidate,
                BoundaryPolicy::Bounded => continue,
                BoundaryPolicy::Toroidal => candidate.wrap(self.width, self.height),
            };

            if neighbor != pos && !neighbors.contains(&neighbor) {
                neighbors.push(neighbor);
            }
        }

        neighbors
    }

    /// Neighbors of `pos` with no occupant
    pub fn empty_neighbors(&self, pos: Position) -> Vec<Position> {
        self.valid_neighbors(pos)
            .into_iter()
            .filter(|neighbor| self.cells[self.pos_to_index(*neighbor)].is_none())
            .collect()
    }

    /// All unoccupied cells in row-major order
    pub fn empty_cells(&self) -> Vec<Position> {
        self.iter()
            .filter(|(_, occupant)| occupant.is_none())
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn is_full(&self) -> bool {
        self.occupied == self.cells.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn checked_index(&self, pos: Position) -> Result<usize> {
        if !self.contains(pos) {
            return Err(Error::OutOfBounds {
                x: pos.x,
                y: pos.y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self.pos_to_index(pos))
    }

    fn pos_to_index(&self, pos: Position) -> usize {
        (pos.y * self.width + pos.x) as usize
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.width;
        let y = (index as i32) / self.width;
        Position::new(x, y)
    }

    /// Iterator over all positions
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(move |i| self.index_to_pos(i))
    }

    /// Iterator over all cells with positions
    pub fn iter(&self) -> impl Iterator<Item = (Position, Option<OrganismId>)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (self.index_to_pos(i), *cell))
    }
}
