//! 2D occupancy grid for the world.

use sandfall_core::{ParticleId, Position};
use serde::{Deserialize, Serialize};

/// Result of an occupancy lookup.
///
/// Out-of-bounds is a value of its own, never conflated with an empty cell:
/// the vertical edges of the world are hard boundaries, not open space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Occupied(ParticleId),
    OutOfBounds,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Cell::OutOfBounds)
    }

    /// The occupant, if this is an occupied in-bounds cell.
    pub fn particle(&self) -> Option<ParticleId> {
        match self {
            Cell::Occupied(id) => Some(*id),
            _ => None,
        }
    }
}

/// A 2D grid mapping each coordinate to at most one particle.
///
/// The horizontal axis wraps toroidally; the vertical axis does not. The
/// grid records occupancy only; particle lifecycle belongs to the world,
/// which keeps each cell consistent with its occupant's recorded position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Option<ParticleId>>,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Self {
        let size = (width * height) as usize;
        Self {
            width,
            height,
            cells: vec![None; size],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Get the occupant at `(x, y)`, wrapping `x` into `[0, width)`.
    ///
    /// Any `y` outside `[0, height)` is [`Cell::OutOfBounds`].
    pub fn get(&self, x: i32, y: i32) -> Cell {
        if y < 0 || y >= self.height {
            return Cell::OutOfBounds;
        }
        let index = self.pos_to_index(Position::new(x, y).wrap_x(self.width));
        match self.cells[index] {
            Some(id) => Cell::Occupied(id),
            None => Cell::Empty,
        }
    }

    /// Write the occupant at `(x, y)`, wrapping `x` into `[0, width)`.
    ///
    /// `y` must be in bounds; only the world's add/move/remove operations
    /// call this.
    pub(crate) fn set(&mut self, x: i32, y: i32, occupant: Option<ParticleId>) {
        debug_assert!((0..self.height).contains(&y));
        let index = self.pos_to_index(Position::new(x, y).wrap_x(self.width));
        self.cells[index] = occupant;
    }

    /// Iterate over all cells with their positions.
    pub fn iter(&self) -> impl Iterator<Item = (Position, Cell)> + '_ {
        self.cells.iter().enumerate().map(|(i, occupant)| {
            let cell = match occupant {
                Some(id) => Cell::Occupied(*id),
                None => Cell::Empty,
            };
            (self.index_to_pos(i), cell)
        })
    }

    fn pos_to_index(&self, pos: Position) -> usize {
        (pos.y * self.width + pos.x) as usize
    }

    fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.width;
        let y = (index as i32) / self.width;
        Position::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(10, 10);
        assert_eq!(grid.width(), 10);
        assert_eq!(grid.height(), 10);
        for (_, cell) in grid.iter() {
            assert_eq!(cell, Cell::Empty);
        }
    }

    #[test]
    fn test_get_set_round_trip() {
        let mut grid = Grid::new(10, 10);
        let id = ParticleId::new();

        grid.set(3, 7, Some(id));
        assert_eq!(grid.get(3, 7), Cell::Occupied(id));

        grid.set(3, 7, None);
        assert_eq!(grid.get(3, 7), Cell::Empty);
    }

    #[test]
    fn test_horizontal_wraparound() {
        let mut grid = Grid::new(10, 10);
        let left = ParticleId::new();
        let right = ParticleId::new();
        grid.set(0, 4, Some(left));
        grid.set(9, 4, Some(right));

        for y in 0..10 {
            assert_eq!(grid.get(-1, y), grid.get(9, y));
            assert_eq!(grid.get(10, y), grid.get(0, y));
        }
        assert_eq!(grid.get(-1, 4), Cell::Occupied(right));
        assert_eq!(grid.get(10, 4), Cell::Occupied(left));
    }

    #[test]
    fn test_vertical_boundary_is_sentinel() {
        let grid = Grid::new(10, 10);
        for x in -1..=10 {
            assert_eq!(grid.get(x, -1), Cell::OutOfBounds);
            assert_eq!(grid.get(x, 10), Cell::OutOfBounds);
            assert_ne!(grid.get(x, -1), Cell::Empty);
        }
        // In-bounds rows stay empty, not out-of-bounds.
        assert_eq!(grid.get(0, 0), Cell::Empty);
        assert_eq!(grid.get(0, 9), Cell::Empty);
    }

    #[test]
    fn test_cell_accessors() {
        let id = ParticleId::new();
        assert!(Cell::Empty.is_empty());
        assert!(!Cell::OutOfBounds.is_empty());
        assert!(Cell::OutOfBounds.is_out_of_bounds());
        assert_eq!(Cell::Occupied(id).particle(), Some(id));
        assert_eq!(Cell::Empty.particle(), None);
        assert_eq!(Cell::OutOfBounds.particle(), None);
    }

    proptest! {
        #[test]
        fn prop_x_lookup_is_modular(
            x in -100i32..100,
            k in -3i32..=3,
            y in 0i32..16,
        ) {
            let mut grid = Grid::new(16, 16);
            let id = ParticleId::new();
            grid.set(x, y, Some(id));
            prop_assert_eq!(grid.get(x, y), Cell::Occupied(id));
            prop_assert_eq!(grid.get(x + k * 16, y), Cell::Occupied(id));
        }

        #[test]
        fn prop_out_of_bounds_y_is_sentinel(
            x in -100i32..100,
            y in prop_oneof![(-100i32..0), (16i32..100)],
        ) {
            let grid = Grid::new(16, 16);
            prop_assert_eq!(grid.get(x, y), Cell::OutOfBounds);
        }
    }
}
