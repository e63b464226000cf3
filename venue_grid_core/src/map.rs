use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::{EntityId, Position};

/// Represents errors that can occur within grid and occupancy operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Coordinates ({x}, {y}) are out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("Tile ({x}, {y}) is already occupied by entity {occupant}")]
    AlreadyOccupied {
        x: usize,
        y: usize,
        occupant: EntityId,
    },
}

/// A generic, fixed-size 2D grid.
///
/// Stores elements of type `T` in a flat vector using row-major order. The
/// dimensions are set once at construction and never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid whose cells are produced by `f(x, y)`, visited in
    /// row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn from_generator<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        let mut cells = Vec::with_capacity(size);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Grid {
            width,
            height,
            cells,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Checks if the given coordinates are within the grid boundaries.
    #[inline]
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Converts (x, y) coordinates to a flat vector index, or `None` if the
    /// coordinates are out of bounds.
    #[inline]
    pub fn coords_to_index(&self, x: usize, y: usize) -> Option<usize> {
        self.is_valid(x, y).then(|| y * self.width + x)
    }

    /// Like [`Grid::coords_to_index`], but reports the failure as a
    /// [`GridError::OutOfBounds`].
    pub fn checked_index(&self, x: usize, y: usize) -> Result<usize, GridError> {
        self.coords_to_index(x, y).ok_or(GridError::OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        })
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        let index = self.coords_to_index(x, y)?;
        self.cells.get(index)
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        let index = self.coords_to_index(x, y)?;
        self.cells.get_mut(index)
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (Position::new(index % width, index / width), cell))
    }

    /// In-bounds cells within `radius` (Chebyshev) of `center`, the center
    /// included. The window is clipped at the grid edges.
    pub fn window(&self, center: Position, radius: usize) -> impl Iterator<Item = (Position, &T)> {
        let x_min = center.x.saturating_sub(radius);
        let y_min = center.y.saturating_sub(radius);
        let x_max = center.x.saturating_add(radius).min(self.width.saturating_sub(1));
        let y_max = center.y.saturating_add(radius).min(self.height.saturating_sub(1));
        (y_min..=y_max)
            .flat_map(move |y| (x_min..=x_max).map(move |x| Position::new(x, y)))
            .filter_map(move |pos| self.get(pos.x, pos.y).map(|cell| (pos, cell)))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }
}

/// Indexing using Position coordinates for access.
///
/// Panics on out-of-bounds positions; use [`Grid::get`] for fallible access.
impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: Position) -> &Self::Output {
        match self.coords_to_index(index.x, index.y) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                index.x, index.y, self.width, self.height
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_fills_row_major() {
        let grid = Grid::from_generator(3, 2, |x, y| x + 10 * y);
        assert_eq!(grid.as_slice(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(grid[Position::new(2, 1)], 12);
    }

    #[test]
    fn checked_index_reports_dimensions() {
        let grid = Grid::from_generator(4, 3, |_, _| 0u8);
        assert_eq!(grid.checked_index(3, 2), Ok(11));
        assert_eq!(
            grid.checked_index(4, 0),
            Err(GridError::OutOfBounds {
                x: 4,
                y: 0,
                width: 4,
                height: 3
            })
        );
        assert!(grid.get(0, 3).is_none());
    }

    #[test]
    fn window_is_clipped_at_corner() {
        let grid = Grid::from_generator(10, 10, |_, _| 0u8);
        assert_eq!(grid.window(Position::new(0, 0), 2).count(), 9);
        assert_eq!(grid.window(Position::new(5, 5), 2).count(), 25);
        assert_eq!(grid.window(Position::new(9, 5), 2).count(), 15);
    }

    #[test]
    fn window_on_empty_grid_yields_nothing() {
        let grid = Grid::from_generator(0, 0, |_, _| 0u8);
        assert_eq!(grid.window(Position::new(0, 0), 2).count(), 0);
    }

    #[test]
    fn enumerate_yields_positions() {
        let grid = Grid::from_generator(2, 2, |x, y| (x, y));
        for (pos, cell) in grid.enumerate() {
            assert_eq!((pos.x, pos.y), *cell);
        }
    }
}
