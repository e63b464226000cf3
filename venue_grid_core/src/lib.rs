//! Tile map, occupancy tracking and crowd-aware A* pathfinding for a venue
//! simulation.

use serde::{Deserialize, Serialize};

pub mod heap;
pub mod layout;
pub mod map;
pub mod pathfinding;
pub mod tile;
pub mod tile_grid;

pub use layout::{LayoutError, VenueLayout, load_venue_from_string};
pub use map::{Grid, GridError};
pub use pathfinding::{PathOptions, Pathfinder, SearchOutcome, SearchStats};
pub use tile::{Tile, TileProperties, TileType};
pub use tile_grid::TileGrid;

/// Unique identifier for anything that can occupy a tile (patrons, staff).
pub type EntityId = usize;

/// Represents a 2D grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Returns the position shifted by `(dx, dy)`, or `None` if either axis
    /// would go below zero.
    pub fn offset(self, dx: isize, dy: isize) -> Option<Position> {
        Some(Position {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }

    /// Chebyshev distance: the number of king moves between two cells.
    pub fn chebyshev(self, other: Position) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}
