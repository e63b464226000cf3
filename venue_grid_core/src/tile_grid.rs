use std::f64::consts::SQRT_2;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    EntityId, Position,
    map::{Grid, GridError},
    tile::{Tile, TileType},
};

/// Cells around a destination (Chebyshev radius) sampled for crowd density.
pub const DENSITY_RADIUS: usize = 2;
/// Extra cost per unit of occupancy ratio when density is considered.
pub const DENSITY_WEIGHT: f64 = 0.5;
/// Multiplier for stepping onto a door tile.
pub const DOOR_PENALTY: f64 = 2.0;

const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Spatial ground truth for the venue: tile classification, occupancy
/// bookkeeping and per-step movement costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    tiles: Grid<Tile>,
}

impl TileGrid {
    /// Creates a grid of `Empty`, unoccupied tiles.
    pub fn new(width: usize, height: usize) -> Self {
        Self::from_fn(width, height, |_, _| TileType::Empty)
    }

    /// Creates a grid whose tile types are produced by `f(x, y)`.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> TileType,
    {
        TileGrid {
            tiles: Grid::from_generator(width, height, |x, y| Tile::new(Position::new(x, y), f(x, y))),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.tiles.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.tiles.height()
    }

    #[inline]
    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        self.tiles.is_valid(x, y)
    }

    /// Read-only view of the underlying tiles.
    pub fn tiles(&self) -> &Grid<Tile> {
        &self.tiles
    }

    pub fn get_tile(&self, x: usize, y: usize) -> Result<&Tile, GridError> {
        let index = self.tiles.checked_index(x, y)?;
        Ok(&self.tiles.as_slice()[index])
    }

    fn tile_mut(&mut self, x: usize, y: usize) -> Result<&mut Tile, GridError> {
        let width = self.width();
        let height = self.height();
        self.tiles.get_mut(x, y).ok_or(GridError::OutOfBounds {
            x,
            y,
            width,
            height,
        })
    }

    /// Replaces the tile's type, re-deriving its flags, and empties its
    /// occupant slot.
    pub fn set_tile(&mut self, x: usize, y: usize, tile_type: TileType) -> Result<(), GridError> {
        let tile = self.tile_mut(x, y)?;
        tile.retype(tile_type);
        tile.occupant = None;
        Ok(())
    }

    /// Whether `(x, y)` is in bounds and walkable. Out-of-bounds cells are
    /// simply not walkable.
    pub fn is_walkable(&self, x: usize, y: usize) -> bool {
        self.tiles.get(x, y).is_some_and(Tile::walkable)
    }

    pub fn is_occupied(&self, x: usize, y: usize) -> Result<bool, GridError> {
        Ok(self.get_tile(x, y)?.is_occupied())
    }

    pub fn get_occupant(&self, x: usize, y: usize) -> Result<Option<EntityId>, GridError> {
        Ok(self.get_tile(x, y)?.occupant())
    }

    /// Claims the tile for `id`.
    ///
    /// Fails with [`GridError::AlreadyOccupied`] if the slot holds anyone,
    /// `id` included, and leaves the existing occupant in place.
    pub fn set_occupant(&mut self, x: usize, y: usize, id: EntityId) -> Result<(), GridError> {
        let tile = self.tile_mut(x, y)?;
        if let Some(occupant) = tile.occupant {
            warn!("entity {id} tried to claim ({x}, {y}) held by {occupant}");
            return Err(GridError::AlreadyOccupied { x, y, occupant });
        }
        tile.occupant = Some(id);
        Ok(())
    }

    /// Empties the tile's occupant slot. Clearing an empty slot is a no-op.
    pub fn clear_occupant(&mut self, x: usize, y: usize) -> Result<(), GridError> {
        self.tile_mut(x, y)?.occupant = None;
        Ok(())
    }

    /// Moves `id` from `from` to `to` as a clear-then-claim pair.
    ///
    /// The destination is checked first, so a held destination leaves both
    /// tiles untouched. The source slot is only cleared if it holds `id`.
    pub fn move_occupant(&mut self, id: EntityId, from: Position, to: Position) -> Result<(), GridError> {
        self.get_tile(from.x, from.y)?;
        match self.get_occupant(to.x, to.y)? {
            Some(occupant) if occupant == id && from == to => return Ok(()),
            Some(occupant) => {
                return Err(GridError::AlreadyOccupied {
                    x: to.x,
                    y: to.y,
                    occupant,
                });
            }
            None => {}
        }
        if self.get_occupant(from.x, from.y)? == Some(id) {
            self.clear_occupant(from.x, from.y)?;
        }
        self.set_occupant(to.x, to.y, id)
    }

    /// In-bounds, walkable cells among the eight surrounding `(x, y)`.
    ///
    /// Does not apply the corner-cutting rule; the search engine does its
    /// own neighbour expansion.
    pub fn walkable_neighbors(&self, x: usize, y: usize) -> Result<Vec<Position>, GridError> {
        self.tiles.checked_index(x, y)?;
        let origin = Position::new(x, y);
        Ok(NEIGHBOR_OFFSETS
            .iter()
            .filter_map(|&(dx, dy)| origin.offset(dx, dy))
            .filter(|pos| self.is_walkable(pos.x, pos.y))
            .collect())
    }

    /// Fraction of occupied tiles in the window of `radius` around `(x, y)`,
    /// counting only tiles that exist on the grid.
    pub fn occupancy_ratio(&self, x: usize, y: usize, radius: usize) -> Result<f64, GridError> {
        self.tiles.checked_index(x, y)?;
        Ok(self.window_ratio(Position::new(x, y), radius))
    }

    fn window_ratio(&self, center: Position, radius: usize) -> f64 {
        let (total, occupied) = self
            .tiles
            .window(center, radius)
            .fold((0usize, 0usize), |(total, occupied), (_, tile)| {
                (total + 1, occupied + usize::from(tile.is_occupied()))
            });
        if total == 0 {
            0.0
        } else {
            occupied as f64 / total as f64
        }
    }

    /// Cost of a single step from `(from_x, from_y)` to `(to_x, to_y)`.
    ///
    /// Returns `f64::INFINITY` when either endpoint is off the grid or the
    /// destination is not walkable. Orthogonal steps cost 1, diagonal steps
    /// √2; a door destination doubles the cost and `consider_density`
    /// scales it by `1 + ratio * 0.5`. Only the destination tile is
    /// inspected, so `cost(a, b)` and `cost(b, a)` may differ.
    pub fn movement_cost(
        &self,
        from_x: usize,
        from_y: usize,
        to_x: usize,
        to_y: usize,
        consider_density: bool,
    ) -> f64 {
        if !self.in_bounds(from_x, from_y) {
            return f64::INFINITY;
        }
        let Some(dest) = self.tiles.get(to_x, to_y) else {
            return f64::INFINITY;
        };
        if !dest.walkable() {
            return f64::INFINITY;
        }

        let diagonal = from_x != to_x && from_y != to_y;
        let mut cost = if diagonal { SQRT_2 } else { 1.0 };

        if dest.tile_type() == TileType::Door {
            cost *= DOOR_PENALTY;
        }
        if consider_density {
            cost *= 1.0 + self.window_ratio(Position::new(to_x, to_y), DENSITY_RADIUS) * DENSITY_WEIGHT;
        }
        cost
    }

    /// Finds all positions holding a tile of the given type.
    pub fn positions_of(&self, tile_type: TileType) -> Vec<Position> {
        self.tiles
            .enumerate()
            .filter(|(_, tile)| tile.tile_type() == tile_type)
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.is_occupied()).count()
    }
}
