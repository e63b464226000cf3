use serde::{Deserialize, Serialize};

use crate::{EntityId, Position};

/// The static type of a venue tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileType {
    /// Unassigned space. Behaves like open floor.
    #[default]
    Empty,
    Floor,
    DanceFloor,
    Wall,
    /// Walkable, but doorways are congestion points and cost double to enter.
    Door,
    Bar,
    Toilet,
    Stage,
    Vip,
    Entrance,
}

/// Flags derived from a [`TileType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileProperties {
    pub walkable: bool,
    pub interactable: bool,
    pub connects_spaces: bool,
}

impl TileProperties {
    const OPEN: TileProperties = TileProperties {
        walkable: true,
        interactable: false,
        connects_spaces: false,
    };
    const BLOCKED: TileProperties = TileProperties {
        walkable: false,
        interactable: false,
        connects_spaces: false,
    };
    const FIXTURE: TileProperties = TileProperties {
        walkable: false,
        interactable: true,
        connects_spaces: false,
    };
}

impl TileType {
    /// Looks up the fixed walkability/interaction table for this type.
    pub const fn properties(self) -> TileProperties {
        match self {
            TileType::Empty | TileType::Floor | TileType::DanceFloor => TileProperties::OPEN,
            TileType::Wall => TileProperties::BLOCKED,
            TileType::Door => TileProperties {
                walkable: true,
                interactable: false,
                connects_spaces: true,
            },
            TileType::Bar | TileType::Toilet | TileType::Stage | TileType::Vip => {
                TileProperties::FIXTURE
            }
            TileType::Entrance => TileProperties {
                walkable: true,
                interactable: true,
                connects_spaces: true,
            },
        }
    }

    /// Two-letter code used by venue layout files.
    pub const fn code(self) -> &'static str {
        match self {
            TileType::Empty => "..",
            TileType::Floor => "FL",
            TileType::DanceFloor => "DF",
            TileType::Wall => "WL",
            TileType::Door => "DR",
            TileType::Bar => "BR",
            TileType::Toilet => "TL",
            TileType::Stage => "SG",
            TileType::Vip => "VP",
            TileType::Entrance => "EN",
        }
    }

    pub fn from_code(code: &str) -> Option<TileType> {
        let tile_type = match code {
            ".." => TileType::Empty,
            "FL" => TileType::Floor,
            "DF" => TileType::DanceFloor,
            "WL" | "WA" => TileType::Wall,
            "DR" => TileType::Door,
            "BR" => TileType::Bar,
            "TL" => TileType::Toilet,
            "SG" => TileType::Stage,
            "VP" => TileType::Vip,
            "EN" => TileType::Entrance,
            _ => return None,
        };
        Some(tile_type)
    }
}

/// A single cell of the venue.
///
/// The three flags are only ever written together with `tile_type`, through
/// [`Tile::new`] or [`Tile::retype`], so they can't drift from the type table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    position: Position,
    tile_type: TileType,
    walkable: bool,
    interactable: bool,
    connects_spaces: bool,
    pub(crate) occupant: Option<EntityId>,
}

impl Tile {
    pub fn new(position: Position, tile_type: TileType) -> Self {
        let props = tile_type.properties();
        Tile {
            position,
            tile_type,
            walkable: props.walkable,
            interactable: props.interactable,
            connects_spaces: props.connects_spaces,
            occupant: None,
        }
    }

    /// Replaces the type and re-derives every flag. Occupancy is left alone.
    pub(crate) fn retype(&mut self, tile_type: TileType) {
        let props = tile_type.properties();
        self.tile_type = tile_type;
        self.walkable = props.walkable;
        self.interactable = props.interactable;
        self.connects_spaces = props.connects_spaces;
    }

    pub fn position(&self) -> Position {
        self.position
    }
    pub fn tile_type(&self) -> TileType {
        self.tile_type
    }
    pub fn walkable(&self) -> bool {
        self.walkable
    }
    pub fn interactable(&self) -> bool {
        self.interactable
    }
    pub fn connects_spaces(&self) -> bool {
        self.connects_spaces
    }
    pub fn occupant(&self) -> Option<EntityId> {
        self.occupant
    }
    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TileType; 10] = [
        TileType::Empty,
        TileType::Floor,
        TileType::DanceFloor,
        TileType::Wall,
        TileType::Door,
        TileType::Bar,
        TileType::Toilet,
        TileType::Stage,
        TileType::Vip,
        TileType::Entrance,
    ];

    #[test]
    fn property_table() {
        assert!(TileType::DanceFloor.properties().walkable);
        assert!(!TileType::Wall.properties().walkable);

        let door = TileType::Door.properties();
        assert!(door.walkable && door.connects_spaces && !door.interactable);

        for fixture in [TileType::Bar, TileType::Toilet, TileType::Stage, TileType::Vip] {
            let props = fixture.properties();
            assert!(!props.walkable, "{fixture:?} should block movement");
            assert!(props.interactable);
        }

        let entrance = TileType::Entrance.properties();
        assert!(entrance.walkable && entrance.interactable && entrance.connects_spaces);
        assert_eq!(TileType::default().properties(), TileType::Floor.properties());
    }

    #[test]
    fn codes_are_reversible() {
        for tile_type in ALL {
            assert_eq!(TileType::from_code(tile_type.code()), Some(tile_type));
        }
        assert_eq!(TileType::from_code("??"), None);
    }

    #[test]
    fn retype_keeps_occupant_and_rederives_flags() {
        let mut tile = Tile::new(Position::new(1, 1), TileType::Floor);
        tile.occupant = Some(7);
        tile.retype(TileType::Bar);
        assert!(!tile.walkable());
        assert!(tile.interactable());
        assert_eq!(tile.occupant(), Some(7));
    }
}
