use crate::{Position, tile::TileType, tile_grid::TileGrid};

/// Errors raised while parsing a venue layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("Layout string is empty.")]
    Empty,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown tile code '{code}' at position ({x}, {y}).")]
    UnknownCode { code: String, x: usize, y: usize },
}

/// A parsed venue: its tiles plus the entrances patrons arrive through.
#[derive(Debug, Clone)]
pub struct VenueLayout {
    pub grid: TileGrid,
    pub entrances: Vec<Position>,
}

/// Loads a venue from whitespace-separated two-letter tile codes, one row per
/// line. See [`TileType::code`] for the codes.
pub fn load_venue_from_string(layout: &str) -> Result<VenueLayout, LayoutError> {
    let lines: Vec<&str> = layout
        .trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.is_empty() {
        return Err(LayoutError::Empty);
    }

    let mut width = 0;
    let mut rows: Vec<Vec<TileType>> = Vec::with_capacity(lines.len());

    for (y, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if y == 0 {
            width = tokens.len();
        } else if tokens.len() != width {
            return Err(LayoutError::RaggedRow {
                row: y,
                expected: width,
                found: tokens.len(),
            });
        }

        let row = tokens
            .iter()
            .enumerate()
            .map(|(x, token)| {
                TileType::from_code(token).ok_or_else(|| LayoutError::UnknownCode {
                    code: token.to_string(),
                    x,
                    y,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }

    let grid = TileGrid::from_fn(width, rows.len(), |x, y| rows[y][x]);
    let entrances = grid.positions_of(TileType::Entrance);
    Ok(VenueLayout { grid, entrances })
}

/// Renders a grid back into layout codes, one row per line.
pub fn venue_to_string(grid: &TileGrid) -> String {
    let mut out = String::new();
    for y in 0..grid.height() {
        let row: Vec<&str> = (0..grid.width())
            .filter_map(|x| grid.get_tile(x, y).ok())
            .map(|tile| tile.tile_type().code())
            .collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    out
}
