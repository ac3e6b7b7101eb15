//! Grid topologies and cartesian ↔ cell coordinate transforms.
//!
//! DESIGN
//! ======
//! Cell space is expressed in "stride" units: a square cell is 1×1, and a hex
//! grid is laid out on a lattice whose strides give regular hexagons with unit
//! distance between neighbouring centres. Hex lookup splits the axis that
//! zig-zags between rows into thirds and resolves the two ambiguous thirds
//! with a parity-dependent diagonal test, so every point belongs to exactly
//! one hex.

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;

use serde::{Deserialize, Serialize};

use crate::consts::{INV_SQRT3, MAP_ROTATION_HEX_SNAP};

/// Grid topology drawn on a map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GridType {
    /// No grid; nothing snaps.
    None,
    /// Unit squares.
    #[default]
    Square,
    /// Hexes in vertical columns (pointy top).
    HexVert,
    /// Hexes in horizontal rows (flat top).
    HexHorz,
}

impl GridType {
    /// The hex orientation of this grid, or `None` for non-hex grids.
    #[must_use]
    pub fn as_hex(self) -> Option<HexGridType> {
        match self {
            Self::HexVert => Some(HexGridType::Vert),
            Self::HexHorz => Some(HexGridType::Horz),
            Self::None | Self::Square => None,
        }
    }

    #[must_use]
    pub fn is_hex(self) -> bool {
        self.as_hex().is_some()
    }
}

/// The two hex orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HexGridType {
    Vert,
    Horz,
}

impl HexGridType {
    /// The other orientation.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Vert => Self::Horz,
            Self::Horz => Self::Vert,
        }
    }
}

impl From<HexGridType> for GridType {
    fn from(hex: HexGridType) -> Self {
        match hex {
            HexGridType::Vert => GridType::HexVert,
            HexGridType::Horz => GridType::HexHorz,
        }
    }
}

// =============================================================================
// STRIDES AND CELL LOOKUP
// =============================================================================

/// Cartesian size of one lattice step along each axis.
#[must_use]
pub fn grid_stride(grid_type: GridType) -> (f64, f64) {
    match grid_type {
        GridType::HexVert => (1.5 * INV_SQRT3, 0.5),
        GridType::HexHorz => (0.5, 1.5 * INV_SQRT3),
        GridType::None | GridType::Square => (1.0, 1.0),
    }
}

/// Square cell containing `(x, y)`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn square_cell(x: f64, y: f64) -> (i64, i64) {
    let (stride_x, stride_y) = grid_stride(GridType::Square);
    ((x / stride_x).floor() as i64, (y / stride_y).floor() as i64)
}

/// A hex cell and its centre, all in stride units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexCoords {
    pub hex_x: i64,
    pub hex_y: i64,
    pub centre_x: f64,
    pub centre_y: f64,
    pub stride_x: f64,
    pub stride_y: f64,
}

impl HexCoords {
    /// Cartesian position of the cell centre.
    #[must_use]
    pub fn centre(&self) -> (f64, f64) {
        (self.centre_x * self.stride_x, self.centre_y * self.stride_y)
    }
}

#[allow(clippy::cast_precision_loss)]
fn is_above_hex_diagonal(
    coord_straight: f64,
    coord_zigzag: f64,
    hex_straight: i64,
    hex_zigzag: i64,
    straight_size: f64,
    zigzag_size: f64,
) -> bool {
    if hex_zigzag % 3 != 0 {
        false
    } else if (hex_straight + hex_zigzag) & 1 != 0 {
        coord_zigzag < zigzag_size / 3.0 * (coord_straight / straight_size + (hex_zigzag - hex_straight) as f64)
    } else {
        coord_zigzag < zigzag_size / 3.0 * (1.0 + (hex_zigzag + hex_straight) as f64 - coord_straight / straight_size)
    }
}

/// Hex cell containing the cartesian point `(x, y)`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn cartesian_to_hex(x: f64, y: f64, hex: HexGridType) -> HexCoords {
    let (stride_x, stride_y) = grid_stride(hex.into());
    let (mut hex_straight, hex_zigzag, above) = match hex {
        HexGridType::Vert => {
            let zigzag = (3.0 * x / stride_x).floor() as i64;
            let straight = (y / stride_y).floor() as i64;
            (straight, zigzag, is_above_hex_diagonal(y, x, straight, zigzag, stride_y, stride_x))
        }
        HexGridType::Horz => {
            let straight = (x / stride_x).floor() as i64;
            let zigzag = (3.0 * y / stride_y).floor() as i64;
            (straight, zigzag, is_above_hex_diagonal(x, y, straight, zigzag, stride_x, stride_y))
        }
    };
    let mut hex_zigzag = hex_zigzag.div_euclid(3);
    if above {
        hex_zigzag -= 1;
    }
    if hex_zigzag & 1 != 0 {
        if hex_straight & 1 == 0 {
            hex_straight -= 1;
        }
    } else {
        hex_straight &= !1;
    }
    match hex {
        HexGridType::Vert => HexCoords {
            hex_x: hex_zigzag,
            hex_y: hex_straight,
            centre_x: hex_zigzag as f64 + 2.0 / 3.0,
            centre_y: hex_straight as f64 + 1.0,
            stride_x,
            stride_y,
        },
        HexGridType::Horz => HexCoords {
            hex_x: hex_straight,
            hex_y: hex_zigzag,
            centre_x: hex_straight as f64 + 1.0,
            centre_y: hex_zigzag as f64 + 2.0 / 3.0,
            stride_x,
            stride_y,
        },
    }
}

/// Orientation a hex grid presents after being rotated by `rotation` radians
/// about the vertical axis. Every odd multiple of 30° swaps the orientation.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn effective_hex_grid_type(rotation: f64, hex: HexGridType) -> HexGridType {
    let steps = (rotation / MAP_ROTATION_HEX_SNAP).round() as i64;
    if steps.rem_euclid(2) == 0 { hex } else { hex.flipped() }
}

/// [`effective_hex_grid_type`] lifted to any grid type; non-hex grids are
/// unaffected by rotation.
#[must_use]
pub fn effective_grid_type(rotation: f64, grid_type: GridType) -> GridType {
    grid_type
        .as_hex()
        .map_or(grid_type, |hex| effective_hex_grid_type(rotation, hex).into())
}

// =============================================================================
// SPIRALS
// =============================================================================

/// Infinite spiral of square-cell offsets around the origin, origin excluded.
#[derive(Debug, Clone)]
pub struct SquareSpiral {
    horizontal: bool,
    step: i64,
    delta: i64,
    x: i64,
    y: i64,
}

impl SquareSpiral {
    #[must_use]
    pub fn new() -> Self {
        Self { horizontal: true, step: 1, delta: 1, x: 0, y: 0 }
    }
}

impl Default for SquareSpiral {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for SquareSpiral {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.horizontal {
            self.x += self.delta;
            if 2 * self.x * self.delta >= self.step {
                self.horizontal = false;
            }
        } else {
            self.y += self.delta;
            if 2 * self.y * self.delta >= self.step {
                self.horizontal = true;
                self.delta = -self.delta;
                self.step += 1;
            }
        }
        Some((self.x, self.y))
    }
}

const HEX_HORZ_PATH: [(f64, f64); 6] = [
    (1.0, 0.0),
    (0.5, 1.5 * INV_SQRT3),
    (-0.5, 1.5 * INV_SQRT3),
    (-1.0, 0.0),
    (-0.5, -1.5 * INV_SQRT3),
    (0.5, -1.5 * INV_SQRT3),
];

const HEX_VERT_PATH: [(f64, f64); 6] = [
    (1.5 * INV_SQRT3, 0.5),
    (0.0, 1.0),
    (-1.5 * INV_SQRT3, 0.5),
    (-1.5 * INV_SQRT3, -0.5),
    (0.0, -1.0),
    (1.5 * INV_SQRT3, -0.5),
];

/// Infinite spiral of hex-centre offsets around the origin, origin excluded.
#[derive(Debug, Clone)]
pub struct HexSpiral {
    path: &'static [(f64, f64); 6],
    x: f64,
    y: f64,
    side_length: usize,
    direction: usize,
    step: usize,
}

impl HexSpiral {
    #[must_use]
    pub fn new(hex: HexGridType) -> Self {
        let path = match hex {
            HexGridType::Horz => &HEX_HORZ_PATH,
            HexGridType::Vert => &HEX_VERT_PATH,
        };
        Self { path, x: 0.0, y: 0.0, side_length: 1, direction: 0, step: 0 }
    }
}

impl Iterator for HexSpiral {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.step < self.side_length {
                let (dx, dy) = self.path[self.direction];
                self.step += 1;
                self.x += dx;
                self.y += dy;
                return Some((self.x, self.y));
            }
            self.direction += 1;
            if self.direction >= self.path.len() {
                self.direction = 0;
                self.side_length += 1;
            }
            // The second side is one shorter so the ring closes into a spiral.
            self.step = usize::from(self.direction == 1);
        }
    }
}
