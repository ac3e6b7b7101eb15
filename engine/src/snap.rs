//! Snapping of map and piece transforms to their grid.
//!
//! DESIGN
//! ======
//! Both entry points are pure functions of (grid properties, transform) and
//! are idempotent: snapping an already-snapped transform reproduces it bit
//! for bit, because replicated actions may carry transforms that were snapped
//! on another peer.
//!
//! A map rotates around a grid-aligned pivot (the grid vertex or hex nearest
//! its centre), not around its bounding-box centre, so that a snapped map
//! stays snapped after rotation. The pivot is un-rotated before quantizing
//! and re-applied afterwards.

#[cfg(test)]
#[path = "snap_test.rs"]
mod snap_test;

use crate::consts::{
    MAP_ROTATION_HEX_SNAP, MAP_ROTATION_SNAP, MINI_HEX_ROTATION_SNAP, MINI_SQUARE_ROTATION_SNAP,
    UNLOADED_MAP_SIZE,
};
use crate::geom::{Euler, Vector3, round_half_up};
use crate::grid::{GridType, cartesian_to_hex, effective_hex_grid_type, grid_stride};
use crate::metadata::MapProperties;

/// Grid offset and rotation pivot of a map, in grid units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapCentreOffsets {
    /// Offset of the grid inside the map image along x.
    pub dx: f64,
    /// Offset of the grid inside the map image along y (world z).
    pub dy: f64,
    /// Offset from the map's centre to its rotation pivot along world x.
    pub map_dx: f64,
    /// Offset from the map's centre to its rotation pivot along world z.
    pub map_dz: f64,
}

/// Compute a map's grid offset, and when `snap` is set its rotation pivot.
#[must_use]
pub fn map_centre_offsets(snap: bool, props: &MapProperties) -> MapCentreOffsets {
    let offset_x = props.grid_offset_x / props.grid_size;
    let offset_y = props.grid_offset_y / props.grid_size;
    let hex = props.grid_type.as_hex();
    let (dx, dy) = if hex.is_some() {
        let (stride_x, stride_y) = grid_stride(props.grid_type);
        (offset_x % (2.0 * stride_x), offset_y % (2.0 * stride_y))
    } else {
        ((1.0 + offset_x) % 1.0, (1.0 + offset_y) % 1.0)
    };
    let (mut map_dx, mut map_dz) = (0.0, 0.0);
    if snap {
        let centre_x = props.width / 2.0;
        let centre_y = props.height / 2.0;
        if let Some(hex) = hex {
            #[allow(clippy::cast_precision_loss)]
            {
                let coords = cartesian_to_hex(centre_x, centre_y, hex);
                map_dx = centre_x - (coords.hex_x as f64 * coords.stride_x + dx);
                map_dz = centre_y - (coords.hex_y as f64 * coords.stride_y + dy);
            }
        } else {
            map_dx = centre_x % 1.0 - dx;
            map_dz = centre_y % 1.0 - dy;
        }
    }
    MapCentreOffsets { dx, dy, map_dx, map_dz }
}

/// A map transform after snapping, plus the geometry the renderer needs
/// whether or not snapping is on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnappedMap {
    pub position: Vector3,
    pub rotation: Euler,
    pub dx: f64,
    pub dy: f64,
    pub width: f64,
    pub height: f64,
}

/// Snap a map's position and rotation to its own grid.
///
/// Without properties the transform passes through with a placeholder size.
#[must_use]
pub fn snap_map(snap: bool, props: Option<&MapProperties>, position: Vector3, rotation: Euler) -> SnappedMap {
    let Some(props) = props else {
        return SnappedMap {
            position,
            rotation,
            dx: 0.0,
            dy: 0.0,
            width: UNLOADED_MAP_SIZE,
            height: UNLOADED_MAP_SIZE,
        };
    };
    let MapCentreOffsets { dx, dy, map_dx, map_dz } = map_centre_offsets(snap, props);
    if !snap {
        return SnappedMap { position, rotation, dx, dy, width: props.width, height: props.height };
    }
    let hex = props.grid_type.as_hex();
    let rotation_snap = if hex.is_some() { MAP_ROTATION_HEX_SNAP } else { MAP_ROTATION_SNAP };
    let map_rotation = round_half_up(rotation.y / rotation_snap) * rotation_snap;
    let (sin, cos) = map_rotation.sin_cos();
    let pivot_x = cos * map_dx + sin * map_dz;
    let pivot_z = cos * map_dz - sin * map_dx;
    let (x, z) = if let Some(hex) = hex {
        let snap_hex = effective_hex_grid_type(map_rotation, hex);
        let (centre_x, centre_z) = cartesian_to_hex(position.x - pivot_x, position.z - pivot_z, snap_hex).centre();
        (centre_x + pivot_x, centre_z + pivot_z)
    } else {
        (round_half_up(position.x - pivot_x) + pivot_x, round_half_up(position.z - pivot_z) + pivot_z)
    };
    SnappedMap {
        position: Vector3::new(x, round_half_up(position.y), z),
        rotation: Euler { y: map_rotation, ..rotation },
        dx,
        dy,
        width: props.width,
        height: props.height,
    }
}

/// A piece transform after snapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnappedMini {
    pub position: Vector3,
    pub rotation: Euler,
    pub scale: f64,
    pub elevation: f64,
}

/// Snap a piece's scale, position, rotation and elevation to `grid_type`.
#[must_use]
pub fn snap_mini(
    snap: bool,
    grid_type: GridType,
    scale_factor: f64,
    position: Vector3,
    elevation: f64,
    rotation: Euler,
) -> SnappedMini {
    if !snap {
        return SnappedMini { position, rotation, scale: scale_factor, elevation };
    }
    let scale = if scale_factor > 1.0 {
        round_half_up(scale_factor)
    } else {
        1.0 / round_half_up(1.0 / scale_factor)
    };
    // Pieces larger than a cell move a whole cell at a time; smaller ones
    // move in steps of their own size.
    let grid_snap = if scale > 1.0 { 1.0 } else { scale };
    let (x, z, rotation_snap) = if let Some(hex) = grid_type.as_hex() {
        let (centre_x, centre_z) = cartesian_to_hex(position.x / grid_snap, position.z / grid_snap, hex).centre();
        (centre_x * grid_snap, centre_z * grid_snap, MINI_HEX_ROTATION_SNAP)
    } else {
        // Odd-sized pieces centre on a cell rather than a vertex.
        let offset = (scale / 2.0) % 1.0;
        (
            round_half_up((position.x - offset) / grid_snap) * grid_snap + offset,
            round_half_up((position.z - offset) / grid_snap) * grid_snap + offset,
            MINI_SQUARE_ROTATION_SNAP,
        )
    };
    SnappedMini {
        position: Vector3::new(x, round_half_up(position.y), z),
        rotation: Euler { y: round_half_up(rotation.y / rotation_snap) * rotation_snap, ..rotation },
        scale,
        elevation: round_half_up(elevation),
    }
}
