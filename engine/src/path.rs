//! Movement paths: a piece's pending waypoints resolved into drawable points.
//!
//! Each waypoint may be anchored to a map; the grid used to draw that leg is
//! the anchor map's grid, adjusted for the map's rotation.

#[cfg(test)]
#[path = "path_test.rs"]
mod path_test;

use std::collections::BTreeMap;

use crate::doc::{Map, MovementPathPoint, ObjectId};
use crate::grid::GridType;

/// A resolved path point: world position plus the grid governing it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub grid_type: GridType,
}

/// The grid type of `map` adjusted for its rotation, or `default` when there
/// is no map or its properties aren't loaded.
#[must_use]
pub fn grid_type_of_map(map: Option<&Map>, default: GridType) -> GridType {
    map.and_then(Map::grid_type).unwrap_or(default)
}

/// Resolve each waypoint's grid type and lift it by its elevation.
#[must_use]
pub fn generate_movement_path(
    path: &[MovementPathPoint],
    maps: &BTreeMap<ObjectId, Map>,
    default_grid_type: GridType,
) -> Vec<PathPoint> {
    path.iter()
        .map(|point| {
            let grid_type = match point.on_map_id.as_deref() {
                Some(map_id) => grid_type_of_map(maps.get(map_id), default_grid_type),
                None => default_grid_type,
            };
            PathPoint { x: point.x, y: point.y + point.elevation.unwrap_or(0.0), z: point.z, grid_type }
        })
        .collect()
}

/// Single-entry memo around [`generate_movement_path`].
///
/// Only the maps a path is anchored to are remembered, so unrelated map edits
/// don't invalidate the cached points.
#[derive(Debug, Default)]
pub struct MovementPathCache {
    last: Option<CachedPath>,
}

#[derive(Debug)]
struct CachedPath {
    path: Vec<MovementPathPoint>,
    anchors: Vec<Option<Map>>,
    default_grid_type: GridType,
    points: Vec<PathPoint>,
}

fn anchor_maps(path: &[MovementPathPoint], maps: &BTreeMap<ObjectId, Map>) -> Vec<Option<Map>> {
    path.iter().map(|point| point.on_map_id.as_deref().and_then(|id| maps.get(id)).cloned()).collect()
}

impl MovementPathCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The resolved points for these inputs, recomputed only when the path,
    /// its anchor maps or the default grid changed since the last call.
    pub fn resolve(
        &mut self,
        path: &[MovementPathPoint],
        maps: &BTreeMap<ObjectId, Map>,
        default_grid_type: GridType,
    ) -> &[PathPoint] {
        let anchors = anchor_maps(path, maps);
        let fresh = self.last.as_ref().is_some_and(|last| {
            last.default_grid_type == default_grid_type && last.path == path && last.anchors == anchors
        });
        if !fresh {
            tracing::trace!(points = path.len(), "movement path recomputed");
            self.last = Some(CachedPath {
                path: path.to_vec(),
                anchors,
                default_grid_type,
                points: generate_movement_path(path, maps, default_grid_type),
            });
        }
        self.last.as_ref().map_or(&[], |last| last.points.as_slice())
    }
}
