//! Levels: maps grouped by elevation.
//!
//! DESIGN
//! ======
//! A level is not stored anywhere. Maps within [`SAME_LEVEL_MAP_DELTA_Y`] of
//! an elevation are "on" that level, so every query here is a scan over the
//! scenario's maps. Maps are iterated in id order and every tie is broken by
//! the smallest id, so all peers agree on the answer.

#[cfg(test)]
#[path = "level_test.rs"]
mod level_test;

use std::collections::BTreeMap;

use crate::consts::{NEW_MAP_DELTA_Y, SAME_LEVEL_MAP_DELTA_Y};
use crate::doc::{Map, ObjectId};
use crate::geom::Vector3;

/// Direction of a level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelDirection {
    Up,
    Down,
}

/// Returns `true` when no other map sits on a level above `map_id`'s.
/// An absent or unknown id counts as highest.
#[must_use]
pub fn is_map_id_highest(maps: &BTreeMap<ObjectId, Map>, map_id: Option<&str>) -> bool {
    let Some((id, map)) = map_id.and_then(|id| maps.get_key_value(id)) else {
        return true;
    };
    let ceiling = map.position.y + SAME_LEVEL_MAP_DELTA_Y;
    maps.iter().all(|(other_id, other)| other_id == id || other.position.y <= ceiling)
}

/// Returns `true` when no other map sits on a level below `map_id`'s.
/// An absent or unknown id counts as lowest.
#[must_use]
pub fn is_map_id_lowest(maps: &BTreeMap<ObjectId, Map>, map_id: Option<&str>) -> bool {
    let Some((id, map)) = map_id.and_then(|id| maps.get_key_value(id)) else {
        return true;
    };
    let floor = map.position.y - SAME_LEVEL_MAP_DELTA_Y;
    maps.iter().all(|(other_id, other)| other_id == id || other.position.y > floor)
}

/// The map whose elevation is nearest zero.
#[must_use]
pub fn map_id_closest_to_zero(maps: &BTreeMap<ObjectId, Map>) -> Option<&ObjectId> {
    let mut closest: Option<(&ObjectId, f64)> = None;
    for (id, map) in maps {
        let distance = map.position.y.abs();
        // Ids arrive in ascending order, so only a strictly closer map wins.
        if closest.is_none_or(|(_, best)| distance < best) {
            closest = Some((id, distance));
        }
    }
    closest.map(|(id, _)| id)
}

/// Ids of the maps on the level at `elevation`, bounds inclusive.
#[must_use]
pub fn map_ids_at_level(maps: &BTreeMap<ObjectId, Map>, elevation: f64) -> Vec<&ObjectId> {
    let low = elevation - SAME_LEVEL_MAP_DELTA_Y;
    let high = elevation + SAME_LEVEL_MAP_DELTA_Y;
    maps.iter()
        .filter(|(_, map)| map.position.y >= low && map.position.y <= high)
        .map(|(id, _)| id)
        .collect()
}

/// The map a camera should centre on for a level, and the explicit focus
/// point chosen on that level if any map declares one.
///
/// `elevation` defaults to the elevation of the map closest to zero. The focus
/// map is the highest map on the level. The focus point comes from the map
/// whose declared point is highest, offset from that map's position and lifted
/// to the focus map's elevation.
#[must_use]
pub fn focus_map_id_and_focus_point_at_level(
    maps: &BTreeMap<ObjectId, Map>,
    elevation: Option<f64>,
) -> (Option<ObjectId>, Option<Vector3>) {
    let elevation = elevation.unwrap_or_else(|| {
        map_id_closest_to_zero(maps).and_then(|id| maps.get(id)).map_or(0.0, |map| map.position.y)
    });
    let mut focus: Option<(&ObjectId, &Map)> = None;
    let mut camera: Option<(&Map, Vector3)> = None;
    for id in map_ids_at_level(maps, elevation) {
        let Some(map) = maps.get(id) else {
            continue;
        };
        if focus.is_none_or(|(_, best)| map.position.y > best.position.y) {
            focus = Some((id, map));
        }
        if let Some(point) = map.camera_focus_point
            && camera.is_none_or(|(_, best)| point.y > best.y)
        {
            camera = Some((map, point));
        }
    }
    let Some((focus_id, focus_map)) = focus else {
        return (None, None);
    };
    let point = camera.map(|(map, offset)| {
        Vector3::new(map.position.x + offset.x, focus_map.position.y, map.position.z + offset.z)
    });
    (Some(focus_id.clone()), point)
}

/// The nearest map on the next level in `direction` from `map_id` (or from
/// elevation zero when absent).
///
/// The search window starts one level away and, when `limit` is set, ends
/// [`NEW_MAP_DELTA_Y`] away. An unknown `map_id` has no next level.
#[must_use]
pub fn map_id_on_next_level(
    direction: LevelDirection,
    maps: &BTreeMap<ObjectId, Map>,
    map_id: Option<&str>,
    limit: bool,
) -> Option<ObjectId> {
    let start = match map_id {
        None => 0.0,
        Some(id) => maps.get(id)?.position.y,
    };
    let (floor, ceiling) = match direction {
        LevelDirection::Up => {
            (start + SAME_LEVEL_MAP_DELTA_Y, if limit { start + NEW_MAP_DELTA_Y } else { f64::INFINITY })
        }
        LevelDirection::Down => {
            (if limit { start - NEW_MAP_DELTA_Y } else { f64::NEG_INFINITY }, start - SAME_LEVEL_MAP_DELTA_Y)
        }
    };
    let mut best: Option<(&ObjectId, f64)> = None;
    for (id, map) in maps {
        let y = map.position.y;
        if y < floor || y > ceiling {
            continue;
        }
        let nearer = match (direction, best) {
            (_, None) => true,
            (LevelDirection::Up, Some((_, best_y))) => y < best_y,
            (LevelDirection::Down, Some((_, best_y))) => y > best_y,
        };
        if nearer {
            best = Some((id, y));
        }
    }
    best.map(|(id, _)| id.clone())
}
