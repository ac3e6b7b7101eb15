//! Hit-testing points against maps.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use std::collections::BTreeMap;

use crate::consts::MAP_EPSILON;
use crate::doc::{Map, ObjectId};
use crate::geom::Vector3;

/// Returns `true` when `point` lies on `map`: at the map's elevation and
/// inside its rotated rectangle. Near edges are inclusive, far edges exclusive.
///
/// A map whose properties aren't loaded has no extent and contains nothing.
#[must_use]
pub fn map_contains_point(map: &Map, point: Vector3) -> bool {
    if (point.y - map.position.y).abs() >= MAP_EPSILON {
        return false;
    }
    let Some(props) = map.metadata.properties.as_ref() else {
        return false;
    };
    let (sin, cos) = map.rotation.y.sin_cos();
    let dx = point.x - map.position.x;
    let dz = point.z - map.position.z;
    let local_x = dx * cos - dz * sin;
    let local_z = dz * cos + dx * sin;
    let (half_w, half_h) = (props.width / 2.0, props.height / 2.0);
    (-half_w..half_w).contains(&local_x) && (-half_h..half_h).contains(&local_z)
}

/// The first map, in id order, that `point` lies on.
#[must_use]
pub fn map_id_at_point<'a>(point: Vector3, maps: &'a BTreeMap<ObjectId, Map>) -> Option<&'a ObjectId> {
    maps.iter().find(|(_, map)| map_contains_point(map, point)).map(|(id, _)| id)
}
