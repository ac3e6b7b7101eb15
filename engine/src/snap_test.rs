#![allow(clippy::float_cmp)]

use std::f64::consts::PI;

use super::*;
use crate::grid::HexGridType;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn map_props(grid_type: GridType, width: f64, height: f64) -> MapProperties {
    MapProperties { grid_type, width, height, ..MapProperties::default() }
}

const GRID_TYPES: [GridType; 4] = [GridType::None, GridType::Square, GridType::HexVert, GridType::HexHorz];

fn sample_transforms() -> Vec<(Vector3, Euler)> {
    let mut samples = Vec::new();
    for i in -6..6 {
        for j in -4..4 {
            let position = Vector3::new(f64::from(i) * 0.37 + 0.05, f64::from(j) * 0.6, f64::from(j) * 0.83 - 0.11);
            samples.push((position, Euler::about_y(f64::from(i + j) * 0.41)));
        }
    }
    samples
}

// =============================================================
// Map offsets
// =============================================================

#[test]
fn square_offsets_wrap_into_unit_cell() {
    let props = MapProperties { grid_offset_x: -8.0, grid_offset_y: 40.0, ..map_props(GridType::Square, 10.0, 10.0) };
    let offsets = map_centre_offsets(false, &props);
    assert!(approx_eq(offsets.dx, 0.75));
    assert!(approx_eq(offsets.dy, 0.25));
    assert_eq!((offsets.map_dx, offsets.map_dz), (0.0, 0.0));
}

#[test]
fn square_pivot_follows_odd_map_size() {
    let offsets = map_centre_offsets(true, &map_props(GridType::Square, 5.0, 4.0));
    assert_eq!(offsets.map_dx, 0.5);
    assert_eq!(offsets.map_dz, 0.0);
}

// =============================================================
// snap_map
// =============================================================

#[test]
fn unloaded_map_passes_through_with_placeholder_size() {
    let position = Vector3::new(1.3, 0.2, -4.7);
    let rotation = Euler::about_y(0.3);
    let snapped = snap_map(true, None, position, rotation);
    assert_eq!(snapped.position, position);
    assert_eq!(snapped.rotation, rotation);
    assert_eq!((snapped.dx, snapped.dy), (0.0, 0.0));
    assert_eq!((snapped.width, snapped.height), (10.0, 10.0));
}

#[test]
fn unsnapped_map_still_reports_geometry() {
    let props = map_props(GridType::Square, 12.0, 6.0);
    let position = Vector3::new(1.3, 0.2, -4.7);
    let snapped = snap_map(false, Some(&props), position, Euler::NONE);
    assert_eq!(snapped.position, position);
    assert_eq!((snapped.width, snapped.height), (12.0, 6.0));
}

#[test]
fn square_map_snaps_to_vertices_and_right_angles() {
    let props = map_props(GridType::Square, 10.0, 10.0);
    let snapped = snap_map(true, Some(&props), Vector3::new(1.3, 0.4, 2.6), Euler::about_y(0.1));
    assert_eq!(snapped.position, Vector3::new(1.0, 0.0, 3.0));
    assert_eq!(snapped.rotation.y, 0.0);

    let turned = snap_map(true, Some(&props), Vector3::ORIGIN, Euler::about_y(1.4));
    assert!(approx_eq(turned.rotation.y, PI / 2.0));
}

#[test]
fn odd_sized_square_map_snaps_to_half_cells() {
    let props = map_props(GridType::Square, 5.0, 5.0);
    let snapped = snap_map(true, Some(&props), Vector3::new(1.3, 0.0, -0.2), Euler::NONE);
    assert_eq!(snapped.position.x, 1.5);
    assert_eq!(snapped.position.z, -0.5);
}

#[test]
fn hex_map_rotation_snaps_to_thirty_degrees() {
    let props = map_props(GridType::HexHorz, 8.0, 8.0);
    let snapped = snap_map(true, Some(&props), Vector3::ORIGIN, Euler::about_y(0.6));
    assert!(approx_eq(snapped.rotation.y, PI / 6.0));
}

#[test]
fn snap_map_is_idempotent() {
    for grid_type in GRID_TYPES {
        for (width, height) in [(10.0, 10.0), (7.0, 5.0), (12.5, 9.25)] {
            let props = MapProperties {
                grid_offset_x: 13.0,
                grid_offset_y: -5.0,
                ..map_props(grid_type, width, height)
            };
            for (position, rotation) in sample_transforms() {
                let once = snap_map(true, Some(&props), position, rotation);
                let twice = snap_map(true, Some(&props), once.position, once.rotation);
                assert_eq!(once, twice, "{grid_type:?} {width}x{height} {position:?} {rotation:?}");
            }
        }
    }
}

// =============================================================
// snap_mini
// =============================================================

#[test]
fn unsnapped_mini_passes_through() {
    let position = Vector3::new(0.3, 1.2, 0.7);
    let rotation = Euler::about_y(0.2);
    let snapped = snap_mini(false, GridType::Square, 1.7, position, 0.4, rotation);
    assert_eq!(snapped, SnappedMini { position, rotation, scale: 1.7, elevation: 0.4 });
}

#[test]
fn mini_scale_snaps_to_integers_or_unit_fractions() {
    let at = |scale| snap_mini(true, GridType::Square, scale, Vector3::ORIGIN, 0.0, Euler::NONE).scale;
    assert_eq!(at(2.4), 2.0);
    assert_eq!(at(2.5), 3.0);
    assert_eq!(at(0.6), 0.5);
    assert!(approx_eq(at(0.4), 1.0 / 3.0));
    assert_eq!(at(1.0), 1.0);
}

#[test]
fn odd_scaled_mini_centres_on_a_cell() {
    let snapped = snap_mini(true, GridType::Square, 3.0, Vector3::new(0.2, 0.0, 1.9), 0.0, Euler::NONE);
    assert_eq!(snapped.position.x, 0.5);
    assert_eq!(snapped.position.z, 1.5);
}

#[test]
fn even_scaled_mini_sits_on_a_vertex() {
    let snapped = snap_mini(true, GridType::Square, 2.0, Vector3::new(0.4, 0.0, 1.6), 0.0, Euler::NONE);
    assert_eq!(snapped.position.x, 0.0);
    assert_eq!(snapped.position.z, 2.0);
}

#[test]
fn half_scale_mini_snaps_to_half_cells() {
    let snapped = snap_mini(true, GridType::Square, 0.5, Vector3::new(0.6, 0.0, -0.1), 0.0, Euler::NONE);
    assert_eq!(snapped.position.x, 0.75);
    assert_eq!(snapped.position.z, -0.25);
}

#[test]
fn mini_rotation_step_depends_on_grid() {
    let square = snap_mini(true, GridType::Square, 1.0, Vector3::ORIGIN, 0.0, Euler::about_y(0.9));
    assert!(approx_eq(square.rotation.y, PI / 4.0));
    let hex = snap_mini(true, GridType::HexVert, 1.0, Vector3::ORIGIN, 0.0, Euler::about_y(0.9));
    assert!(approx_eq(hex.rotation.y, PI / 3.0));
}

#[test]
fn mini_elevation_and_height_round() {
    let snapped = snap_mini(true, GridType::Square, 1.0, Vector3::new(0.0, 1.6, 0.0), 2.5, Euler::NONE);
    assert_eq!(snapped.position.y, 2.0);
    assert_eq!(snapped.elevation, 3.0);
}

#[test]
fn hex_mini_lands_on_a_hex_centre() {
    let snapped = snap_mini(true, GridType::HexHorz, 1.0, Vector3::new(0.3, 0.0, 0.45), 0.0, Euler::NONE);
    let (cx, cz) = cartesian_to_hex(snapped.position.x, snapped.position.z, HexGridType::Horz).centre();
    assert!(approx_eq(cx, snapped.position.x));
    assert!(approx_eq(cz, snapped.position.z));
}

#[test]
fn snap_mini_is_idempotent() {
    for grid_type in GRID_TYPES {
        for scale in [0.5, 1.0, 2.0, 3.0] {
            for (position, rotation) in sample_transforms() {
                let once = snap_mini(true, grid_type, scale, position, position.y * 1.7, rotation);
                let twice = snap_mini(true, grid_type, once.scale, once.position, once.elevation, once.rotation);
                assert_eq!(once, twice, "{grid_type:?} scale {scale} {position:?} {rotation:?}");
            }
        }
    }
}
