#![allow(clippy::float_cmp)]

use std::f64::consts::PI;

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Sample points on a lattice that doesn't line up with either hex stride.
fn sample_points() -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    for i in -25..25 {
        for j in -25..25 {
            points.push((f64::from(i) * 0.173 + 0.011, f64::from(j) * 0.191 - 0.007));
        }
    }
    points
}

// =============================================================
// GridType
// =============================================================

#[test]
fn grid_type_wire_names() {
    let cases = [
        (GridType::None, "\"NONE\""),
        (GridType::Square, "\"SQUARE\""),
        (GridType::HexVert, "\"HEX_VERT\""),
        (GridType::HexHorz, "\"HEX_HORZ\""),
    ];
    for (grid_type, expected) in cases {
        assert_eq!(serde_json::to_string(&grid_type).unwrap(), expected);
        let back: GridType = serde_json::from_str(expected).unwrap();
        assert_eq!(back, grid_type);
    }
}

#[test]
fn only_hex_grids_have_hex_orientation() {
    assert_eq!(GridType::HexVert.as_hex(), Some(HexGridType::Vert));
    assert_eq!(GridType::HexHorz.as_hex(), Some(HexGridType::Horz));
    assert_eq!(GridType::Square.as_hex(), None);
    assert!(!GridType::None.is_hex());
}

// =============================================================
// Strides
// =============================================================

#[test]
fn square_stride_is_unit() {
    assert_eq!(grid_stride(GridType::Square), (1.0, 1.0));
    assert_eq!(grid_stride(GridType::None), (1.0, 1.0));
}

#[test]
fn hex_strides_are_transposed() {
    let (vx, vy) = grid_stride(GridType::HexVert);
    let (hx, hy) = grid_stride(GridType::HexHorz);
    assert!(approx_eq(vx, hy));
    assert!(approx_eq(vy, hx));
    assert!(approx_eq(vx, 1.5 / 3.0_f64.sqrt()));
}

#[test]
fn square_cell_floors_negative_coordinates() {
    assert_eq!(square_cell(0.5, 0.5), (0, 0));
    assert_eq!(square_cell(-0.1, 2.9), (-1, 2));
}

// =============================================================
// Hex lookup
// =============================================================

#[test]
fn hex_origin_cell_horizontal() {
    let coords = cartesian_to_hex(0.1, 0.1, HexGridType::Horz);
    assert_eq!((coords.hex_x, coords.hex_y), (-1, -1));
    let (cx, cy) = coords.centre();
    assert!(approx_eq(cx, 0.0));
    assert!(approx_eq(cy, -INV_SQRT3 / 2.0));
}

#[test]
fn hex_centre_round_trips_to_same_cell() {
    for hex in [HexGridType::Vert, HexGridType::Horz] {
        for (x, y) in sample_points() {
            let first = cartesian_to_hex(x, y, hex);
            let (cx, cy) = first.centre();
            let second = cartesian_to_hex(cx, cy, hex);
            assert_eq!(
                (first.hex_x, first.hex_y),
                (second.hex_x, second.hex_y),
                "{hex:?} point ({x}, {y}) centre ({cx}, {cy})"
            );
        }
    }
}

#[test]
fn hex_point_is_within_circumradius_of_its_centre() {
    // Neighbouring centres are one unit apart, so the circumradius is 1/√3.
    for hex in [HexGridType::Vert, HexGridType::Horz] {
        for (x, y) in sample_points() {
            let (cx, cy) = cartesian_to_hex(x, y, hex).centre();
            let distance = (x - cx).hypot(y - cy);
            assert!(distance <= INV_SQRT3 + EPSILON, "{hex:?} ({x}, {y}) is {distance} from ({cx}, {cy})");
        }
    }
}

#[test]
fn hex_cell_parity_matches_row() {
    for (x, y) in sample_points() {
        let coords = cartesian_to_hex(x, y, HexGridType::Horz);
        assert_eq!(coords.hex_x.rem_euclid(2), coords.hex_y.rem_euclid(2), "({x}, {y})");
    }
}

// =============================================================
// Effective orientation
// =============================================================

#[test]
fn thirty_degree_rotation_flips_hex_orientation() {
    assert_eq!(effective_hex_grid_type(PI / 6.0, HexGridType::Vert), HexGridType::Horz);
    assert_eq!(effective_hex_grid_type(PI / 6.0, HexGridType::Horz), HexGridType::Vert);
}

#[test]
fn sixty_degree_rotation_keeps_hex_orientation() {
    assert_eq!(effective_hex_grid_type(PI / 3.0, HexGridType::Vert), HexGridType::Vert);
    assert_eq!(effective_hex_grid_type(0.0, HexGridType::Horz), HexGridType::Horz);
}

#[test]
fn rotation_near_a_step_counts_as_that_step() {
    let step = PI / 6.0;
    assert_eq!(effective_hex_grid_type(step - 1e-9, HexGridType::Vert), HexGridType::Horz);
    assert_eq!(effective_hex_grid_type(step + 1e-9, HexGridType::Vert), HexGridType::Horz);
    assert_eq!(effective_hex_grid_type(2.0 * step - 1e-9, HexGridType::Vert), HexGridType::Vert);
    assert_eq!(effective_hex_grid_type(step * 0.4, HexGridType::Vert), HexGridType::Vert);
    assert_eq!(effective_hex_grid_type(step * 0.6, HexGridType::Vert), HexGridType::Horz);
}

#[test]
fn negative_rotation_flips_on_odd_steps() {
    assert_eq!(effective_hex_grid_type(-PI / 6.0, HexGridType::Vert), HexGridType::Horz);
    assert_eq!(effective_hex_grid_type(-PI / 2.0, HexGridType::Vert), HexGridType::Horz);
}

#[test]
fn effective_grid_type_ignores_rotation_for_square() {
    assert_eq!(effective_grid_type(PI / 6.0, GridType::Square), GridType::Square);
    assert_eq!(effective_grid_type(PI / 6.0, GridType::HexVert), GridType::HexHorz);
}

// =============================================================
// Spirals
// =============================================================

#[test]
fn square_spiral_first_ring() {
    let first: Vec<(i64, i64)> = SquareSpiral::new().take(8).collect();
    assert_eq!(first, vec![(1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1)]);
}

#[test]
fn square_spiral_never_repeats_early() {
    let cells: Vec<(i64, i64)> = SquareSpiral::new().take(48).collect();
    let mut unique = cells.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), cells.len());
    assert!(!cells.contains(&(0, 0)));
}

#[test]
fn hex_spiral_first_ring_is_unit_distance() {
    for hex in [HexGridType::Vert, HexGridType::Horz] {
        let ring: Vec<(f64, f64)> = HexSpiral::new(hex).take(6).collect();
        for (x, y) in &ring {
            assert!(approx_eq(x.hypot(*y), 1.0), "{hex:?} ({x}, {y})");
        }
    }
}

#[test]
fn hex_spiral_points_are_hex_centres() {
    let hex = HexGridType::Horz;
    let origin = cartesian_to_hex(0.0, 0.0, hex).centre();
    let mut seen = Vec::new();
    for (dx, dy) in HexSpiral::new(hex).take(30) {
        let coords = cartesian_to_hex(origin.0 + dx, origin.1 + dy, hex);
        let (cx, cy) = coords.centre();
        assert!(approx_eq(cx, origin.0 + dx) && approx_eq(cy, origin.1 + dy));
        assert!(!seen.contains(&(coords.hex_x, coords.hex_y)));
        seen.push((coords.hex_x, coords.hex_y));
    }
}
