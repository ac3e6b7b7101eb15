//! Shared numeric constants for the engine crate.

use std::f64::consts::PI;

// ── Math ────────────────────────────────────────────────────────

/// 1 / √3, the hex stride factor for regular hexagons.
pub const INV_SQRT3: f64 = 0.577_350_269_189_625_8;

// ── Snapping ────────────────────────────────────────────────────

/// Map rotation step on square grids (90°).
pub const MAP_ROTATION_SNAP: f64 = PI / 2.0;

/// Map rotation step on hex grids (30°). Each step flips hex orientation.
pub const MAP_ROTATION_HEX_SNAP: f64 = PI / 6.0;

/// Mini rotation step on square grids (45°).
pub const MINI_SQUARE_ROTATION_SNAP: f64 = PI / 4.0;

/// Mini rotation step on hex grids (60°).
pub const MINI_HEX_ROTATION_SNAP: f64 = PI / 3.0;

/// Width and height reported for a map whose properties are not loaded yet.
pub const UNLOADED_MAP_SIZE: f64 = 10.0;

// ── Fog of war ──────────────────────────────────────────────────

/// Pulled off the "ceiling" side of a rounded rectangle so float error never
/// spills into the next cell.
pub const ROUND_VECTORS_DELTA: f64 = 0.01;

/// Texture cover value for a revealed fog cell.
pub const FOG_COVER_REVEALED: u8 = 255;

/// Texture cover value for a fogged cell.
pub const FOG_COVER_FOGGED: u8 = 0;

// ── Levels ──────────────────────────────────────────────────────

/// Maps whose elevations differ by at most this much share a level.
pub const SAME_LEVEL_MAP_DELTA_Y: f64 = 1.5;

/// Bound on the search for the next level up or down.
pub const NEW_MAP_DELTA_Y: f64 = 6.0;

/// Vertical tolerance when deciding whether a point lies on a map.
pub const MAP_EPSILON: f64 = 0.01;

// ── Replication ─────────────────────────────────────────────────

/// Head action id assumed for scenarios saved before head tracking existed.
pub const LEGACY_ACTION_ID: &str = "legacyAction";
