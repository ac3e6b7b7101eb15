//! Per-map fog of war.
//!
//! DESIGN
//! ======
//! Fog is a flat bitmap over the map's `fogWidth × fogHeight` cells in
//! row-major order, packed 32 cells per word: cell `i` is bit `i & 31` of word
//! `i >> 5`. A set bit means the cell is revealed. An absent or empty bitmap
//! means the whole map is revealed; in a non-empty bitmap, words missing from
//! the end read as zero, so those cells are fogged.
//!
//! Only square grids carry fog. World points are brought into bitmap space by
//! undoing the map's rotation about its position, aligning to the map's grid
//! pivot and shifting the origin to the bitmap's corner.

#[cfg(test)]
#[path = "fog_test.rs"]
mod fog_test;

use serde::{Deserialize, Deserializer, Serialize};

use crate::consts::{FOG_COVER_FOGGED, FOG_COVER_REVEALED, ROUND_VECTORS_DELTA};
use crate::doc::Map;
use crate::geom::Vector3;
use crate::grid::GridType;
use crate::metadata::MapProperties;
use crate::snap::map_centre_offsets;

// =============================================================================
// BITMAP
// =============================================================================

/// Fog bitmap as stored on a map and carried in actions.
///
/// Older clients wrote the top bit of a word as a negative 32-bit integer, so
/// deserialization accepts anything in `i32::MIN..=u32::MAX` and keeps the bit
/// pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FogBitmap(pub Vec<u32>);

impl<'de> Deserialize<'de> for FogBitmap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<i64>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|word| match u32::try_from(word) {
                Ok(word) => Ok(word),
                Err(_) => match i32::try_from(word) {
                    #[allow(clippy::cast_sign_loss)]
                    Ok(word) => Ok(word as u32),
                    Err(_) => Err(serde::de::Error::custom(format!("fog word out of range: {word}"))),
                },
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl FogBitmap {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether cell `index` is revealed, reading missing words as zero.
    fn is_revealed(&self, index: usize) -> bool {
        self.0.get(index >> 5).is_some_and(|word| word & (1 << (index & 31)) != 0)
    }
}

/// Whether cell `index` is fogged under an optional bitmap.
fn bitmap_cell_fogged(bitmap: Option<&FogBitmap>, index: usize) -> bool {
    match bitmap {
        None => false,
        Some(bitmap) if bitmap.is_empty() => false,
        Some(bitmap) => !bitmap.is_revealed(index),
    }
}

fn word_count(width: u32, height: u32) -> usize {
    cell_count(width, height).div_ceil(32)
}

fn cell_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Editable fog over a `width × height` grid of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FogOfWar {
    width: u32,
    height: u32,
    words: Vec<u32>,
}

impl FogOfWar {
    /// A fully revealed grid.
    #[must_use]
    pub fn revealed(width: u32, height: u32) -> Self {
        let mut words = vec![u32::MAX; word_count(width, height)];
        // Keep bits past the last cell clear so equal fog has equal words.
        let tail = cell_count(width, height) & 31;
        if let Some(last) = words.last_mut() {
            if tail != 0 {
                *last = (1 << tail) - 1;
            }
        }
        Self { width, height, words }
    }

    /// Start from an existing bitmap, sized to the grid.
    #[must_use]
    pub fn from_bitmap(width: u32, height: u32, bitmap: Option<&FogBitmap>) -> Self {
        match bitmap {
            Some(bitmap) if !bitmap.is_empty() => {
                let mut words = bitmap.0.clone();
                words.resize(word_count(width, height), 0);
                Self { width, height, words }
            }
            _ => Self::revealed(width, height),
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return None;
        };
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(x as usize + y as usize * self.width as usize)
    }

    /// Whether cell `(x, y)` is fogged; cells outside the grid are not.
    #[must_use]
    pub fn is_fogged(&self, x: i64, y: i64) -> bool {
        self.index(x, y).is_some_and(|index| self.words[index >> 5] & (1 << (index & 31)) == 0)
    }

    /// Fog or reveal a single cell. Cells outside the grid are ignored.
    pub fn set_cell_fogged(&mut self, x: i64, y: i64, fogged: bool) {
        let Some(index) = self.index(x, y) else {
            return;
        };
        let mask = 1 << (index & 31);
        if fogged {
            self.words[index >> 5] &= !mask;
        } else {
            self.words[index >> 5] |= mask;
        }
    }

    /// Fog or reveal every cell in the inclusive rectangle between two corners,
    /// clipped to the grid.
    pub fn set_rect(&mut self, start: (i64, i64), end: (i64, i64), fogged: bool) {
        let max_x = i64::from(self.width) - 1;
        let max_y = i64::from(self.height) - 1;
        let (x0, x1) = (start.0.min(end.0).max(0), start.0.max(end.0).min(max_x));
        let (y0, y1) = (start.1.min(end.1).max(0), start.1.max(end.1).min(max_y));
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.set_cell_fogged(x, y, fogged);
            }
        }
    }

    #[must_use]
    pub fn into_bitmap(self) -> FogBitmap {
        FogBitmap(self.words)
    }
}

// =============================================================================
// MAP SPACE
// =============================================================================

/// Round two corners outward to whole cells, per axis in the tabletop plane.
///
/// The lower corner floors; the upper corner ceils and is pulled back by a
/// small delta so it stays inside its cell.
#[must_use]
pub fn round_vectors(mut start: Vector3, mut end: Vector3) -> (Vector3, Vector3) {
    (start.x, end.x) = round_outward(start.x, end.x);
    (start.z, end.z) = round_outward(start.z, end.z);
    (start, end)
}

fn round_outward(start: f64, end: f64) -> (f64, f64) {
    if start <= end {
        (start.floor(), end.ceil() - ROUND_VECTORS_DELTA)
    } else {
        (start.ceil() - ROUND_VECTORS_DELTA, end.floor())
    }
}

/// Un-rotate two world points into the map's frame and round them to the
/// map's grid. The results are relative to the map position's grid-aligned
/// pivot, so they're in whole-cell units from the map centre.
#[must_use]
pub fn map_grid_rounded_vectors(map: &Map, start: Vector3, end: Vector3) -> (Vector3, Vector3) {
    let default_props = MapProperties::default();
    let props = map.metadata.properties.as_ref().unwrap_or(&default_props);
    let reverse = map.rotation.reversed();
    let unrotate = |point: Vector3| (point - map.position).apply_euler(&reverse) + map.position;
    let offsets = map_centre_offsets(true, props);
    let grid_offset = Vector3::new(offsets.map_dx, 0.0, offsets.map_dz);
    let grid_intersection = map.position - grid_offset;
    let (start, end) = round_vectors(unrotate(start) - grid_intersection, unrotate(end) - grid_intersection);
    (start - grid_offset, end - grid_offset)
}

/// Two corners in fog-bitmap space, plus the bitmap's size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogRect {
    pub start: Vector3,
    pub end: Vector3,
    pub fog_width: u32,
    pub fog_height: u32,
}

/// Bring two world points into the fog-bitmap space of `map`. `None` while the
/// map's properties are not loaded.
#[must_use]
pub fn map_fog_rect(map: &Map, start: Vector3, end: Vector3) -> Option<FogRect> {
    let props = map.metadata.properties.as_ref()?;
    let (start, end) = map_grid_rounded_vectors(map, start, end);
    let fog_centre = Vector3::new(f64::from(props.fog_width) / 2.0, 0.0, f64::from(props.fog_height) / 2.0);
    Some(FogRect {
        start: start + fog_centre,
        end: end + fog_centre,
        fog_width: props.fog_width,
        fog_height: props.fog_height,
    })
}

fn square_props(map: &Map) -> Option<&MapProperties> {
    map.metadata.properties.as_ref().filter(|props| props.grid_type == GridType::Square)
}

/// Whether `position` lies under fog on `map`, judged against `fog_of_war`
/// (normally the map's own bitmap).
///
/// Only square grids can be fogged. A missing map, unloaded properties, an
/// absent bitmap or a point off the bitmap all read as not fogged.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn is_map_fogged_at_position(map: Option<&Map>, position: Vector3, fog_of_war: Option<&FogBitmap>) -> bool {
    let Some(map) = map else {
        return false;
    };
    if square_props(map).is_none() || fog_of_war.is_none() {
        return false;
    }
    let Some(rect) = map_fog_rect(map, position, position) else {
        return false;
    };
    let x = (rect.start.x + 0.5).floor() as i64;
    let y = (rect.start.z + 0.5).floor() as i64;
    if x < 0 || x >= i64::from(rect.fog_width) || y < 0 || y >= i64::from(rect.fog_height) {
        return false;
    }
    #[allow(clippy::cast_sign_loss)]
    let index = x as usize + y as usize * rect.fog_width as usize;
    bitmap_cell_fogged(fog_of_war, index)
}

/// Fog or reveal the cells of `map` covered by the world-space rectangle
/// between `start` and `end`, returning the bitmap to send in an update.
/// `None` when the map can't carry fog.
#[must_use]
pub fn fog_map_rect(map: &Map, start: Vector3, end: Vector3, fogged: bool) -> Option<FogBitmap> {
    square_props(map)?;
    let rect = map_fog_rect(map, start, end)?;
    let mut fog = FogOfWar::from_bitmap(rect.fog_width, rect.fog_height, map.fog_of_war.as_ref());
    let (x0, x1) = cell_span(rect.start.x, rect.end.x);
    let (y0, y1) = cell_span(rect.start.z, rect.end.z);
    fog.set_rect((x0, y0), (x1, y1), fogged);
    Some(fog.into_bitmap())
}

/// First and last cell covered by two rounded corners along one axis.
///
/// The first cell is picked the same way [`is_map_fogged_at_position`] picks
/// its cell; the last follows from the whole-cell width between the corners.
#[allow(clippy::cast_possible_truncation)]
fn cell_span(a: f64, b: f64) -> (i64, i64) {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    let first = (low + 0.5).floor() as i64;
    let cells = (high - low + ROUND_VECTORS_DELTA).round() as i64;
    (first, first + cells.max(1) - 1)
}

// =============================================================================
// COVERAGE
// =============================================================================

/// Per-cell cover values for a fog texture: [`FOG_COVER_REVEALED`] or
/// [`FOG_COVER_FOGGED`], row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FogCoverage {
    width: u32,
    height: u32,
    cover: Vec<u8>,
}

impl FogCoverage {
    /// A fresh coverage with every cell fogged, matching a blank texture.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, cover: vec![FOG_COVER_FOGGED; cell_count(width, height)] }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn cover(&self) -> &[u8] {
        &self.cover
    }

    /// Copy `bitmap` into the cover values. Returns whether any cell changed,
    /// so the caller only re-uploads the texture when needed.
    pub fn update_from_bitmap(&mut self, bitmap: Option<&FogBitmap>) -> bool {
        let mut changed = false;
        for (index, cell) in self.cover.iter_mut().enumerate() {
            let cover = if bitmap_cell_fogged(bitmap, index) { FOG_COVER_FOGGED } else { FOG_COVER_REVEALED };
            if *cell != cover {
                *cell = cover;
                changed = true;
            }
        }
        changed
    }
}
