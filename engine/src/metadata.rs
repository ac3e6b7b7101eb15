//! File metadata attached to maps and pieces.
//!
//! DESIGN
//! ======
//! Every map and mini references a backing file by `metadata.id`. The full
//! metadata record (name, properties) lives in an external store and is
//! collapsed to `{id}` whenever a scenario is persisted or transported.
//!
//! Properties are a closed record per object kind. Raw JSON from the store
//! passes through a validating constructor (`TryFrom<Value>`), which accepts
//! numbers written as strings but rejects values the geometry code cannot use
//! (for example a zero grid size) with [`MetadataError::Malformed`]. Serde
//! deserialization is routed through the same constructor.

#[cfg(test)]
#[path = "metadata_test.rs"]
mod metadata_test;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::consts::UNLOADED_MAP_SIZE;
use crate::grid::GridType;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetadataError {
    #[error("malformed {kind} metadata: {reason}")]
    Malformed { kind: &'static str, reason: String },
}

impl MetadataError {
    fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed { kind, reason: reason.into() }
    }
}

/// Metadata reference carried by a map or mini.
///
/// `properties` is `None` until the full record has been fetched from the
/// metadata store; callers fall back to neutral defaults in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de>"))]
pub struct Metadata<P> {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<P>,
}

impl<P> Metadata<P> {
    #[must_use]
    pub fn id_only(id: impl Into<String>) -> Self {
        Self { id: id.into(), name: None, properties: None }
    }

    /// This metadata collapsed to an `{id}` reference.
    #[must_use]
    pub fn reduced(&self) -> Self {
        Self::id_only(self.id.clone())
    }
}

/// An untyped metadata record as held by the external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetadata {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Value,
}

impl RawMetadata {
    /// Cast this record into typed metadata for a map or a piece.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Malformed`] when the properties fail validation.
    pub fn cast<P>(&self) -> Result<Metadata<P>, MetadataError>
    where
        P: TryFrom<Value, Error = MetadataError>,
    {
        let properties = if self.properties.is_null() { None } else { Some(P::try_from(self.properties.clone())?) };
        Ok(Metadata { id: self.id.clone(), name: self.name.clone(), properties })
    }
}

impl<P> Metadata<P>
where
    P: TryFrom<Value, Error = MetadataError>,
{
    /// Overlay the fields present in `raw` onto this metadata.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Malformed`] when the new properties fail
    /// validation; `self` is left unchanged in that case.
    pub fn merge(&mut self, raw: &RawMetadata) -> Result<(), MetadataError> {
        if !raw.properties.is_null() {
            self.properties = Some(P::try_from(raw.properties.clone())?);
        }
        if raw.name.is_some() {
            self.name.clone_from(&raw.name);
        }
        Ok(())
    }
}

// =============================================================================
// MAP PROPERTIES
// =============================================================================

/// Grid and size information for a map image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Value")]
pub struct MapProperties {
    pub grid_type: GridType,
    /// Pixels per grid cell in the source image.
    pub grid_size: f64,
    pub grid_offset_x: f64,
    pub grid_offset_y: f64,
    /// Width in grid cells.
    pub width: f64,
    /// Height in grid cells.
    pub height: f64,
    pub fog_width: u32,
    pub fog_height: u32,
    pub show_grid: bool,
    pub grid_colour: String,
}

impl Default for MapProperties {
    fn default() -> Self {
        Self {
            grid_type: GridType::Square,
            grid_size: 32.0,
            grid_offset_x: 0.0,
            grid_offset_y: 0.0,
            width: UNLOADED_MAP_SIZE,
            height: UNLOADED_MAP_SIZE,
            fog_width: 10,
            fog_height: 10,
            show_grid: false,
            grid_colour: "black".to_owned(),
        }
    }
}

impl MapProperties {
    /// The grid colour as a 24-bit RGB value.
    #[must_use]
    pub fn grid_colour_hex(&self) -> Option<u32> {
        colour_hex(&self.grid_colour)
    }
}

impl TryFrom<Value> for MapProperties {
    type Error = MetadataError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        const KIND: &str = "map";
        let obj = as_object(KIND, &value)?;
        let grid_type = match obj.get("gridType") {
            None | Some(Value::Null) => GridType::Square,
            Some(raw) => serde_json::from_value(raw.clone())
                .map_err(|e| MetadataError::malformed(KIND, format!("gridType: {e}")))?,
        };
        let grid_size = number_field(KIND, obj, "gridSize", 32.0)?;
        if grid_size <= 0.0 {
            return Err(MetadataError::malformed(KIND, format!("gridSize must be positive, got {grid_size}")));
        }
        let width = number_field(KIND, obj, "width", UNLOADED_MAP_SIZE)?;
        let height = number_field(KIND, obj, "height", UNLOADED_MAP_SIZE)?;
        if width < 0.0 || height < 0.0 {
            return Err(MetadataError::malformed(KIND, "width and height must not be negative"));
        }
        Ok(Self {
            grid_type,
            grid_size,
            grid_offset_x: number_field(KIND, obj, "gridOffsetX", 0.0)?,
            grid_offset_y: number_field(KIND, obj, "gridOffsetY", 0.0)?,
            width,
            height,
            fog_width: count_field(KIND, obj, "fogWidth", width.ceil())?,
            fog_height: count_field(KIND, obj, "fogHeight", height.ceil())?,
            show_grid: obj.get("showGrid").and_then(Value::as_bool).unwrap_or(false),
            grid_colour: obj.get("gridColour").and_then(Value::as_str).unwrap_or("black").to_owned(),
        })
    }
}

// =============================================================================
// PIECE PROPERTIES
// =============================================================================

/// Properties of a standee miniature image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniProperties {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

impl Default for MiniProperties {
    fn default() -> Self {
        Self { width: 1.0, height: 1.0, scale: 1.0 }
    }
}

/// Outline of an area-of-effect template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateShape {
    Rectangle,
    Circle,
    Arc,
    Icon,
}

/// Properties of a template piece.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateProperties {
    pub template_shape: TemplateShape,
    pub colour: u32,
    pub opacity: f64,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    /// Arc angle in degrees; only meaningful for [`TemplateShape::Arc`].
    pub angle: f64,
}

/// Properties of a piece: a miniature or a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PieceProperties {
    Mini(MiniProperties),
    Template(TemplateProperties),
}

impl PieceProperties {
    #[must_use]
    pub fn is_template(&self) -> bool {
        matches!(self, Self::Template(_))
    }
}

impl<'de> Deserialize<'de> for PieceProperties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<Value> for PieceProperties {
    type Error = MetadataError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let obj = as_object("piece", &value)?;
        match obj.get("templateShape") {
            None | Some(Value::Null) => {
                const KIND: &str = "mini";
                let scale = number_field(KIND, obj, "scale", 1.0)?;
                if scale <= 0.0 {
                    return Err(MetadataError::malformed(KIND, format!("scale must be positive, got {scale}")));
                }
                Ok(Self::Mini(MiniProperties {
                    width: number_field(KIND, obj, "width", 1.0)?,
                    height: number_field(KIND, obj, "height", 1.0)?,
                    scale,
                }))
            }
            Some(shape) => {
                const KIND: &str = "template";
                let template_shape = serde_json::from_value(shape.clone())
                    .map_err(|e| MetadataError::malformed(KIND, format!("templateShape: {e}")))?;
                Ok(Self::Template(TemplateProperties {
                    template_shape,
                    colour: count_field(KIND, obj, "colour", 0.0)?,
                    opacity: number_field(KIND, obj, "opacity", 1.0)?,
                    width: number_field(KIND, obj, "width", 1.0)?,
                    height: number_field(KIND, obj, "height", 0.0)?,
                    depth: number_field(KIND, obj, "depth", 1.0)?,
                    angle: number_field(KIND, obj, "angle", 60.0)?,
                }))
            }
        }
    }
}

// =============================================================================
// COLOURS
// =============================================================================

const NAMED_COLOURS: [(&str, u32); 11] = [
    ("black", 0x00_0000),
    ("grey", 0x9b_9b9b),
    ("white", 0xff_ffff),
    ("brown", 0x8b_572a),
    ("tan", 0xc7_7f16),
    ("red", 0xff_0000),
    ("yellow", 0xff_ff00),
    ("green", 0x00_ff00),
    ("cyan", 0x00_ffff),
    ("blue", 0x00_00ff),
    ("magenta", 0xff_00ff),
];

/// Resolve a named grid colour or a `#rrggbb` / `rrggbb` string to RGB.
/// An empty string is black.
#[must_use]
pub fn colour_hex(colour: &str) -> Option<u32> {
    if colour.is_empty() {
        return Some(0);
    }
    if let Some((_, hex)) = NAMED_COLOURS.iter().find(|(name, _)| *name == colour) {
        return Some(*hex);
    }
    let digits = colour.strip_prefix('#').unwrap_or(colour);
    match u32::from_str_radix(digits, 16) {
        Ok(hex) => Some(hex),
        Err(_) => None,
    }
}

// =============================================================================
// FIELD HELPERS
// =============================================================================

fn as_object<'a>(kind: &'static str, value: &'a Value) -> Result<&'a Map<String, Value>, MetadataError> {
    value
        .as_object()
        .ok_or_else(|| MetadataError::malformed(kind, "properties must be an object"))
}

/// Read a numeric field that may also be written as a numeric string.
fn number_field(kind: &'static str, obj: &Map<String, Value>, key: &str, default: f64) -> Result<f64, MetadataError> {
    let parsed = match obj.get(key) {
        None | Some(Value::Null) => return Ok(default),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(default),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(n) => Some(n),
            Err(_) => None,
        },
        Some(_) => None,
    };
    match parsed {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(MetadataError::malformed(kind, format!("{key} is not a number"))),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count_field(kind: &'static str, obj: &Map<String, Value>, key: &str, default: f64) -> Result<u32, MetadataError> {
    let n = number_field(kind, obj, key, default)?;
    if n < 0.0 || n > f64::from(u32::MAX) {
        return Err(MetadataError::malformed(kind, format!("{key} is out of range: {n}")));
    }
    Ok(n.round() as u32)
}
