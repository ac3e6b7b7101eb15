//! Document model: maps, pieces, and the scenario that owns them.
//!
//! This module defines the records that describe what is on the tabletop
//! (`Map`, `Mini`), the sparse-update types carried by replicated actions
//! (`MapPatch`, `MiniPatch`), and the `Scenario` tree that the reducer in
//! [`crate::action`] replaces one action at a time.
//!
//! DESIGN
//! ======
//! Objects are keyed by id in ordered maps so that every peer iterates,
//! breaks ties and serializes in the same order.
//!
//! A patch field that can be cleared on the wire (for example `attachMiniId`
//! when a piece is detached) is an `Option<Option<T>>`: absent means "leave
//! alone", `null` means "clear".
//!
//! Pieces can be attached to other pieces. Chains are walked iteratively with
//! a visited set; a cycle surfaces as [`AttachmentError::Cycle`] rather than
//! looping.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::fog::FogBitmap;
use crate::geom::{Euler, Vector3};
use crate::grid::{GridType, effective_grid_type};
use crate::metadata::{MapProperties, Metadata, PieceProperties};
use crate::roster::RosterValues;
use crate::snap::{SnappedMini, snap_mini};

/// Unique identifier for a map or piece.
pub type ObjectId = String;

/// Deserialize a field that distinguishes "absent" from `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn default_scale() -> f64 {
    1.0
}

// =============================================================================
// MAPS
// =============================================================================

/// A map image laid on the tabletop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Map {
    #[serde(default)]
    pub name: String,
    pub metadata: Metadata<MapProperties>,
    #[serde(default)]
    pub position: Vector3,
    #[serde(default)]
    pub rotation: Euler,
    #[serde(default)]
    pub gm_only: bool,
    #[serde(default)]
    pub selected_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fog_of_war: Option<FogBitmap>,
    /// Explicit camera target, as an offset from the map's position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_focus_point: Option<Vector3>,
    /// Whether the last positional update was made with snap-to-grid on.
    #[serde(default)]
    pub snapping: bool,
}

impl Map {
    /// A new GM-only map at the origin.
    #[must_use]
    pub fn new(metadata: Metadata<MapProperties>) -> Self {
        Self {
            name: String::new(),
            metadata,
            position: Vector3::ORIGIN,
            rotation: Euler::NONE,
            gm_only: true,
            selected_by: None,
            fog_of_war: None,
            camera_focus_point: None,
            snapping: false,
        }
    }

    /// Build a map from a patch. Returns `None` when the patch carries no
    /// metadata, since a map can't exist without a backing file.
    #[must_use]
    pub fn from_patch(patch: &MapPatch) -> Option<Self> {
        let mut map = Self::new(patch.metadata.clone()?);
        map.apply_patch(patch);
        Some(map)
    }

    /// Apply every present field of `patch`.
    pub fn apply_patch(&mut self, patch: &MapPatch) {
        if let Some(ref name) = patch.name {
            self.name.clone_from(name);
        }
        if let Some(ref metadata) = patch.metadata {
            self.metadata = metadata.clone();
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        if let Some(gm_only) = patch.gm_only {
            self.gm_only = gm_only;
        }
        if let Some(ref selected_by) = patch.selected_by {
            self.selected_by.clone_from(selected_by);
        }
        if let Some(ref fog_of_war) = patch.fog_of_war {
            self.fog_of_war.clone_from(fog_of_war);
        }
        if let Some(camera_focus_point) = patch.camera_focus_point {
            self.camera_focus_point = camera_focus_point;
        }
        if let Some(snapping) = patch.snapping {
            self.snapping = snapping;
        }
    }

    /// The map's grid as seen on the tabletop, after rotation. `None` while
    /// properties are not loaded.
    #[must_use]
    pub fn grid_type(&self) -> Option<GridType> {
        self.metadata
            .properties
            .as_ref()
            .map(|props| effective_grid_type(self.rotation.y, props.grid_type))
    }
}

/// Sparse update for a map. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata<MapProperties>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vector3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Euler>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gm_only: Option<bool>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub selected_by: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub fog_of_war: Option<Option<FogBitmap>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub camera_focus_point: Option<Option<Vector3>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapping: Option<bool>,
}

impl From<&Map> for MapPatch {
    /// A patch that carries the complete state of `map`.
    fn from(map: &Map) -> Self {
        Self {
            name: Some(map.name.clone()),
            metadata: Some(map.metadata.clone()),
            position: Some(map.position),
            rotation: Some(map.rotation),
            gm_only: Some(map.gm_only),
            selected_by: Some(map.selected_by.clone()),
            fog_of_war: Some(map.fog_of_war.clone()),
            camera_focus_point: Some(map.camera_focus_point),
            snapping: Some(map.snapping),
        }
    }
}

// =============================================================================
// MINIS
// =============================================================================

/// Who can see a piece.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PieceVisibility {
    Hidden = 1,
    /// Visible to players only when not under fog.
    Fogged = 2,
    #[default]
    Revealed = 3,
}

impl From<PieceVisibility> for u8 {
    fn from(visibility: PieceVisibility) -> Self {
        visibility as u8
    }
}

impl TryFrom<u8> for PieceVisibility {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Hidden),
            2 => Ok(Self::Fogged),
            3 => Ok(Self::Revealed),
            other => Err(format!("unknown piece visibility {other}")),
        }
    }
}

/// A waypoint on a piece's pending move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementPathPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    /// Map whose grid governs this waypoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_map_id: Option<ObjectId>,
}

impl MovementPathPoint {
    #[must_use]
    pub fn at(position: Vector3) -> Self {
        Self { x: position.x, y: position.y, z: position.z, elevation: None, on_map_id: None }
    }
}

/// A piece on the tabletop: a standee miniature or a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mini {
    #[serde(default)]
    pub name: String,
    pub metadata: Metadata<PieceProperties>,
    #[serde(default)]
    pub position: Vector3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement_path: Option<Vec<MovementPathPoint>>,
    #[serde(default)]
    pub rotation: Euler,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub elevation: f64,
    #[serde(default)]
    pub visibility: PieceVisibility,
    #[serde(default)]
    pub gm_only: bool,
    #[serde(default)]
    pub selected_by: Option<String>,
    #[serde(default)]
    pub prone: bool,
    #[serde(default)]
    pub flat: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub hide_base: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_colour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_map_id: Option<ObjectId>,
    /// Piece this one rides on; position and rotation are then relative to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach_mini_id: Option<ObjectId>,
    #[serde(default)]
    pub pieces_roster_values: RosterValues,
    #[serde(default, rename = "piecesRosterGMValues")]
    pub pieces_roster_gm_values: RosterValues,
    /// Whether the last positional update was made with snap-to-grid on.
    #[serde(default)]
    pub snapping: bool,
}

impl Mini {
    /// A new GM-only piece at the origin.
    #[must_use]
    pub fn new(metadata: Metadata<PieceProperties>) -> Self {
        Self {
            name: String::new(),
            metadata,
            position: Vector3::ORIGIN,
            movement_path: None,
            rotation: Euler::NONE,
            scale: 1.0,
            elevation: 0.0,
            visibility: PieceVisibility::Revealed,
            gm_only: true,
            selected_by: None,
            prone: false,
            flat: false,
            locked: false,
            hide_base: false,
            base_colour: None,
            on_map_id: None,
            attach_mini_id: None,
            pieces_roster_values: RosterValues::new(),
            pieces_roster_gm_values: RosterValues::new(),
            snapping: false,
        }
    }

    /// Build a piece from a patch. Returns `None` when the patch carries no
    /// metadata.
    #[must_use]
    pub fn from_patch(patch: &MiniPatch) -> Option<Self> {
        let mut mini = Self::new(patch.metadata.clone()?);
        mini.apply_patch(patch);
        Some(mini)
    }

    /// Apply every present field of `patch`.
    pub fn apply_patch(&mut self, patch: &MiniPatch) {
        if let Some(ref name) = patch.name {
            self.name.clone_from(name);
        }
        if let Some(ref metadata) = patch.metadata {
            self.metadata = metadata.clone();
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(ref movement_path) = patch.movement_path {
            self.movement_path.clone_from(movement_path);
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        if let Some(scale) = patch.scale {
            self.scale = scale;
        }
        if let Some(elevation) = patch.elevation {
            self.elevation = elevation;
        }
        if let Some(visibility) = patch.visibility {
            self.visibility = visibility;
        }
        if let Some(gm_only) = patch.gm_only {
            self.gm_only = gm_only;
        }
        if let Some(ref selected_by) = patch.selected_by {
            self.selected_by.clone_from(selected_by);
        }
        if let Some(prone) = patch.prone {
            self.prone = prone;
        }
        if let Some(flat) = patch.flat {
            self.flat = flat;
        }
        if let Some(locked) = patch.locked {
            self.locked = locked;
        }
        if let Some(hide_base) = patch.hide_base {
            self.hide_base = hide_base;
        }
        if let Some(base_colour) = patch.base_colour {
            self.base_colour = base_colour;
        }
        if let Some(ref on_map_id) = patch.on_map_id {
            self.on_map_id.clone_from(on_map_id);
        }
        if let Some(ref attach_mini_id) = patch.attach_mini_id {
            self.attach_mini_id.clone_from(attach_mini_id);
        }
        if let Some(ref values) = patch.pieces_roster_values {
            self.pieces_roster_values.clone_from(values);
        }
        if let Some(ref values) = patch.pieces_roster_gm_values {
            self.pieces_roster_gm_values.clone_from(values);
        }
        if let Some(snapping) = patch.snapping {
            self.snapping = snapping;
        }
    }

    #[must_use]
    pub fn is_template(&self) -> bool {
        self.metadata.properties.as_ref().is_some_and(PieceProperties::is_template)
    }
}

/// Sparse update for a piece. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata<PieceProperties>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vector3>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub movement_path: Option<Option<Vec<MovementPathPoint>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Euler>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<PieceVisibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gm_only: Option<bool>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub selected_by: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prone: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_base: Option<bool>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub base_colour: Option<Option<u32>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub on_map_id: Option<Option<ObjectId>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub attach_mini_id: Option<Option<ObjectId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pieces_roster_values: Option<RosterValues>,
    #[serde(default, rename = "piecesRosterGMValues", skip_serializing_if = "Option::is_none")]
    pub pieces_roster_gm_values: Option<RosterValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapping: Option<bool>,
}

impl From<&Mini> for MiniPatch {
    /// A patch that carries the complete state of `mini`.
    fn from(mini: &Mini) -> Self {
        Self {
            name: Some(mini.name.clone()),
            metadata: Some(mini.metadata.clone()),
            position: Some(mini.position),
            movement_path: Some(mini.movement_path.clone()),
            rotation: Some(mini.rotation),
            scale: Some(mini.scale),
            elevation: Some(mini.elevation),
            visibility: Some(mini.visibility),
            gm_only: Some(mini.gm_only),
            selected_by: Some(mini.selected_by.clone()),
            prone: Some(mini.prone),
            flat: Some(mini.flat),
            locked: Some(mini.locked),
            hide_base: Some(mini.hide_base),
            base_colour: Some(mini.base_colour),
            on_map_id: Some(mini.on_map_id.clone()),
            attach_mini_id: Some(mini.attach_mini_id.clone()),
            pieces_roster_values: Some(mini.pieces_roster_values.clone()),
            pieces_roster_gm_values: Some(mini.pieces_roster_gm_values.clone()),
            snapping: Some(mini.snapping),
        }
    }
}

// =============================================================================
// SCENARIO
// =============================================================================

/// The replicated tabletop state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub snap_to_grid: bool,
    #[serde(default)]
    pub confirm_moves: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_camera_at_origin: Option<bool>,
    #[serde(default)]
    pub maps: BTreeMap<ObjectId, Map>,
    #[serde(default)]
    pub minis: BTreeMap<ObjectId, Mini>,
    /// Last action applied by the GM's copy.
    #[serde(default)]
    pub head_action_ids: Vec<String>,
    /// Last action visible to players.
    #[serde(default)]
    pub player_head_action_ids: Vec<String>,
}

impl Scenario {
    /// Every metadata id referenced by a map or piece, sorted and deduplicated.
    #[must_use]
    pub fn all_metadata_ids(&self) -> Vec<String> {
        let ids: BTreeSet<&str> = self
            .maps
            .values()
            .map(|map| map.metadata.id.as_str())
            .chain(self.minis.values().map(|mini| mini.metadata.id.as_str()))
            .collect();
        ids.into_iter().map(str::to_owned).collect()
    }
}

/// Returns `true` when there is no scenario, or it has no maps and no pieces.
#[must_use]
pub fn is_scenario_empty(scenario: Option<&Scenario>) -> bool {
    scenario.is_none_or(|scenario| scenario.maps.is_empty() && scenario.minis.is_empty())
}

// =============================================================================
// ATTACHMENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttachmentError {
    #[error("attachment chain through mini {0} forms a cycle")]
    Cycle(ObjectId),
    #[error("mini {0} is attached to missing mini {1}")]
    Missing(ObjectId, ObjectId),
}

/// The pieces from `mini_id` down to the root of its attachment chain.
/// Empty when `mini_id` is unknown.
fn attachment_chain<'a>(
    minis: &'a BTreeMap<ObjectId, Mini>,
    mini_id: &'a str,
) -> Result<Vec<(&'a str, &'a Mini)>, AttachmentError> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let Some(mut mini) = minis.get(mini_id) else {
        return Ok(chain);
    };
    let mut id = mini_id;
    loop {
        if !visited.insert(id) {
            return Err(AttachmentError::Cycle(id.to_owned()));
        }
        chain.push((id, mini));
        let Some(parent_id) = mini.attach_mini_id.as_deref() else {
            return Ok(chain);
        };
        let Some(parent) = minis.get(parent_id) else {
            return Err(AttachmentError::Missing(id.to_owned(), parent_id.to_owned()));
        };
        id = parent_id;
        mini = parent;
    }
}

/// The piece at the bottom of `mini_id`'s attachment chain, or `None` when
/// `mini_id` is unknown.
///
/// # Errors
///
/// Fails when the chain loops or references a missing piece.
pub fn root_attached_mini_id(minis: &BTreeMap<ObjectId, Mini>, mini_id: &str) -> Result<Option<ObjectId>, AttachmentError> {
    let chain = attachment_chain(minis, mini_id)?;
    Ok(chain.last().map(|(id, _)| (*id).to_owned()))
}

/// Check that attaching `mini_id` to `attach_to` keeps chains acyclic.
///
/// # Errors
///
/// [`AttachmentError::Missing`] when `attach_to` doesn't exist,
/// [`AttachmentError::Cycle`] when `attach_to` already rides on `mini_id`.
pub fn check_attachment(minis: &BTreeMap<ObjectId, Mini>, mini_id: &str, attach_to: &str) -> Result<(), AttachmentError> {
    if !minis.contains_key(attach_to) {
        return Err(AttachmentError::Missing(mini_id.to_owned(), attach_to.to_owned()));
    }
    let chain = attachment_chain(minis, attach_to)?;
    if chain.iter().any(|(id, _)| *id == mini_id) {
        return Err(AttachmentError::Cycle(mini_id.to_owned()));
    }
    Ok(())
}

/// World transform of a piece, composing its transform with every piece it
/// rides on.
///
/// When `snap` is set and a grid type is given, each piece in the chain that
/// is currently selected is snapped to that grid. Returns `None` when the
/// piece, or any piece it rides on, is unknown.
///
/// # Errors
///
/// [`AttachmentError::Cycle`] when the chain loops.
pub fn absolute_mini_position(
    minis: &BTreeMap<ObjectId, Mini>,
    mini_id: &str,
    snap: bool,
    grid_type: Option<GridType>,
) -> Result<Option<SnappedMini>, AttachmentError> {
    let chain = match attachment_chain(minis, mini_id) {
        Ok(chain) => chain,
        Err(AttachmentError::Missing(..)) => return Ok(None),
        Err(err) => return Err(err),
    };
    let mut base: Option<SnappedMini> = None;
    for (_, mini) in chain.into_iter().rev() {
        let (mut position, mut rotation, mut elevation) = (mini.position, mini.rotation, mini.elevation);
        if let Some(base) = base {
            position = position.apply_euler(&base.rotation) + base.position;
            rotation = rotation.compose(&base.rotation);
            elevation += base.elevation;
        }
        base = Some(match grid_type {
            Some(grid_type) if snap => {
                snap_mini(mini.selected_by.is_some(), grid_type, mini.scale, position, elevation, rotation)
            }
            _ => SnappedMini { position, rotation, scale: mini.scale, elevation },
        });
    }
    Ok(base)
}
