//! Replicated scenario actions and the reducer that applies them.
//!
//! DESIGN
//! ======
//! Every mutation of a scenario is an [`Action`]: a wire record carrying a
//! unique `actionId`, an optional `peerKey`, and one variant of the closed
//! [`ActionKind`] enum. Each peer runs the same action stream through
//! [`reduce`] and reaches the same state; the last applied update to a field
//! wins.
//!
//! The `peerKey` gates propagation. An action without one is GM-private and
//! never leaves the GM's client. Object updates derive the key from the
//! target's *current* `gmOnly` flag: a GM-only target gets no key, any other
//! target gets its id suffixed with the field being changed, so updates to
//! unrelated fields of one object don't coalesce in transport.
//!
//! Builders read the scenario they are issued against, which is why they take
//! `&Scenario` instead of being constructors on `Action`.

#[cfg(test)]
#[path = "action_test.rs"]
mod action_test;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::doc::{
    AttachmentError, Map, MapPatch, Mini, MiniPatch, MovementPathPoint, ObjectId, PieceVisibility, Scenario,
    check_attachment,
};
use crate::fog::FogBitmap;
use crate::geom::{Euler, Vector3};
use crate::metadata::RawMetadata;
use crate::roster::RosterValues;

// =============================================================================
// TYPES
// =============================================================================

/// A replicated mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub action_id: String,
    /// Propagation key; `None` keeps the action on the GM's client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_key: Option<String>,
    #[serde(flatten)]
    pub kind: ActionKind,
}

/// What an action does. The wire `type` is the kebab-case variant name with
/// an `-action` suffix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionKind {
    #[serde(rename = "set-scenario-action")]
    SetScenario { scenario: Box<Scenario> },
    #[serde(rename = "update-map-action", rename_all = "camelCase")]
    UpdateMap { map_id: ObjectId, map: Box<MapPatch> },
    #[serde(rename = "remove-map-action", rename_all = "camelCase")]
    RemoveMap { map_id: ObjectId },
    #[serde(rename = "update-mini-action", rename_all = "camelCase")]
    UpdateMini { mini_id: ObjectId, mini: Box<MiniPatch> },
    #[serde(rename = "remove-mini-action", rename_all = "camelCase")]
    RemoveMini { mini_id: ObjectId },
    #[serde(rename = "update-snap-to-grid-action", rename_all = "camelCase")]
    UpdateSnapToGrid { snap_to_grid: bool },
    #[serde(rename = "update-confirm-moves-action", rename_all = "camelCase")]
    UpdateConfirmMoves { confirm_moves: bool },
    /// Merge a refreshed metadata record into every object referencing it.
    #[serde(rename = "update-metadata-action")]
    UpdateMetadata { metadata: RawMetadata },
    /// Remove every object referencing a deleted metadata record.
    #[serde(rename = "remove-metadata-action", rename_all = "camelCase")]
    RemoveMetadata { metadata_id: String },
}

impl ActionKind {
    /// The wire `type` of this action.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetScenario { .. } => "set-scenario-action",
            Self::UpdateMap { .. } => "update-map-action",
            Self::RemoveMap { .. } => "remove-map-action",
            Self::UpdateMini { .. } => "update-mini-action",
            Self::RemoveMini { .. } => "remove-mini-action",
            Self::UpdateSnapToGrid { .. } => "update-snap-to-grid-action",
            Self::UpdateConfirmMoves { .. } => "update-confirm-moves-action",
            Self::UpdateMetadata { .. } => "update-metadata-action",
            Self::RemoveMetadata { .. } => "remove-metadata-action",
        }
    }
}

// =============================================================================
// REDUCER
// =============================================================================

/// Apply `action` to a copy of `scenario`.
#[must_use]
pub fn reduce(scenario: &Scenario, action: &Action) -> Scenario {
    let mut next = scenario.clone();
    apply_action(&mut next, action);
    next
}

/// Apply `action` to `scenario` in place.
///
/// The action id becomes the GM head; an action with a peer key also becomes
/// the player head. Updates to unknown objects that carry no metadata, and
/// removals of unknown objects, change nothing but the heads.
pub fn apply_action(scenario: &mut Scenario, action: &Action) {
    match &action.kind {
        ActionKind::SetScenario { scenario: replacement } => {
            *scenario = (**replacement).clone();
        }
        ActionKind::UpdateMap { map_id, map: patch } => match scenario.maps.get_mut(map_id) {
            Some(map) => map.apply_patch(patch),
            None => match Map::from_patch(patch) {
                Some(map) => {
                    scenario.maps.insert(map_id.clone(), map);
                }
                None => warn!(action_id = %action.action_id, %map_id, "update for unknown map without metadata ignored"),
            },
        },
        ActionKind::RemoveMap { map_id } => {
            if scenario.maps.remove(map_id).is_none() {
                debug!(action_id = %action.action_id, %map_id, "remove for unknown map");
            }
        }
        ActionKind::UpdateMini { mini_id, mini: patch } => match scenario.minis.get_mut(mini_id) {
            Some(mini) => mini.apply_patch(patch),
            None => match Mini::from_patch(patch) {
                Some(mini) => {
                    scenario.minis.insert(mini_id.clone(), mini);
                }
                None => warn!(action_id = %action.action_id, %mini_id, "update for unknown mini without metadata ignored"),
            },
        },
        ActionKind::RemoveMini { mini_id } => {
            if scenario.minis.remove(mini_id).is_none() {
                debug!(action_id = %action.action_id, %mini_id, "remove for unknown mini");
            }
        }
        ActionKind::UpdateSnapToGrid { snap_to_grid } => scenario.snap_to_grid = *snap_to_grid,
        ActionKind::UpdateConfirmMoves { confirm_moves } => scenario.confirm_moves = *confirm_moves,
        ActionKind::UpdateMetadata { metadata } => merge_metadata(scenario, metadata),
        ActionKind::RemoveMetadata { metadata_id } => {
            scenario.maps.retain(|_, map| map.metadata.id != *metadata_id);
            scenario.minis.retain(|_, mini| mini.metadata.id != *metadata_id);
        }
    }
    scenario.head_action_ids = vec![action.action_id.clone()];
    if action.peer_key.is_some() {
        scenario.player_head_action_ids = vec![action.action_id.clone()];
    }
    debug!(action_id = %action.action_id, kind = action.kind.name(), peer_key = ?action.peer_key, "action applied");
}

fn merge_metadata(scenario: &mut Scenario, metadata: &RawMetadata) {
    for (map_id, map) in scenario.maps.iter_mut().filter(|(_, map)| map.metadata.id == metadata.id) {
        if let Err(err) = map.metadata.merge(metadata) {
            warn!(%map_id, metadata_id = %metadata.id, error = %err, "metadata not merged into map");
        }
    }
    for (mini_id, mini) in scenario.minis.iter_mut().filter(|(_, mini)| mini.metadata.id == metadata.id) {
        if let Err(err) = mini.metadata.merge(metadata) {
            warn!(%mini_id, metadata_id = %metadata.id, error = %err, "metadata not merged into mini");
        }
    }
}

// =============================================================================
// PEER KEYS
// =============================================================================

fn new_action_id() -> String {
    Uuid::new_v4().to_string()
}

/// Peer key for a change to `field` of map `map_id`: `None` while the map is
/// GM-only or unknown.
#[must_use]
pub fn map_peer_key(scenario: &Scenario, map_id: &str, field: &str) -> Option<String> {
    scenario.maps.get(map_id).filter(|map| !map.gm_only).map(|_| format!("{map_id}{field}"))
}

/// Peer key for a change to `field` of mini `mini_id`: `None` while the mini
/// is GM-only or unknown.
#[must_use]
pub fn mini_peer_key(scenario: &Scenario, mini_id: &str, field: &str) -> Option<String> {
    scenario.minis.get(mini_id).filter(|mini| !mini.gm_only).map(|_| format!("{mini_id}{field}"))
}

// =============================================================================
// SCENARIO BUILDERS
// =============================================================================

/// Replace the whole scenario. The action reuses the scenario's GM head so
/// that loading a saved scenario doesn't look like a new edit.
#[must_use]
pub fn set_scenario_action(scenario: Scenario, peer_key: Option<String>) -> Action {
    let action_id = scenario.head_action_ids.first().cloned().unwrap_or_else(new_action_id);
    Action { action_id, peer_key, kind: ActionKind::SetScenario { scenario: Box::new(scenario) } }
}

#[must_use]
pub fn update_snap_to_grid_action(snap_to_grid: bool) -> Action {
    Action {
        action_id: new_action_id(),
        peer_key: Some("snapToGrid".to_owned()),
        kind: ActionKind::UpdateSnapToGrid { snap_to_grid },
    }
}

#[must_use]
pub fn update_confirm_moves_action(confirm_moves: bool) -> Action {
    Action {
        action_id: new_action_id(),
        peer_key: Some("confirmMoves".to_owned()),
        kind: ActionKind::UpdateConfirmMoves { confirm_moves },
    }
}

/// Refresh a metadata record locally. Every peer fetches metadata itself, so
/// this never propagates.
#[must_use]
pub fn update_metadata_action(metadata: RawMetadata) -> Action {
    Action { action_id: new_action_id(), peer_key: None, kind: ActionKind::UpdateMetadata { metadata } }
}

/// Drop every object backed by a deleted file. Local only, like
/// [`update_metadata_action`].
#[must_use]
pub fn remove_metadata_action(metadata_id: impl Into<String>) -> Action {
    Action {
        action_id: new_action_id(),
        peer_key: None,
        kind: ActionKind::RemoveMetadata { metadata_id: metadata_id.into() },
    }
}

// =============================================================================
// MAP BUILDERS
// =============================================================================

/// Create a map under a fresh id. Position, rotation and `gmOnly` default to
/// the origin, no rotation and `true`.
#[must_use]
pub fn add_map_action(mut map: MapPatch) -> Action {
    let map_id = new_action_id();
    map.position.get_or_insert(Vector3::ORIGIN);
    map.rotation.get_or_insert(Euler::NONE);
    let gm_only = *map.gm_only.get_or_insert(true);
    Action {
        action_id: new_action_id(),
        peer_key: if gm_only { None } else { Some(map_id.clone()) },
        kind: ActionKind::UpdateMap { map_id, map: Box::new(map) },
    }
}

#[must_use]
pub fn remove_map_action(scenario: &Scenario, map_id: &str) -> Action {
    Action {
        action_id: new_action_id(),
        peer_key: map_peer_key(scenario, map_id, ""),
        kind: ActionKind::RemoveMap { map_id: map_id.to_owned() },
    }
}

fn update_map_action(scenario: &Scenario, map_id: &str, mut map: MapPatch, field: &str, snapping: Option<bool>) -> Action {
    map.snapping = Some(snapping.unwrap_or(scenario.snap_to_grid));
    Action {
        action_id: new_action_id(),
        peer_key: map_peer_key(scenario, map_id, field),
        kind: ActionKind::UpdateMap { map_id: map_id.to_owned(), map: Box::new(map) },
    }
}

/// Move a map. `snapping` defaults to the scenario's snap-to-grid setting.
#[must_use]
pub fn update_map_position_action(scenario: &Scenario, map_id: &str, position: Vector3, snapping: Option<bool>) -> Action {
    update_map_action(scenario, map_id, MapPatch { position: Some(position), ..MapPatch::default() }, "position", snapping)
}

#[must_use]
pub fn update_map_rotation_action(scenario: &Scenario, map_id: &str, rotation: Euler, snapping: Option<bool>) -> Action {
    update_map_action(scenario, map_id, MapPatch { rotation: Some(rotation), ..MapPatch::default() }, "rotation", snapping)
}

#[must_use]
pub fn update_map_name_action(scenario: &Scenario, map_id: &str, name: impl Into<String>) -> Action {
    update_map_action(scenario, map_id, MapPatch { name: Some(name.into()), ..MapPatch::default() }, "name", None)
}

/// Replace a map's fog bitmap; `None` clears the fog entirely.
#[must_use]
pub fn update_map_fog_of_war_action(scenario: &Scenario, map_id: &str, fog_of_war: Option<FogBitmap>) -> Action {
    update_map_action(scenario, map_id, MapPatch { fog_of_war: Some(fog_of_war), ..MapPatch::default() }, "fogOfWar", None)
}

#[must_use]
pub fn update_map_camera_focus_point_action(
    scenario: &Scenario,
    map_id: &str,
    camera_focus_point: Option<Vector3>,
) -> Action {
    let patch = MapPatch { camera_focus_point: Some(camera_focus_point), ..MapPatch::default() };
    update_map_action(scenario, map_id, patch, "cameraFocusPoint", None)
}

/// Toggle a map's `gmOnly` flag.
///
/// Hiding a map removes it from players and then re-creates it on the GM's
/// client only; revealing it sends players the complete map. Empty when the
/// map doesn't exist.
#[must_use]
pub fn update_map_gm_only_action(scenario: &Scenario, map_id: &str, gm_only: bool) -> Vec<Action> {
    let Some(map) = scenario.maps.get(map_id) else {
        warn!(%map_id, "gmOnly toggle for unknown map");
        return Vec::new();
    };
    let mut patch = MapPatch::from(map);
    patch.gm_only = Some(gm_only);
    let update = |peer_key| Action {
        action_id: new_action_id(),
        peer_key,
        kind: ActionKind::UpdateMap { map_id: map_id.to_owned(), map: Box::new(patch.clone()) },
    };
    if gm_only {
        let remove = Action {
            action_id: new_action_id(),
            peer_key: Some(map_id.to_owned()),
            kind: ActionKind::RemoveMap { map_id: map_id.to_owned() },
        };
        vec![remove, update(None)]
    } else {
        vec![update(Some(map_id.to_owned()))]
    }
}

// =============================================================================
// MINI BUILDERS
// =============================================================================

/// Create a piece under a fresh id, filling in the same defaults as
/// [`add_map_action`] plus unit scale, zero elevation and upright.
#[must_use]
pub fn add_mini_action(mut mini: MiniPatch) -> Action {
    let mini_id = new_action_id();
    mini.position.get_or_insert(Vector3::ORIGIN);
    mini.rotation.get_or_insert(Euler::NONE);
    mini.scale.get_or_insert(1.0);
    mini.elevation.get_or_insert(0.0);
    mini.prone.get_or_insert(false);
    let gm_only = *mini.gm_only.get_or_insert(true);
    Action {
        action_id: new_action_id(),
        peer_key: if gm_only { None } else { Some(mini_id.clone()) },
        kind: ActionKind::UpdateMini { mini_id, mini: Box::new(mini) },
    }
}

#[must_use]
pub fn remove_mini_action(scenario: &Scenario, mini_id: &str) -> Action {
    Action {
        action_id: new_action_id(),
        peer_key: mini_peer_key(scenario, mini_id, ""),
        kind: ActionKind::RemoveMini { mini_id: mini_id.to_owned() },
    }
}

fn update_mini_action(scenario: &Scenario, mini_id: &str, mut mini: MiniPatch, field: &str, snapping: Option<bool>) -> Action {
    mini.snapping = Some(snapping.unwrap_or(scenario.snap_to_grid));
    Action {
        action_id: new_action_id(),
        peer_key: mini_peer_key(scenario, mini_id, field),
        kind: ActionKind::UpdateMini { mini_id: mini_id.to_owned(), mini: Box::new(mini) },
    }
}

#[must_use]
pub fn update_mini_name_action(scenario: &Scenario, mini_id: &str, name: impl Into<String>) -> Action {
    update_mini_action(scenario, mini_id, MiniPatch { name: Some(name.into()), ..MiniPatch::default() }, "name", None)
}

/// Move a piece. `snapping` defaults to the scenario's snap-to-grid setting.
#[must_use]
pub fn update_mini_position_action(scenario: &Scenario, mini_id: &str, position: Vector3, snapping: Option<bool>) -> Action {
    let patch = MiniPatch { position: Some(position), ..MiniPatch::default() };
    update_mini_action(scenario, mini_id, patch, "position", snapping)
}

#[must_use]
pub fn update_mini_rotation_action(scenario: &Scenario, mini_id: &str, rotation: Euler, snapping: Option<bool>) -> Action {
    let patch = MiniPatch { rotation: Some(rotation), ..MiniPatch::default() };
    update_mini_action(scenario, mini_id, patch, "rotation", snapping)
}

#[must_use]
pub fn update_mini_scale_action(scenario: &Scenario, mini_id: &str, scale: f64, snapping: Option<bool>) -> Action {
    update_mini_action(scenario, mini_id, MiniPatch { scale: Some(scale), ..MiniPatch::default() }, "scale", snapping)
}

#[must_use]
pub fn update_mini_elevation_action(scenario: &Scenario, mini_id: &str, elevation: f64, snapping: Option<bool>) -> Action {
    let patch = MiniPatch { elevation: Some(elevation), ..MiniPatch::default() };
    update_mini_action(scenario, mini_id, patch, "elevation", snapping)
}

#[must_use]
pub fn update_mini_prone_action(scenario: &Scenario, mini_id: &str, prone: bool) -> Action {
    update_mini_action(scenario, mini_id, MiniPatch { prone: Some(prone), ..MiniPatch::default() }, "prone", None)
}

#[must_use]
pub fn update_mini_flat_action(scenario: &Scenario, mini_id: &str, flat: bool) -> Action {
    update_mini_action(scenario, mini_id, MiniPatch { flat: Some(flat), ..MiniPatch::default() }, "flat", None)
}

#[must_use]
pub fn update_mini_locked_action(scenario: &Scenario, mini_id: &str, locked: bool) -> Action {
    update_mini_action(scenario, mini_id, MiniPatch { locked: Some(locked), ..MiniPatch::default() }, "locked", None)
}

#[must_use]
pub fn update_mini_hide_base_action(scenario: &Scenario, mini_id: &str, hide_base: bool) -> Action {
    let patch = MiniPatch { hide_base: Some(hide_base), ..MiniPatch::default() };
    update_mini_action(scenario, mini_id, patch, "hideBase", None)
}

#[must_use]
pub fn update_mini_base_colour_action(scenario: &Scenario, mini_id: &str, base_colour: Option<u32>) -> Action {
    let patch = MiniPatch { base_colour: Some(base_colour), ..MiniPatch::default() };
    update_mini_action(scenario, mini_id, patch, "baseColour", None)
}

#[must_use]
pub fn update_mini_visibility_action(scenario: &Scenario, mini_id: &str, visibility: PieceVisibility) -> Action {
    let patch = MiniPatch { visibility: Some(visibility), ..MiniPatch::default() };
    update_mini_action(scenario, mini_id, patch, "visibility", None)
}

/// Set or clear a piece's pending move; `None` confirms or cancels it.
#[must_use]
pub fn update_mini_movement_path_action(
    scenario: &Scenario,
    mini_id: &str,
    movement_path: Option<Vec<MovementPathPoint>>,
) -> Action {
    let patch = MiniPatch { movement_path: Some(movement_path), ..MiniPatch::default() };
    update_mini_action(scenario, mini_id, patch, "movementPath", None)
}

/// Replace a piece's roster values. GM values never propagate.
#[must_use]
pub fn update_mini_roster_values_action(scenario: &Scenario, mini_id: &str, values: RosterValues, gm: bool) -> Action {
    if gm {
        let mut action = update_mini_action(
            scenario,
            mini_id,
            MiniPatch { pieces_roster_gm_values: Some(values), ..MiniPatch::default() },
            "piecesRosterGMValues",
            None,
        );
        action.peer_key = None;
        action
    } else {
        let patch = MiniPatch { pieces_roster_values: Some(values), ..MiniPatch::default() };
        update_mini_action(scenario, mini_id, patch, "piecesRosterValues", None)
    }
}

/// Attach a piece to another, with its transform now relative to the new
/// base.
///
/// # Errors
///
/// Fails when `attach_to` doesn't exist or already rides on `mini_id`.
pub fn attach_mini_action(
    scenario: &Scenario,
    mini_id: &str,
    attach_to: &str,
    position: Vector3,
    rotation: Euler,
    elevation: f64,
) -> Result<Action, AttachmentError> {
    check_attachment(&scenario.minis, mini_id, attach_to)?;
    let patch = MiniPatch {
        attach_mini_id: Some(Some(attach_to.to_owned())),
        position: Some(position),
        rotation: Some(rotation),
        elevation: Some(elevation),
        ..MiniPatch::default()
    };
    Ok(update_mini_action(scenario, mini_id, patch, "attach", None))
}

/// Detach a piece, giving it the world transform it had while attached.
#[must_use]
pub fn detach_mini_action(
    scenario: &Scenario,
    mini_id: &str,
    position: Vector3,
    rotation: Euler,
    elevation: f64,
) -> Action {
    let patch = MiniPatch {
        attach_mini_id: Some(None),
        position: Some(position),
        rotation: Some(rotation),
        elevation: Some(elevation),
        ..MiniPatch::default()
    };
    update_mini_action(scenario, mini_id, patch, "attach", None)
}

/// Toggle a piece's `gmOnly` flag; see [`update_map_gm_only_action`].
#[must_use]
pub fn update_mini_gm_only_action(scenario: &Scenario, mini_id: &str, gm_only: bool) -> Vec<Action> {
    let Some(mini) = scenario.minis.get(mini_id) else {
        warn!(%mini_id, "gmOnly toggle for unknown mini");
        return Vec::new();
    };
    let mut patch = MiniPatch::from(mini);
    patch.gm_only = Some(gm_only);
    if !gm_only {
        // Players never receive GM roster values; the GM's copy keeps its own.
        patch.pieces_roster_gm_values = None;
    }
    let update = |peer_key| Action {
        action_id: new_action_id(),
        peer_key,
        kind: ActionKind::UpdateMini { mini_id: mini_id.to_owned(), mini: Box::new(patch.clone()) },
    };
    if gm_only {
        let remove = Action {
            action_id: new_action_id(),
            peer_key: Some(mini_id.to_owned()),
            kind: ActionKind::RemoveMini { mini_id: mini_id.to_owned() },
        };
        vec![remove, update(None)]
    } else {
        vec![update(Some(mini_id.to_owned()))]
    }
}
