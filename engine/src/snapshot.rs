//! Persisted scenario documents.
//!
//! DESIGN
//! ======
//! A scenario is saved as two documents. The private one is the complete
//! state for the GM; the public one is what players may load, with GM-only
//! objects dropped and GM roster values cleared. Both collapse metadata to an
//! `{id}` reference, since the full records live in the metadata store and
//! are rehydrated on load.
//!
//! Loading accepts documents written by older clients. The upgrades are done
//! on the raw JSON before typed deserialization, so the typed model never has
//! to carry legacy fields.

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod snapshot_test;

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::consts::LEGACY_ACTION_ID;
use crate::doc::{Map, Mini, ObjectId, PieceVisibility, Scenario};
use crate::metadata::RawMetadata;
use crate::tabletop::Tabletop;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("scenario document is not a JSON object")]
    NotAnObject,
    #[error("invalid scenario: {0}")]
    Scenario(#[source] serde_json::Error),
    #[error("invalid tabletop settings: {0}")]
    Tabletop(#[source] serde_json::Error),
}

/// The two documents a scenario is saved as.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSnapshots {
    /// Everything, for the GM.
    pub private: Scenario,
    /// What players may see.
    pub public: Scenario,
}

// =============================================================================
// SAVE
// =============================================================================

fn reduced_maps(maps: &BTreeMap<ObjectId, Map>) -> BTreeMap<ObjectId, Map> {
    maps.iter()
        .map(|(id, map)| (id.clone(), Map { metadata: map.metadata.reduced(), ..map.clone() }))
        .collect()
}

fn reduced_minis(minis: &BTreeMap<ObjectId, Mini>) -> BTreeMap<ObjectId, Mini> {
    minis
        .iter()
        .map(|(id, mini)| (id.clone(), Mini { metadata: mini.metadata.reduced(), ..mini.clone() }))
        .collect()
}

/// Split `scenario` into its private and public documents.
///
/// Both documents carry the player heads; only the private one carries the
/// GM heads.
#[must_use]
pub fn scenario_to_json(scenario: &Scenario) -> ScenarioSnapshots {
    let maps = reduced_maps(&scenario.maps);
    let minis = reduced_minis(&scenario.minis);
    let public = Scenario {
        snap_to_grid: scenario.snap_to_grid,
        confirm_moves: scenario.confirm_moves,
        start_camera_at_origin: scenario.start_camera_at_origin,
        maps: maps.iter().filter(|(_, map)| !map.gm_only).map(|(id, map)| (id.clone(), map.clone())).collect(),
        minis: minis
            .iter()
            .filter(|(_, mini)| !mini.gm_only)
            .map(|(id, mini)| {
                let mut mini = mini.clone();
                mini.pieces_roster_gm_values.clear();
                (id.clone(), mini)
            })
            .collect(),
        head_action_ids: scenario.player_head_action_ids.clone(),
        player_head_action_ids: scenario.player_head_action_ids.clone(),
    };
    let private = Scenario {
        snap_to_grid: scenario.snap_to_grid,
        confirm_moves: scenario.confirm_moves,
        start_camera_at_origin: scenario.start_camera_at_origin,
        maps,
        minis,
        head_action_ids: scenario.head_action_ids.clone(),
        player_head_action_ids: scenario.player_head_action_ids.clone(),
    };
    ScenarioSnapshots { private, public }
}

// =============================================================================
// LOAD
// =============================================================================

/// Rewrite legacy piece fields in place: a single `startingPosition` becomes
/// a one-point movement path, and a missing visibility follows `gmOnly`.
fn upgrade_legacy_mini(mini: &mut serde_json::Map<String, Value>) {
    if let Some(start) = mini.remove("startingPosition")
        && !start.is_null()
    {
        mini.insert("movementPath".to_owned(), Value::Array(vec![start]));
    }
    if mini.get("visibility").is_none_or(Value::is_null) {
        let gm_only = mini.get("gmOnly").and_then(Value::as_bool).unwrap_or(false);
        let visibility = if gm_only { PieceVisibility::Hidden } else { PieceVisibility::Revealed };
        mini.insert("visibility".to_owned(), Value::from(u8::from(visibility)));
    }
}

fn upgrade_heads(doc: &mut serde_json::Map<String, Value>) {
    let fallback = doc.get("lastActionId").and_then(Value::as_str).unwrap_or(LEGACY_ACTION_ID).to_owned();
    for key in ["headActionIds", "playerHeadActionIds"] {
        if doc.get(key).is_none_or(Value::is_null) {
            doc.insert(key.to_owned(), Value::from(vec![fallback.clone()]));
        }
    }
}

/// Replace id-only metadata with the store's full record where it validates.
fn rehydrate_metadata(scenario: &mut Scenario, store: &BTreeMap<String, RawMetadata>) {
    for (map_id, map) in &mut scenario.maps {
        let Some(raw) = store.get(&map.metadata.id) else {
            continue;
        };
        match raw.cast() {
            Ok(metadata) => map.metadata = metadata,
            Err(err) => warn!(%map_id, metadata_id = %raw.id, error = %err, "map metadata rejected"),
        }
    }
    for (mini_id, mini) in &mut scenario.minis {
        let Some(raw) = store.get(&mini.metadata.id) else {
            continue;
        };
        match raw.cast() {
            Ok(metadata) => mini.metadata = metadata,
            Err(err) => warn!(%mini_id, metadata_id = %raw.id, error = %err, "piece metadata rejected"),
        }
    }
}

/// Load a combined scenario and tabletop document.
///
/// Legacy shapes are upgraded, metadata references are filled in from
/// `store`, and the tabletop's last-saved heads are reset.
///
/// # Errors
///
/// Fails when the document isn't an object or either half doesn't match its
/// schema. Metadata that fails validation only logs a warning; the object
/// keeps its `{id}` reference.
pub fn json_to_scenario_and_tabletop(
    json: Value,
    store: &BTreeMap<String, RawMetadata>,
) -> Result<(Scenario, Tabletop), SnapshotError> {
    let Value::Object(mut doc) = json else {
        return Err(SnapshotError::NotAnObject);
    };
    if let Some(Value::Object(minis)) = doc.get_mut("minis") {
        for mini in minis.values_mut() {
            if let Value::Object(mini) = mini {
                upgrade_legacy_mini(mini);
            }
        }
    }
    upgrade_heads(&mut doc);
    let doc = Value::Object(doc);

    let mut tabletop: Tabletop = serde_json::from_value(doc.clone()).map_err(SnapshotError::Tabletop)?;
    tabletop.last_saved_head_action_ids = None;
    tabletop.last_saved_player_head_action_ids = None;

    let mut scenario: Scenario = serde_json::from_value(doc).map_err(SnapshotError::Scenario)?;
    rehydrate_metadata(&mut scenario, store);
    Ok((scenario, tabletop))
}
