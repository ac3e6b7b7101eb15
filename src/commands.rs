//! Subcommand bodies for the `tabletop` binary.
//!
//! Everything here works on in-memory values or caller-supplied readers so the
//! commands can be exercised without touching the terminal. `main` owns
//! argument parsing, file opening, and output.

#[cfg(test)]
#[path = "commands_test.rs"]
mod commands_test;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::BufRead;
use std::path::Path;

use engine::action::{Action, apply_action};
use engine::doc::{ObjectId, Scenario};
use engine::geom::{Euler, Vector3};
use engine::grid::GridType;
use engine::level::{focus_map_id_and_focus_point_at_level, map_ids_at_level};
use engine::metadata::RawMetadata;
use engine::roster::{RosterColumn, roster_value, sorted_mini_ids};
use engine::snap::snap_mini;
use engine::snapshot::{SnapshotError, json_to_scenario_and_tabletop, scenario_to_json};
use engine::tabletop::Tabletop;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid action on line {line}: {source}")]
    InvalidAction {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read action log: {0}")]
    ActionLog(#[source] std::io::Error),
    #[error("{0}")]
    Snapshot(#[from] SnapshotError),
    #[error("unknown grid type `{0}`; expected NONE, SQUARE, HEX_VERT or HEX_HORZ")]
    InvalidGrid(String),
    #[error("no roster column named `{0}`")]
    UnknownColumn(String),
    #[error("tabletop settings did not serialize to an object")]
    TabletopShape,
}

fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io { path: path.display().to_string(), source })
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    fs::write(path, contents).map_err(|source| CliError::Io { path: path.display().to_string(), source })
}

/// Parse a grid type name as written in saved documents.
///
/// # Errors
///
/// Returns [`CliError::InvalidGrid`] for anything but the four wire names
/// (case-insensitive).
pub fn parse_grid(name: &str) -> Result<GridType, CliError> {
    serde_json::from_value(Value::String(name.to_ascii_uppercase())).map_err(|_| CliError::InvalidGrid(name.to_owned()))
}

// =============================================================================
// LOADING
// =============================================================================

/// Load the metadata store: a JSON array of metadata records, keyed by id.
/// No path means an empty store.
///
/// # Errors
///
/// Fails when the file can't be read or isn't an array of records.
pub fn load_metadata_store(path: Option<&Path>) -> Result<BTreeMap<String, RawMetadata>, CliError> {
    let Some(path) = path else {
        return Ok(BTreeMap::new());
    };
    let records: Vec<RawMetadata> = serde_json::from_str(&read_file(path)?)?;
    debug!(path = %path.display(), count = records.len(), "metadata store loaded");
    Ok(records.into_iter().map(|record| (record.id.clone(), record)).collect())
}

/// Load a combined scenario and tabletop document from `path`.
///
/// # Errors
///
/// Fails on I/O, malformed JSON, or a document the engine rejects.
pub fn load_scenario(path: &Path, store: &BTreeMap<String, RawMetadata>) -> Result<(Scenario, Tabletop), CliError> {
    let json: Value = serde_json::from_str(&read_file(path)?)?;
    let loaded = json_to_scenario_and_tabletop(json, store)?;
    info!(
        path = %path.display(),
        maps = loaded.0.maps.len(),
        minis = loaded.0.minis.len(),
        "scenario loaded"
    );
    Ok(loaded)
}

// =============================================================================
// REPLAY
// =============================================================================

/// Apply every action in a JSONL log to `scenario`, in order. Blank lines are
/// skipped. Returns the number of actions applied.
///
/// # Errors
///
/// Stops at the first line that can't be read or parsed as an action.
pub fn replay_actions(scenario: &mut Scenario, reader: impl BufRead) -> Result<usize, CliError> {
    let mut applied = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(CliError::ActionLog)?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let action: Action =
            serde_json::from_str(trimmed).map_err(|source| CliError::InvalidAction { line: index + 1, source })?;
        apply_action(scenario, &action);
        applied += 1;
    }
    info!(applied, "action log replayed");
    Ok(applied)
}

/// The private document with the tabletop settings folded in, so it loads
/// back through [`load_scenario`].
///
/// # Errors
///
/// Fails only if either half doesn't serialize to a JSON object.
pub fn gm_document(private: &Scenario, tabletop: &Tabletop) -> Result<Value, CliError> {
    let Value::Object(mut doc) = serde_json::to_value(private)? else {
        return Err(CliError::TabletopShape);
    };
    let Value::Object(settings) = serde_json::to_value(tabletop)? else {
        return Err(CliError::TabletopShape);
    };
    doc.extend(settings);
    Ok(Value::Object(doc))
}

/// Write `gm.json` and `player.json` for `scenario` into `out_dir`.
///
/// # Errors
///
/// Fails when the directory can't be created or a file can't be written.
pub fn write_snapshots(scenario: &Scenario, tabletop: &Tabletop, out_dir: &Path) -> Result<(), CliError> {
    fs::create_dir_all(out_dir).map_err(|source| CliError::Io { path: out_dir.display().to_string(), source })?;
    let snapshots = scenario_to_json(scenario);
    let mut saved = tabletop.clone();
    saved.last_saved_head_action_ids = Some(snapshots.private.head_action_ids.clone());
    saved.last_saved_player_head_action_ids = Some(snapshots.public.player_head_action_ids.clone());

    let gm = serde_json::to_string_pretty(&gm_document(&snapshots.private, &saved)?)?;
    let player = serde_json::to_string_pretty(&snapshots.public)?;
    write_file(&out_dir.join("gm.json"), &gm)?;
    write_file(&out_dir.join("player.json"), &player)?;
    info!(out_dir = %out_dir.display(), "snapshots written");
    Ok(())
}

// =============================================================================
// LEVELS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelReport {
    pub elevation: f64,
    pub map_ids: Vec<ObjectId>,
    pub focus_map_id: Option<ObjectId>,
    pub focus_point: Option<Vector3>,
}

/// Group the scenario's maps into levels, lowest first.
///
/// Each level is anchored on the lowest map not yet placed and takes every
/// unplaced map within level range of it.
#[must_use]
pub fn level_reports(scenario: &Scenario) -> Vec<LevelReport> {
    let mut by_height: Vec<(&ObjectId, f64)> =
        scenario.maps.iter().map(|(id, map)| (id, map.position.y)).collect();
    by_height.sort_by(|(a_id, a), (b_id, b)| a.total_cmp(b).then_with(|| a_id.cmp(b_id)));

    let mut placed: BTreeSet<&ObjectId> = BTreeSet::new();
    let mut reports = Vec::new();
    for (id, elevation) in by_height {
        if placed.contains(id) {
            continue;
        }
        let map_ids: Vec<ObjectId> = map_ids_at_level(&scenario.maps, elevation)
            .into_iter()
            .filter(|member| placed.insert(*member))
            .cloned()
            .collect();
        let (focus_map_id, focus_point) = focus_map_id_and_focus_point_at_level(&scenario.maps, Some(elevation));
        reports.push(LevelReport { elevation, map_ids, focus_map_id, focus_point });
    }
    reports
}

// =============================================================================
// ROSTER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterRow {
    pub id: ObjectId,
    pub values: BTreeMap<String, String>,
}

/// The roster table for the scenario's pieces.
///
/// Players don't see GM-only pieces or columns. Rows are ordered by the column
/// named `sort_by`, or by the first visible column.
///
/// # Errors
///
/// Returns [`CliError::UnknownColumn`] when `sort_by` names no visible column.
pub fn roster_rows(
    scenario: &Scenario,
    columns: &[RosterColumn],
    sort_by: Option<&str>,
    descending: bool,
    gm: bool,
) -> Result<Vec<RosterRow>, CliError> {
    let visible: Vec<&RosterColumn> = columns.iter().filter(|column| gm || !column.gm_only).collect();
    let minis: BTreeMap<ObjectId, _> = if gm {
        scenario.minis.clone()
    } else {
        scenario.minis.iter().filter(|(_, mini)| !mini.gm_only).map(|(id, mini)| (id.clone(), mini.clone())).collect()
    };
    let sort_column = match sort_by {
        Some(name) => Some(
            visible
                .iter()
                .find(|column| column.name == name)
                .ok_or_else(|| CliError::UnknownColumn(name.to_owned()))?,
        ),
        None => visible.first(),
    };
    let ids = match sort_column {
        Some(column) => sorted_mini_ids(column, &minis, descending),
        None => minis.keys().cloned().collect(),
    };
    Ok(ids
        .into_iter()
        .filter_map(|id| {
            let mini = minis.get(&id)?;
            let values = visible
                .iter()
                .map(|column| (column.name.clone(), roster_value(column, mini, &minis).to_string()))
                .collect();
            Some(RosterRow { id, values })
        })
        .collect())
}

// =============================================================================
// SNAP
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapRequest {
    pub grid_type: GridType,
    pub position: Vector3,
    pub rotation_degrees: f64,
    pub scale: f64,
    pub elevation: f64,
}

/// Snap a single piece transform and describe the result as JSON. Rotation
/// is taken and reported in degrees.
#[must_use]
pub fn snap_report(request: &SnapRequest) -> Value {
    let snapped = snap_mini(
        true,
        request.grid_type,
        request.scale,
        request.position,
        request.elevation,
        Euler::about_y(request.rotation_degrees.to_radians()),
    );
    serde_json::json!({
        "gridType": request.grid_type,
        "position": snapped.position,
        "rotationDegrees": snapped.rotation.y.to_degrees(),
        "scale": snapped.scale,
        "elevation": snapped.elevation,
    })
}
