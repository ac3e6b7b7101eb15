//! Per-tabletop settings and access control.
//!
//! The settings travel in the same JSON document as the scenario; see
//! [`crate::snapshot::json_to_scenario_and_tabletop`].

#[cfg(test)]
#[path = "tabletop_test.rs"]
mod tabletop_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::GridType;
use crate::roster::{INITIAL_PIECES_ROSTER_COLUMNS, RosterColumn};

/// Wildcard entry in a whitelist or blacklist.
const ANY_USER: &str = "*";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistanceMode {
    #[default]
    Straight,
    GridDiagonalOneOne,
    GridDiagonalThreeEveryTwo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistanceRound {
    #[default]
    OneDecimal,
    RoundOff,
    RoundUp,
    RoundDown,
}

/// How peers exchange audio and video.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommsStyle {
    #[default]
    PeerToPeer,
    JitsiMeet,
}

/// Who may join a tabletop besides the GM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabletopUserControl {
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
}

fn initial_columns() -> Vec<RosterColumn> {
    INITIAL_PIECES_ROSTER_COLUMNS.clone()
}

/// Settings of one tabletop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tabletop {
    /// Email address of the game master. Empty in documents saved without
    /// one, such as player snapshots.
    #[serde(default)]
    pub gm: String,
    #[serde(default)]
    pub gm_secret: Option<String>,
    #[serde(default)]
    pub gm_only_ping: bool,
    #[serde(default)]
    pub default_grid: GridType,
    #[serde(default)]
    pub distance_mode: DistanceMode,
    #[serde(default)]
    pub distance_round: DistanceRound,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_unit: Option<String>,
    #[serde(default)]
    pub comms_style: CommsStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_colour_swatches: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_colour_swatches: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_colour_swatches: Option<Vec<String>>,
    /// Peer holding the tabletop lock, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tabletop_locked_peer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tabletop_user_control: Option<TabletopUserControl>,
    /// Heads at the last save; never persisted meaningfully, reset on load.
    #[serde(default)]
    pub last_saved_head_action_ids: Option<Vec<String>>,
    #[serde(default)]
    pub last_saved_player_head_action_ids: Option<Vec<String>>,
    /// Muted video sources keyed by metadata id.
    #[serde(default)]
    pub video_muted: BTreeMap<String, bool>,
    #[serde(default = "initial_columns")]
    pub pieces_roster_columns: Vec<RosterColumn>,
}

impl Tabletop {
    /// Fresh settings for a tabletop run by `gm`.
    #[must_use]
    pub fn new(gm: impl Into<String>) -> Self {
        Self {
            gm: gm.into(),
            gm_secret: None,
            gm_only_ping: false,
            default_grid: GridType::Square,
            distance_mode: DistanceMode::default(),
            distance_round: DistanceRound::default(),
            grid_scale: None,
            grid_unit: None,
            comms_style: CommsStyle::default(),
            base_colour_swatches: None,
            template_colour_swatches: None,
            grid_colour_swatches: None,
            tabletop_locked_peer_id: None,
            tabletop_user_control: None,
            last_saved_head_action_ids: None,
            last_saved_player_head_action_ids: None,
            video_muted: BTreeMap::new(),
            pieces_roster_columns: initial_columns(),
        }
    }
}

/// A peer currently connected to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedUser {
    pub email_address: String,
    /// Whether the peer proved its identity during the handshake.
    pub verified_connection: bool,
}

// =============================================================================
// ACCESS
// =============================================================================

/// The entry of `list` matching `email`: the address itself, else `*`.
fn list_match<'a>(list: &'a [String], email: &str) -> Option<&'a str> {
    list.iter()
        .find(|entry| *entry == email)
        .or_else(|| list.iter().find(|entry| *entry == ANY_USER))
        .map(String::as_str)
}

/// Whether `email` may join a tabletop run by `gm`.
///
/// The GM is always allowed, as is everyone when there's no user control.
/// Otherwise an exact match beats a wildcard, and the blacklist wins when
/// both lists match at the same level. `None` means the user is on neither
/// list and the GM has to decide.
#[must_use]
pub fn is_user_allowed_on_tabletop(gm: &str, email: &str, control: Option<&TabletopUserControl>) -> Option<bool> {
    let Some(control) = control else {
        return Some(true);
    };
    if email == gm {
        return Some(true);
    }
    match (list_match(&control.whitelist, email), list_match(&control.blacklist, email)) {
        (None, None) => None,
        (None, Some(_)) => Some(false),
        (Some(white), Some(black)) if white == black || black == email => Some(false),
        (Some(_), _) => Some(true),
    }
}

/// Whether the tabletop is locked against `peer_id`.
///
/// With `gm_override` set, a verified connection from the GM's account is
/// never locked out.
#[must_use]
pub fn is_tabletop_locked_for_peer(
    tabletop: &Tabletop,
    connected_users: &BTreeMap<String, ConnectedUser>,
    peer_id: Option<&str>,
    gm_override: bool,
) -> bool {
    let Some(locked_by) = tabletop.tabletop_locked_peer_id.as_deref() else {
        return false;
    };
    if peer_id == Some(locked_by) {
        return false;
    }
    let from_gm = gm_override
        && peer_id
            .and_then(|peer_id| connected_users.get(peer_id))
            .is_some_and(|user| user.verified_connection && user.email_address == tabletop.gm);
    !from_gm
}

/// The peer that relays for everyone: the lowest peer id among the GM's
/// connections, counting this client when it belongs to the GM.
#[must_use]
pub fn network_hub_id(
    my_user_id: &str,
    my_peer_id: Option<&str>,
    gm: &str,
    connected_users: &BTreeMap<String, ConnectedUser>,
) -> Option<String> {
    let mine = if my_user_id == gm { my_peer_id } else { None };
    let connected = connected_users
        .iter()
        .filter(|(_, user)| user.email_address == gm)
        .map(|(peer_id, _)| peer_id.as_str());
    mine.into_iter().chain(connected).min().map(str::to_owned)
}
