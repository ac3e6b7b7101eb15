use serde_json::json;

use super::*;

const GM: &str = "gm@example.com";

fn control(whitelist: &[&str], blacklist: &[&str]) -> TabletopUserControl {
    TabletopUserControl {
        whitelist: whitelist.iter().map(|s| (*s).to_owned()).collect(),
        blacklist: blacklist.iter().map(|s| (*s).to_owned()).collect(),
    }
}

fn user(email: &str, verified: bool) -> ConnectedUser {
    ConnectedUser { email_address: email.to_owned(), verified_connection: verified }
}

// =============================================================
// Serde
// =============================================================

#[test]
fn minimal_settings_fill_defaults() {
    let tabletop: Tabletop = serde_json::from_value(json!({"gm": GM})).unwrap();
    assert_eq!(tabletop.default_grid, GridType::Square);
    assert_eq!(tabletop.comms_style, CommsStyle::PeerToPeer);
    assert!(!tabletop.gm_only_ping);
    assert_eq!(tabletop.pieces_roster_columns.len(), 4);
    assert!(tabletop.video_muted.is_empty());
}

#[test]
fn enums_use_wire_names() {
    let mut tabletop = Tabletop::new(GM);
    tabletop.distance_mode = DistanceMode::GridDiagonalThreeEveryTwo;
    tabletop.distance_round = DistanceRound::RoundUp;
    let value = serde_json::to_value(&tabletop).unwrap();
    assert_eq!(value["distanceMode"], json!("GRID_DIAGONAL_THREE_EVERY_TWO"));
    assert_eq!(value["distanceRound"], json!("ROUND_UP"));
    assert_eq!(value["commsStyle"], json!("PeerToPeer"));
    assert_eq!(value["defaultGrid"], json!("SQUARE"));
}

// =============================================================
// Access
// =============================================================

#[test]
fn gm_and_uncontrolled_tabletops_allow_everyone() {
    assert_eq!(is_user_allowed_on_tabletop(GM, "anyone@example.com", None), Some(true));
    let closed = control(&[], &["*"]);
    assert_eq!(is_user_allowed_on_tabletop(GM, GM, Some(&closed)), Some(true));
}

#[test]
fn unlisted_user_needs_a_decision() {
    let lists = control(&["friend@example.com"], &["foe@example.com"]);
    assert_eq!(is_user_allowed_on_tabletop(GM, "stranger@example.com", Some(&lists)), None);
}

#[test]
fn exact_match_beats_wildcard() {
    let lists = control(&["friend@example.com"], &["*"]);
    assert_eq!(is_user_allowed_on_tabletop(GM, "friend@example.com", Some(&lists)), Some(true));
    assert_eq!(is_user_allowed_on_tabletop(GM, "stranger@example.com", Some(&lists)), Some(false));
}

#[test]
fn blacklist_wins_at_same_level() {
    let wild = control(&["*"], &["*"]);
    assert_eq!(is_user_allowed_on_tabletop(GM, "someone@example.com", Some(&wild)), Some(false));
    let both = control(&["*", "foe@example.com"], &["foe@example.com"]);
    assert_eq!(is_user_allowed_on_tabletop(GM, "foe@example.com", Some(&both)), Some(false));
    let open = control(&["*"], &["foe@example.com"]);
    assert_eq!(is_user_allowed_on_tabletop(GM, "friend@example.com", Some(&open)), Some(true));
}

// =============================================================
// Lock
// =============================================================

#[test]
fn lock_applies_to_other_peers_only() {
    let mut tabletop = Tabletop::new(GM);
    let users = BTreeMap::new();
    assert!(!is_tabletop_locked_for_peer(&tabletop, &users, Some("p1"), false));
    tabletop.tabletop_locked_peer_id = Some("p1".to_owned());
    assert!(!is_tabletop_locked_for_peer(&tabletop, &users, Some("p1"), false));
    assert!(is_tabletop_locked_for_peer(&tabletop, &users, Some("p2"), false));
    assert!(is_tabletop_locked_for_peer(&tabletop, &users, None, true));
}

#[test]
fn gm_override_needs_verified_gm_connection() {
    let mut tabletop = Tabletop::new(GM);
    tabletop.tabletop_locked_peer_id = Some("p1".to_owned());
    let users = BTreeMap::from([
        ("gm-peer".to_owned(), user(GM, true)),
        ("spoof".to_owned(), user(GM, false)),
        ("player".to_owned(), user("player@example.com", true)),
    ]);
    assert!(!is_tabletop_locked_for_peer(&tabletop, &users, Some("gm-peer"), true));
    assert!(is_tabletop_locked_for_peer(&tabletop, &users, Some("gm-peer"), false));
    assert!(is_tabletop_locked_for_peer(&tabletop, &users, Some("spoof"), true));
    assert!(is_tabletop_locked_for_peer(&tabletop, &users, Some("player"), true));
}

// =============================================================
// Network hub
// =============================================================

#[test]
fn hub_is_lowest_gm_peer() {
    let users = BTreeMap::from([
        ("peer-c".to_owned(), user(GM, true)),
        ("peer-a".to_owned(), user("player@example.com", true)),
        ("peer-b".to_owned(), user(GM, true)),
    ]);
    assert_eq!(network_hub_id("player@example.com", Some("peer-0"), GM, &users).as_deref(), Some("peer-b"));
    assert_eq!(network_hub_id(GM, Some("peer-0"), GM, &users).as_deref(), Some("peer-0"));
    assert_eq!(network_hub_id(GM, Some("peer-z"), GM, &users).as_deref(), Some("peer-b"));
}

#[test]
fn no_gm_connected_means_no_hub() {
    let users = BTreeMap::from([("peer-a".to_owned(), user("player@example.com", true))]);
    assert_eq!(network_hub_id("player@example.com", Some("peer-a"), GM, &users), None);
}
