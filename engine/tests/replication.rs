//! Replicas driven by the same action stream.
//!
//! The GM's client applies every action it dispatches; players only receive
//! actions that carry a peer key. After any sequence of GM edits, a player's
//! scenario must equal the public snapshot of the GM's.

use engine::action::{
    Action, ActionKind, add_map_action, add_mini_action, apply_action, update_mini_gm_only_action,
    update_mini_name_action, update_mini_position_action, update_mini_roster_values_action,
};
use engine::doc::{MapPatch, MiniPatch, Scenario};
use engine::geom::Vector3;
use engine::metadata::Metadata;
use engine::roster::{RosterValue, RosterValues};
use engine::snapshot::scenario_to_json;

#[derive(Default)]
struct Session {
    gm: Scenario,
    player: Scenario,
    sent_to_players: usize,
}

impl Session {
    fn dispatch(&mut self, action: Action) {
        let wire = serde_json::to_string(&action).unwrap();
        let received: Action = serde_json::from_str(&wire).unwrap();
        apply_action(&mut self.gm, &action);
        if received.peer_key.is_some() {
            apply_action(&mut self.player, &received);
            self.sent_to_players += 1;
        }
    }

    fn dispatch_all(&mut self, actions: Vec<Action>) {
        for action in actions {
            self.dispatch(action);
        }
    }

    fn assert_in_step(&self) {
        assert_eq!(self.player, scenario_to_json(&self.gm).public);
    }
}

fn created_mini_id(action: &Action) -> String {
    match &action.kind {
        ActionKind::UpdateMini { mini_id, .. } => mini_id.clone(),
        other => panic!("expected a mini creation, got {}", other.name()),
    }
}

fn new_mini(name: &str, gm_only: bool) -> Action {
    add_mini_action(MiniPatch {
        name: Some(name.to_owned()),
        metadata: Some(Metadata::id_only("file-mini")),
        gm_only: Some(gm_only),
        ..MiniPatch::default()
    })
}

#[test]
fn visible_edits_reach_players() {
    let mut session = Session::default();
    let add = new_mini("Orc", false);
    let orc = created_mini_id(&add);
    session.dispatch(add);
    session.dispatch(update_mini_position_action(&session.gm, &orc, Vector3::new(2.0, 0.0, 3.0), None));
    session.dispatch(update_mini_name_action(&session.gm, &orc, "Orc chief"));

    assert_eq!(session.sent_to_players, 3);
    assert_eq!(session.player.minis[&orc].name, "Orc chief");
    assert_eq!(session.player.minis[&orc].position, Vector3::new(2.0, 0.0, 3.0));
    session.assert_in_step();
}

#[test]
fn hidden_objects_stay_with_the_gm() {
    let mut session = Session::default();
    let add = new_mini("Assassin", true);
    let assassin = created_mini_id(&add);
    session.dispatch(add);
    session.dispatch(update_mini_position_action(&session.gm, &assassin, Vector3::new(5.0, 0.0, 5.0), None));
    session.dispatch(add_map_action(MapPatch {
        metadata: Some(Metadata::id_only("file-map")),
        ..MapPatch::default()
    }));

    assert_eq!(session.sent_to_players, 0);
    assert!(session.player.minis.is_empty());
    assert!(session.player.maps.is_empty());
    assert_eq!(session.gm.minis.len(), 1);
    assert_eq!(session.gm.maps.len(), 1);
    session.assert_in_step();
}

#[test]
fn revealing_sends_the_whole_piece() {
    let mut session = Session::default();
    let add = new_mini("Assassin", true);
    let assassin = created_mini_id(&add);
    session.dispatch(add);
    session.dispatch(update_mini_position_action(&session.gm, &assassin, Vector3::new(5.0, 0.0, 5.0), None));

    let reveal = update_mini_gm_only_action(&session.gm, &assassin, false);
    session.dispatch_all(reveal);

    assert_eq!(session.player.minis[&assassin].position, Vector3::new(5.0, 0.0, 5.0));
    assert!(!session.player.minis[&assassin].gm_only);
    session.assert_in_step();
}

#[test]
fn hiding_removes_the_piece_from_players() {
    let mut session = Session::default();
    let add = new_mini("Orc", false);
    let orc = created_mini_id(&add);
    session.dispatch(add);
    assert!(session.player.minis.contains_key(&orc));

    let hide = update_mini_gm_only_action(&session.gm, &orc, true);
    session.dispatch_all(hide);

    assert!(!session.player.minis.contains_key(&orc));
    assert!(session.gm.minis[&orc].gm_only);
    session.assert_in_step();
}

#[test]
fn gm_roster_values_are_not_sent() {
    let mut session = Session::default();
    let add = new_mini("Orc", false);
    let orc = created_mini_id(&add);
    session.dispatch(add);

    let secret: RosterValues = [("ac".to_owned(), RosterValue::Number(15.0))].into_iter().collect();
    session.dispatch(update_mini_roster_values_action(&session.gm, &orc, secret, true));
    let public: RosterValues = [("hp".to_owned(), RosterValue::Number(7.0))].into_iter().collect();
    session.dispatch(update_mini_roster_values_action(&session.gm, &orc, public, false));

    assert_eq!(session.gm.minis[&orc].pieces_roster_gm_values.len(), 1);
    assert!(session.player.minis[&orc].pieces_roster_gm_values.is_empty());
    assert_eq!(session.player.minis[&orc].pieces_roster_values["hp"], RosterValue::Number(7.0));
    session.assert_in_step();
}

#[test]
fn revealing_keeps_gm_roster_values_private() {
    let mut session = Session::default();
    let add = new_mini("Assassin", true);
    let assassin = created_mini_id(&add);
    session.dispatch(add);
    let secret: RosterValues = [("ac".to_owned(), RosterValue::Number(15.0))].into_iter().collect();
    session.dispatch(update_mini_roster_values_action(&session.gm, &assassin, secret, true));

    let reveal = update_mini_gm_only_action(&session.gm, &assassin, false);
    session.dispatch_all(reveal);

    assert!(session.player.minis[&assassin].pieces_roster_gm_values.is_empty());
    assert_eq!(session.gm.minis[&assassin].pieces_roster_gm_values["ac"], RosterValue::Number(15.0));
    session.assert_in_step();
}

#[test]
fn heads_track_the_last_action_per_audience() {
    let mut session = Session::default();
    let visible = new_mini("Orc", false);
    let visible_id = visible.action_id.clone();
    session.dispatch(visible);
    let hidden = new_mini("Assassin", true);
    let hidden_id = hidden.action_id.clone();
    session.dispatch(hidden);

    assert_eq!(session.gm.head_action_ids, [hidden_id]);
    assert_eq!(session.gm.player_head_action_ids, [visible_id.clone()]);
    assert_eq!(session.player.head_action_ids, [visible_id]);
    session.assert_in_step();
}
