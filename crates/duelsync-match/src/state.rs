//! The few things the subsystem does to the otherwise opaque state.

use duelsync_protocol::{DeckId, GameState, PlayerId};
use serde_json::{json, Value};

/// Seats both players with `a` to move first.
///
/// Keeps any `turn` and `phase` already present; always sets
/// `current_player` to `a` and records each player's deck.
pub fn seat_players(
    state: &mut GameState,
    a: (PlayerId, Option<DeckId>),
    b: (PlayerId, Option<DeckId>),
) {
    state.entry("turn").or_insert(json!(1));
    state.entry("phase").or_insert(json!("start"));
    state.insert("current_player".into(), json!(a.0));

    let players = state
        .entry("players")
        .or_insert_with(|| Value::Object(Default::default()));
    if let Value::Object(players) = players {
        for (player, deck) in [a, b] {
            players
                .entry(player.0.to_string())
                .or_insert_with(|| json!({ "deck_id": deck }));
        }
    }
}

/// A fresh state for a match between `a` and `b`.
pub fn initial_state(
    a: (PlayerId, Option<DeckId>),
    b: (PlayerId, Option<DeckId>),
) -> GameState {
    let mut state = GameState::new();
    seat_players(&mut state, a, b);
    state
}

/// Shallow merge: each top-level field in `patch` replaces the stored
/// one. Fields not named are left alone.
pub fn merge_fields(state: &mut GameState, patch: GameState) {
    for (key, value) in patch {
        state.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_slot_a_moves_first() {
        let s = initial_state((PlayerId(1), Some(DeckId(10))), (PlayerId(2), None));
        assert_eq!(s["turn"], 1);
        assert_eq!(s["current_player"], 1);
        assert_eq!(s["phase"], "start");
        assert_eq!(s["players"]["1"]["deck_id"], 10);
        assert!(s["players"]["2"]["deck_id"].is_null());
    }

    #[test]
    fn test_seat_players_keeps_existing_turn() {
        let mut s = GameState::new();
        s.insert("turn".into(), json!(5));
        seat_players(&mut s, (PlayerId(3), None), (PlayerId(4), None));
        assert_eq!(s["turn"], 5);
        assert_eq!(s["current_player"], 3);
    }

    #[test]
    fn test_merge_fields_replaces_only_named() {
        let mut s = initial_state((PlayerId(1), None), (PlayerId(2), None));
        let mut patch = GameState::new();
        patch.insert("turn".into(), json!(2));
        patch.insert("phase".into(), Value::Null);

        merge_fields(&mut s, patch);

        assert_eq!(s["turn"], 2);
        assert!(s["phase"].is_null());
        assert_eq!(s["current_player"], 1);
    }
}
