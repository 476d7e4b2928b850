//! Integration tests for the match coordinator and the matchmaker.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use duelsync_match::{
    CoordinatorConfig, CreateMatch, InMemoryDecks, MatchCoordinator, MatchError,
    MatchPatch, Matchmaker, MatchmakingStatus,
};
use duelsync_protocol::{DeckId, GameState, MatchStatus, PlayerId, RoomCode};
use duelsync_store::MemoryMatchStore;
use serde_json::json;

fn code(raw: &str) -> RoomCode {
    RoomCode::parse(raw).expect("valid code")
}

fn coordinator() -> MatchCoordinator<MemoryMatchStore> {
    MatchCoordinator::new(MemoryMatchStore::new(), CoordinatorConfig::default())
}

fn pair(room: Option<&str>) -> CreateMatch {
    CreateMatch {
        room: room.map(code),
        participant_a: PlayerId(1),
        participant_b: Some(PlayerId(2)),
        deck_a: None,
        deck_b: None,
        state: None,
    }
}

fn open(room: &str) -> CreateMatch {
    CreateMatch {
        participant_b: None,
        ..pair(Some(room))
    }
}

fn turn(n: u64) -> MatchPatch {
    let mut state = GameState::new();
    state.insert("turn".into(), json!(n));
    MatchPatch {
        state,
        status: None,
    }
}

#[tokio::test]
async fn test_patch_scenario_stale_second_patch_sees_version_one() {
    let coord = coordinator();
    let record = coord.create(pair(Some("ABC123"))).await.unwrap();
    assert_eq!(record.version, 0);
    assert_eq!(record.status, MatchStatus::Active);

    let room = code("ABC123");
    let first = coord.patch(&room, 0, turn(2)).await.unwrap();
    assert_eq!(first.version, 1);
    assert_eq!(first.state["turn"], 2);

    match coord.patch(&room, 0, turn(3)).await {
        Err(MatchError::VersionConflict { expected, current }) => {
            assert_eq!(expected, 0);
            assert_eq!(current.version, 1);
            assert_eq!(current.state["turn"], 2);
        }
        other => panic!("expected VersionConflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_with_both_players_seats_a_first() {
    let coord = coordinator();
    let record = coord.create(pair(None)).await.unwrap();

    assert_eq!(record.state["current_player"], 1);
    assert_eq!(record.state["turn"], 1);
    assert!(record.state["players"].get("2").is_some());
    assert!(record.started_at.is_some());
}

#[tokio::test]
async fn test_create_generates_unique_codes() {
    let coord = coordinator();
    let mut seen = HashSet::new();
    for _ in 0..1000 {
        let record = coord.create(pair(None)).await.unwrap();
        assert!(seen.insert(record.room.clone()), "duplicate {}", record.room);
    }
    assert_eq!(coord.store().len().await, 1000);
}

#[tokio::test]
async fn test_create_supplied_taken_code_conflicts() {
    let coord = coordinator();
    coord.create(pair(Some("ABC123"))).await.unwrap();

    let result = coord.create(pair(Some("abc123"))).await;
    assert!(matches!(result, Err(MatchError::Conflict(_))));
}

#[tokio::test]
async fn test_create_retries_after_code_collision() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let coord = coordinator().with_code_generator(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        RoomCode::parse(if n < 2 { "SAME01" } else { "FRESH1" })
    });

    coord.create(pair(None)).await.unwrap();
    let second = coord.create(pair(None)).await.unwrap();

    assert_eq!(second.room, code("FRESH1"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_create_gives_up_when_codes_exhausted() {
    let coord = coordinator().with_code_generator(|| RoomCode::parse("SAME01"));
    coord.create(pair(None)).await.unwrap();

    let result = coord.create(pair(None)).await;
    assert!(matches!(result, Err(MatchError::Conflict(m)) if m.contains("5 attempts")));
}

#[tokio::test]
async fn test_create_self_play_conflicts() {
    let coord = coordinator();
    let mut request = pair(None);
    request.participant_b = Some(PlayerId(1));
    assert!(matches!(
        coord.create(request).await,
        Err(MatchError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_join_activates_waiting_match() {
    let coord = coordinator();
    let created = coord.create(open("OPEN01")).await.unwrap();
    assert_eq!(created.status, MatchStatus::Waiting);

    let joined = coord
        .join(&code("OPEN01"), PlayerId(2), Some(DeckId(20)))
        .await
        .unwrap();

    assert_eq!(joined.status, MatchStatus::Active);
    assert_eq!(joined.participant_b, Some(PlayerId(2)));
    assert_eq!(joined.version, 1);
    assert!(joined.started_at.is_some());
    assert_eq!(joined.state["current_player"], 1);
    assert_eq!(joined.state["players"]["2"]["deck_id"], 20);
}

#[tokio::test]
async fn test_join_repeated_is_idempotent() {
    let coord = coordinator();
    coord.create(open("OPEN01")).await.unwrap();
    let room = code("OPEN01");

    let first = coord.join(&room, PlayerId(2), None).await.unwrap();
    let second = coord.join(&room, PlayerId(2), None).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.version, 1, "no second transition");
}

#[tokio::test]
async fn test_join_full_room_conflicts() {
    let coord = coordinator();
    coord.create(open("OPEN01")).await.unwrap();
    let room = code("OPEN01");
    coord.join(&room, PlayerId(2), None).await.unwrap();

    let result = coord.join(&room, PlayerId(3), None).await;
    assert!(matches!(result, Err(MatchError::Conflict(m)) if m.contains("full")));
}

#[tokio::test]
async fn test_join_own_match_conflicts() {
    let coord = coordinator();
    coord.create(open("OPEN01")).await.unwrap();
    let result = coord.join(&code("OPEN01"), PlayerId(1), None).await;
    assert!(matches!(result, Err(MatchError::Conflict(_))));
}

#[tokio::test]
async fn test_join_missing_room_not_found() {
    let coord = coordinator();
    let result = coord.join(&code("NOPE99"), PlayerId(2), None).await;
    assert!(matches!(result, Err(MatchError::NotFound(_))));
}

#[tokio::test]
async fn test_get_missing_room_not_found() {
    let coord = coordinator();
    assert!(matches!(
        coord.get(&code("NOPE99")).await,
        Err(MatchError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_patch_finished_stamps_snapshot() {
    let coord = coordinator();
    coord.create(pair(Some("END001"))).await.unwrap();
    let room = code("END001");

    let mut patch = turn(7);
    patch.status = Some(MatchStatus::Finished);
    let snapshot = coord.patch(&room, 0, patch).await.unwrap();
    assert_eq!(snapshot.status, MatchStatus::Finished);

    let record = coord.record(&room).await.unwrap();
    assert!(record.finished_at.is_some());
    assert_eq!(record.snapshot.as_ref().unwrap()["turn"], 7);

    let result = coord.patch(&room, 1, turn(8)).await;
    assert!(matches!(result, Err(MatchError::Conflict(_))));
}

#[tokio::test]
async fn test_patch_back_to_waiting_rejected() {
    let coord = coordinator();
    coord.create(pair(Some("ABC123"))).await.unwrap();
    let patch = MatchPatch {
        status: Some(MatchStatus::Waiting),
        ..MatchPatch::default()
    };
    let result = coord.patch(&code("ABC123"), 0, patch).await;
    assert!(matches!(result, Err(MatchError::Validation(_))));
}

#[tokio::test]
async fn test_patch_leaves_unnamed_fields() {
    let coord = coordinator();
    coord.create(pair(Some("ABC123"))).await.unwrap();

    let snapshot = coord.patch(&code("ABC123"), 0, turn(2)).await.unwrap();
    assert_eq!(snapshot.state["phase"], "start");
    assert_eq!(snapshot.state["current_player"], 1);
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let coord = coordinator();
    coord.create(pair(Some("ABC123"))).await.unwrap();
    let room = code("ABC123");

    let first = coord.cancel(&room).await.unwrap();
    let second = coord.cancel(&room).await.unwrap();

    assert_eq!(first.status, MatchStatus::Cancelled);
    assert!(first.finished_at.is_some());
    assert_eq!(first, second);
    assert_eq!(coord.store().len().await, 1, "cancel never deletes");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_patches_exactly_one_wins() {
    let coord = Arc::new(coordinator());
    coord.create(pair(Some("RACE01"))).await.unwrap();

    let mut tasks = Vec::new();
    for n in 0..16u64 {
        let coord = Arc::clone(&coord);
        tasks.push(tokio::spawn(async move {
            coord.patch(&code("RACE01"), 0, turn(100 + n)).await
        }));
    }

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(snapshot) => winners.push(snapshot),
            Err(MatchError::VersionConflict { current, .. }) => {
                assert_eq!(current.version, 1);
                conflicts += 1;
            }
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, 15);

    let stored = coord.get(&code("RACE01")).await.unwrap();
    assert_eq!(stored, winners[0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_exactly_one_seated() {
    let coord = Arc::new(coordinator());
    coord.create(open("RACE02")).await.unwrap();

    let mut tasks = Vec::new();
    for player in 10..18u64 {
        let coord = Arc::clone(&coord);
        tasks.push(tokio::spawn(async move {
            coord.join(&code("RACE02"), PlayerId(player), None).await
        }));
    }

    let mut seated = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => seated += 1,
            Err(MatchError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(seated, 1);
    let record = coord.record(&code("RACE02")).await.unwrap();
    assert_eq!(record.version, 1);
    assert!(record.participant_b.is_some());
}

async fn matchmaker() -> Matchmaker<MemoryMatchStore, InMemoryDecks> {
    let decks = InMemoryDecks::new();
    decks.grant(PlayerId(1), DeckId(10)).await;
    decks.grant(PlayerId(2), DeckId(20)).await;
    Matchmaker::new(Arc::new(coordinator()), Arc::new(decks))
}

#[tokio::test]
async fn test_matchmaking_create_with_foreign_deck_forbidden() {
    let mm = matchmaker().await;
    let result = mm.create(PlayerId(1), DeckId(20), None).await;
    assert!(matches!(result, Err(MatchError::Forbidden(_))));
}

#[tokio::test]
async fn test_matchmaking_create_join_status_flow() {
    let mm = matchmaker().await;
    let record = mm.create(PlayerId(1), DeckId(10), None).await.unwrap();
    let room = record.room.clone();

    assert!(matches!(
        mm.status(&room).await.unwrap(),
        MatchmakingStatus::Waiting { .. }
    ));

    let joined = mm.join(&room, PlayerId(2), DeckId(20)).await.unwrap();
    assert_eq!(joined.status, MatchStatus::Active);
    assert_eq!(joined.deck_b, Some(DeckId(20)));

    match mm.status(&room).await.unwrap() {
        MatchmakingStatus::Ready { record } => assert_eq!(record.version, 1),
        other => panic!("expected ready, got {other:?}"),
    }
    assert_eq!(
        mm.status(&code("NOPE99")).await.unwrap(),
        MatchmakingStatus::NotFound
    );
}

#[tokio::test]
async fn test_matchmaking_status_cancelled_waiting_room_is_ready() {
    let coord = Arc::new(coordinator());
    let decks = InMemoryDecks::new();
    decks.grant(PlayerId(1), DeckId(10)).await;
    let mm = Matchmaker::new(Arc::clone(&coord), Arc::new(decks));

    let record = mm
        .create(PlayerId(1), DeckId(10), Some(code("MM0001")))
        .await
        .unwrap();
    coord.cancel(&record.room).await.unwrap();

    match mm.status(&record.room).await.unwrap() {
        MatchmakingStatus::Ready { record } => {
            assert_eq!(record.status, MatchStatus::Cancelled);
            assert_eq!(record.participant_b, None);
        }
        other => panic!("expected ready, got {other:?}"),
    }
}

#[tokio::test]
async fn test_matchmaking_join_with_foreign_deck_forbidden() {
    let mm = matchmaker().await;
    let record = mm.create(PlayerId(1), DeckId(10), None).await.unwrap();
    let result = mm.join(&record.room, PlayerId(2), DeckId(10)).await;
    assert!(matches!(result, Err(MatchError::Forbidden(_))));
}
