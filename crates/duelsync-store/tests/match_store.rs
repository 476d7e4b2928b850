//! Integration tests for the in-memory match store's conditional update.

use duelsync_protocol::{GameState, MatchStatus, PlayerId, RoomCode};
use duelsync_store::{MatchStore, MemoryMatchStore, NewMatch, StoreError};
use serde_json::json;

fn code(raw: &str) -> RoomCode {
    RoomCode::parse(raw).expect("valid code")
}

fn new_match(room: &str) -> NewMatch {
    NewMatch {
        room: code(room),
        participant_a: PlayerId(1),
        participant_b: Some(PlayerId(2)),
        deck_a: None,
        deck_b: None,
        status: MatchStatus::Active,
        state: GameState::new(),
    }
}

#[tokio::test]
async fn test_insert_starts_at_version_zero() {
    let store = MemoryMatchStore::new();
    let record = store.insert(new_match("ABC123")).await.unwrap();

    assert_eq!(record.version, 0);
    assert_eq!(record.status, MatchStatus::Active);
    assert!(record.started_at.is_some(), "active records are started");
    assert!(record.finished_at.is_none());
}

#[tokio::test]
async fn test_insert_waiting_record_has_no_start_time() {
    let store = MemoryMatchStore::new();
    let mut new = new_match("WAIT01");
    new.participant_b = None;
    new.status = MatchStatus::Waiting;

    let record = store.insert(new).await.unwrap();
    assert!(record.started_at.is_none());
}

#[tokio::test]
async fn test_insert_duplicate_code_rejected() {
    let store = MemoryMatchStore::new();
    store.insert(new_match("ABC123")).await.unwrap();

    let result = store.insert(new_match("abc123")).await;
    assert!(matches!(result, Err(StoreError::Duplicate(c)) if c == "ABC123"));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_update_if_version_bumps_by_one() {
    let store = MemoryMatchStore::new();
    store.insert(new_match("ABC123")).await.unwrap();

    let updated = store
        .update_if_version(&code("ABC123"), 0, |r| {
            r.state.insert("turn".into(), json!(2));
        })
        .await
        .unwrap();

    assert_eq!(updated.version, 1);
    assert_eq!(updated.state["turn"], 2);
    let stored = store.find_by_code(&code("ABC123")).await.unwrap().unwrap();
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn test_update_if_version_stale_returns_current() {
    let store = MemoryMatchStore::new();
    store.insert(new_match("ABC123")).await.unwrap();
    store
        .update_if_version(&code("ABC123"), 0, |r| {
            r.state.insert("turn".into(), json!(2));
        })
        .await
        .unwrap();

    let result = store
        .update_if_version(&code("ABC123"), 0, |r| {
            r.state.insert("turn".into(), json!(99));
        })
        .await;

    match result {
        Err(StoreError::VersionMismatch { expected, current }) => {
            assert_eq!(expected, 0);
            assert_eq!(current.version, 1);
            assert_eq!(current.state["turn"], 2, "losing write left no trace");
        }
        other => panic!("expected VersionMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_update_if_version_missing_room_not_found() {
    let store = MemoryMatchStore::new();
    let result = store.update_if_version(&code("NOPE99"), 0, |_| {}).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_update_cannot_rewrite_identity_or_version() {
    let store = MemoryMatchStore::new();
    let original = store.insert(new_match("ABC123")).await.unwrap();

    let updated = store
        .update_if_version(&code("ABC123"), 0, |r| {
            r.id = 999;
            r.version = 50;
            r.room = RoomCode::parse("OTHER1").unwrap();
        })
        .await
        .unwrap();

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.version, 1);
    assert_eq!(updated.room, code("ABC123"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_exactly_one_wins() {
    let store = MemoryMatchStore::new();
    store.insert(new_match("RACE01")).await.unwrap();

    let mut tasks = Vec::new();
    for writer in 0..16u64 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store
                .update_if_version(&code("RACE01"), 0, move |r| {
                    r.state.insert("writer".into(), json!(writer));
                })
                .await
        }));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(record) => {
                assert_eq!(record.version, 1);
                wins += 1;
            }
            Err(StoreError::VersionMismatch { current, .. }) => {
                assert_eq!(current.version, 1, "losers see the post-transition record");
                conflicts += 1;
            }
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(conflicts, 15);
}
