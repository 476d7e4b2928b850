//! Integration tests for quick-room lifecycle and lazy expiry.

use std::time::Duration;

use duelsync_protocol::PlayerId;
use duelsync_quickroom::{
    Clock, CreateQuickRoom, Difficulty, QuickRoom, QuickRoomConfig, QuickRoomError,
    QuickRoomMode, QuickRoomRegistry, QuickRoomStatus,
};
use duelsync_store::{KeyValueStore, MemoryKv, StoreError};

fn registry() -> (QuickRoomRegistry<MemoryKv<QuickRoom>>, MemoryKv<QuickRoom>) {
    let kv = MemoryKv::new();
    (QuickRoomRegistry::new(kv.clone(), QuickRoomConfig::default()), kv)
}

fn bot_request() -> CreateQuickRoom {
    CreateQuickRoom {
        mode: QuickRoomMode::Bot,
        deck: (0..20).map(|n| format!("card-{n}")).collect(),
        difficulty: Some(Difficulty::Hard),
        player_id: Some(PlayerId(7)),
    }
}

#[tokio::test]
async fn test_create_stores_waiting_room_with_redirect() {
    let (reg, _) = registry();
    let room = reg.create(bot_request()).await.unwrap();

    assert!(room.id.starts_with("bot_"));
    assert_eq!(room.status, QuickRoomStatus::Waiting);
    assert_eq!(room.redirect, format!("/play/{}", room.id));
    assert_eq!(reg.get(&room.id).await.unwrap(), room);
}

#[tokio::test]
async fn test_create_wrong_deck_size_rejected() {
    let (reg, kv) = registry();
    let mut request = bot_request();
    request.deck.pop();

    let result = reg.create(request).await;
    assert!(matches!(result, Err(QuickRoomError::Validation(m)) if m.contains("20")));
    assert_eq!(kv.stored_len().await, 0);
}

#[tokio::test]
async fn test_create_pvp_with_difficulty_rejected() {
    let (reg, _) = registry();
    let mut request = bot_request();
    request.mode = QuickRoomMode::Pvp;

    assert!(matches!(
        reg.create(request).await,
        Err(QuickRoomError::Validation(_))
    ));
}

#[tokio::test]
async fn test_get_unknown_not_found() {
    let (reg, _) = registry();
    assert!(matches!(
        reg.get("bot_nope").await,
        Err(QuickRoomError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_get_past_absolute_ttl_not_found() {
    let (reg, kv) = registry();
    let room = reg.create(bot_request()).await.unwrap();
    reg.patch(&room.id, QuickRoomStatus::Active).await.unwrap();

    tokio::time::advance(Duration::from_secs(2 * 60 * 60 + 1)).await;

    assert!(matches!(
        reg.get(&room.id).await,
        Err(QuickRoomError::NotFound(_))
    ));
    assert_eq!(kv.stored_len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_get_idle_waiting_room_purged() {
    let (reg, kv) = registry();
    let room = reg.create(bot_request()).await.unwrap();

    tokio::time::advance(Duration::from_secs(16 * 60)).await;

    assert!(matches!(
        reg.get(&room.id).await,
        Err(QuickRoomError::NotFound(_))
    ));
    assert_eq!(kv.stored_len().await, 0, "purged on access");
}

#[tokio::test(start_paused = true)]
async fn test_get_idle_active_room_survives() {
    let (reg, _) = registry();
    let room = reg.create(bot_request()).await.unwrap();
    reg.patch(&room.id, QuickRoomStatus::Active).await.unwrap();

    tokio::time::advance(Duration::from_secs(90 * 60)).await;

    let fetched = reg.get(&room.id).await.unwrap();
    assert_eq!(fetched.status, QuickRoomStatus::Active);
}

#[tokio::test(start_paused = true)]
async fn test_patch_resets_idle_clock() {
    let (reg, _) = registry();
    let room = reg.create(bot_request()).await.unwrap();

    tokio::time::advance(Duration::from_secs(10 * 60)).await;
    reg.patch(&room.id, QuickRoomStatus::Waiting).await.unwrap();
    tokio::time::advance(Duration::from_secs(10 * 60)).await;

    assert!(reg.get(&room.id).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_patch_finished_room_becomes_idle_eligible() {
    let (reg, _) = registry();
    let room = reg.create(bot_request()).await.unwrap();
    reg.patch(&room.id, QuickRoomStatus::Active).await.unwrap();
    reg.patch(&room.id, QuickRoomStatus::Finished).await.unwrap();

    tokio::time::advance(Duration::from_secs(15 * 60 + 1)).await;

    assert!(reg.get(&room.id).await.is_err());
}

#[tokio::test]
async fn test_delete_removes_room() {
    let (reg, _) = registry();
    let room = reg.create(bot_request()).await.unwrap();

    reg.delete(&room.id).await.unwrap();

    assert!(matches!(
        reg.get(&room.id).await,
        Err(QuickRoomError::NotFound(_))
    ));
    assert!(matches!(
        reg.delete(&room.id).await,
        Err(QuickRoomError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_sweep_clears_rooms_past_absolute_ttl() {
    let (reg, kv) = registry();
    for _ in 0..3 {
        reg.create(bot_request()).await.unwrap();
    }

    tokio::time::advance(Duration::from_secs(3 * 60 * 60)).await;

    assert_eq!(reg.sweep().await.unwrap(), 3);
    assert_eq!(kv.stored_len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_second_registry_sees_expiry_from_stored_timestamps() {
    let kv = MemoryKv::new();
    let first = QuickRoomRegistry::new(kv.clone(), QuickRoomConfig::default());
    let second = QuickRoomRegistry::with_clock(kv.clone(), QuickRoomConfig::default(), Clock::new());
    let room = first.create(bot_request()).await.unwrap();
    assert_eq!(second.get(&room.id).await.unwrap(), room);

    tokio::time::advance(Duration::from_secs(10 * 60)).await;
    second.patch(&room.id, QuickRoomStatus::Waiting).await.unwrap();

    tokio::time::advance(Duration::from_secs(10 * 60)).await;
    assert!(first.get(&room.id).await.is_ok(), "patch on the other registry reset idle time");

    tokio::time::advance(Duration::from_secs(6 * 60)).await;
    assert!(matches!(
        first.get(&room.id).await,
        Err(QuickRoomError::NotFound(_))
    ));
}

/// A store where every key already looks taken.
struct AlwaysTaken;

impl KeyValueStore<QuickRoom> for AlwaysTaken {
    async fn get(&self, _key: &str) -> Result<Option<QuickRoom>, StoreError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: QuickRoom, _ttl: Option<Duration>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn set_if_absent(
        &self,
        _key: &str,
        _value: QuickRoom,
        _ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn compare_and_set(
        &self,
        _key: &str,
        _expected: &QuickRoom,
        _value: QuickRoom,
        _ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn sweep(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}

#[tokio::test]
async fn test_create_gives_up_when_every_id_is_taken() {
    let reg = QuickRoomRegistry::new(AlwaysTaken, QuickRoomConfig::default());

    let result = reg.create(bot_request()).await;
    assert!(matches!(result, Err(QuickRoomError::Storage(_))));
}
