//! Lobby rendezvous: two players meet on a room code before any durable
//! match exists.
//!
//! Entries live in a [`KeyValueStore`] with a TTL. Seats are filled with
//! single-key compare-and-set, and promotion to a durable match relies
//! on the match store's unique room code, so two racing joiners cannot
//! both become participant B and a promotion retried after a crash
//! cannot create a second match.

use std::sync::Arc;

use duelsync_protocol::{DeckId, PlayerId, RoomCode};
use duelsync_store::{KeyValueStore, MatchRecord, MatchStore};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::coordinator::{CreateMatch, MatchCoordinator};
use crate::decks::{ensure_deck_owner, DeckDirectory};
use crate::state::initial_state;
use crate::{LobbyConfig, MatchError};

/// A player and the deck they bring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub player_id: PlayerId,
    pub deck_id: DeckId,
}

/// A pending rendezvous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyEntry {
    pub room: RoomCode,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub slot_a: Seat,
    pub slot_b: Option<Seat>,
}

impl LobbyEntry {
    fn holds(&self, player: PlayerId) -> bool {
        self.slot_a.player_id == player
            || self.slot_b.is_some_and(|seat| seat.player_id == player)
    }
}

/// Where a rendezvous stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LobbyStatus {
    /// The durable match exists.
    Ready {
        #[serde(rename = "match")]
        record: Box<MatchRecord>,
    },
    /// Waiting for the second player.
    Waiting { lobby: LobbyEntry },
    NotFound,
}

/// Key-value backed rendezvous that promotes into the coordinator.
pub struct Lobby<K, S, D> {
    kv: K,
    coordinator: Arc<MatchCoordinator<S>>,
    decks: Arc<D>,
    config: LobbyConfig,
}

impl<K, S, D> Lobby<K, S, D>
where
    K: KeyValueStore<LobbyEntry>,
    S: MatchStore,
    D: DeckDirectory,
{
    pub fn new(
        kv: K,
        coordinator: Arc<MatchCoordinator<S>>,
        decks: Arc<D>,
        config: LobbyConfig,
    ) -> Self {
        Self {
            kv,
            coordinator,
            decks,
            config,
        }
    }

    /// Takes a seat in the lobby for `room`, creating it if needed.
    ///
    /// The first caller opens the lobby in slot A. Slot A calling again
    /// refreshes its deck and expiry. A different player fills slot B,
    /// which promotes the lobby into a durable match and removes it.
    ///
    /// # Errors
    /// - [`MatchError::Forbidden`] if `player` does not own `deck`
    /// - [`MatchError::Conflict`] if both seats belong to others
    pub async fn join_or_create(
        &self,
        room: &RoomCode,
        player: PlayerId,
        deck: DeckId,
    ) -> Result<LobbyStatus, MatchError> {
        ensure_deck_owner(&*self.decks, player, deck).await?;
        let key = lobby_key(room);
        let seat = Seat {
            player_id: player,
            deck_id: deck,
        };

        for _ in 0..=self.config.contention_retries {
            if let Some(record) = self.coordinator.find(room).await? {
                return if record.is_participant(player) {
                    Ok(LobbyStatus::Ready {
                        record: Box::new(record),
                    })
                } else {
                    Err(room_full(room))
                };
            }

            let Some(entry) = self.kv.get(&key).await? else {
                let entry = self.open(room, seat);
                if self
                    .kv
                    .set_if_absent(&key, entry.clone(), Some(self.config.ttl))
                    .await?
                {
                    tracing::info!(%room, player_id = %player, "lobby opened");
                    return Ok(LobbyStatus::Waiting { lobby: entry });
                }
                continue;
            };

            if entry.slot_b.is_some() && entry.holds(player) {
                return self.promote(&key, entry).await;
            }

            if entry.slot_a.player_id == player {
                let mut refreshed = entry.clone();
                refreshed.slot_a = seat;
                refreshed.expires_at = self.expiry();
                if self.swap(&key, &entry, refreshed.clone()).await? {
                    tracing::debug!(%room, player_id = %player, "lobby refreshed");
                    return Ok(LobbyStatus::Waiting { lobby: refreshed });
                }
                continue;
            }

            if entry.slot_b.is_some() {
                return Err(room_full(room));
            }

            let mut filled = entry.clone();
            filled.slot_b = Some(seat);
            if self.swap(&key, &entry, filled.clone()).await? {
                return self.promote(&key, filled).await;
            }
            tracing::debug!(%room, player_id = %player, "lost the race for slot B");
        }

        Err(MatchError::Conflict(format!("lobby {room} is busy, retry")))
    }

    /// Ready if a match exists, waiting if only the lobby does.
    pub async fn status(&self, room: &RoomCode) -> Result<LobbyStatus, MatchError> {
        if let Some(record) = self.coordinator.find(room).await? {
            return Ok(LobbyStatus::Ready {
                record: Box::new(record),
            });
        }
        Ok(match self.kv.get(&lobby_key(room)).await? {
            Some(lobby) => LobbyStatus::Waiting { lobby },
            None => LobbyStatus::NotFound,
        })
    }

    /// Removes expired lobbies from the backing store.
    pub async fn sweep(&self) -> Result<usize, MatchError> {
        Ok(self.kv.sweep().await?)
    }

    async fn promote(
        &self,
        key: &str,
        entry: LobbyEntry,
    ) -> Result<LobbyStatus, MatchError> {
        let Some(b) = entry.slot_b else {
            return Err(MatchError::Conflict(format!(
                "lobby {} has no second player",
                entry.room
            )));
        };
        let a = entry.slot_a;

        let request = CreateMatch {
            room: Some(entry.room.clone()),
            participant_a: a.player_id,
            participant_b: Some(b.player_id),
            deck_a: Some(a.deck_id),
            deck_b: Some(b.deck_id),
            state: Some(initial_state(
                (a.player_id, Some(a.deck_id)),
                (b.player_id, Some(b.deck_id)),
            )),
        };

        let record = match self.coordinator.create(request).await {
            Ok(record) => {
                tracing::info!(room = %entry.room, version = record.version, "lobby promoted");
                record
            }
            // Someone else finished the promotion first.
            Err(MatchError::Conflict(_)) => {
                self.coordinator.record(&entry.room).await?
            }
            Err(e) => return Err(e),
        };

        self.kv.delete(key).await?;
        Ok(LobbyStatus::Ready {
            record: Box::new(record),
        })
    }

    async fn swap(
        &self,
        key: &str,
        expected: &LobbyEntry,
        value: LobbyEntry,
    ) -> Result<bool, MatchError> {
        Ok(self
            .kv
            .compare_and_set(key, expected, value, Some(self.config.ttl))
            .await?)
    }

    fn open(&self, room: &RoomCode, seat: Seat) -> LobbyEntry {
        LobbyEntry {
            room: room.clone(),
            created_at: OffsetDateTime::now_utc(),
            expires_at: self.expiry(),
            slot_a: seat,
            slot_b: None,
        }
    }

    fn expiry(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc() + self.config.ttl
    }
}

fn lobby_key(room: &RoomCode) -> String {
    format!("lobby:{room}")
}

fn room_full(room: &RoomCode) -> MatchError {
    MatchError::Conflict(format!("room {room} is full"))
}
