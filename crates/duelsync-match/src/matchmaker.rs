//! Durable matchmaking: the creator's record is written straight to the
//! match store in `waiting`, and the joiner activates it.

use std::sync::Arc;

use duelsync_protocol::{DeckId, PlayerId, RoomCode};
use duelsync_store::{MatchRecord, MatchStore};
use serde::Serialize;

use crate::coordinator::{CreateMatch, MatchCoordinator};
use crate::decks::{ensure_deck_owner, DeckDirectory};
use crate::MatchError;

/// Where a matchmaking room stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchmakingStatus {
    /// Both seats are filled (or the match is already over).
    Ready {
        #[serde(rename = "match")]
        record: Box<MatchRecord>,
    },
    Waiting {
        #[serde(rename = "match")]
        record: Box<MatchRecord>,
    },
    NotFound,
}

/// Deck-checked front end to [`MatchCoordinator`] create and join.
pub struct Matchmaker<S, D> {
    coordinator: Arc<MatchCoordinator<S>>,
    decks: Arc<D>,
}

impl<S: MatchStore, D: DeckDirectory> Matchmaker<S, D> {
    pub fn new(coordinator: Arc<MatchCoordinator<S>>, decks: Arc<D>) -> Self {
        Self { coordinator, decks }
    }

    /// Opens a waiting match for `player`. Returns the stored record,
    /// whose `room` is the code to share.
    pub async fn create(
        &self,
        player: PlayerId,
        deck: DeckId,
        room: Option<RoomCode>,
    ) -> Result<MatchRecord, MatchError> {
        ensure_deck_owner(&*self.decks, player, deck).await?;
        self.coordinator
            .create(CreateMatch {
                room,
                participant_a: player,
                participant_b: None,
                deck_a: Some(deck),
                deck_b: None,
                state: None,
            })
            .await
    }

    /// Takes the second seat and activates the match.
    pub async fn join(
        &self,
        room: &RoomCode,
        player: PlayerId,
        deck: DeckId,
    ) -> Result<MatchRecord, MatchError> {
        ensure_deck_owner(&*self.decks, player, deck).await?;
        self.coordinator.join(room, player, Some(deck)).await
    }

    /// A finished or cancelled room reports `Ready` so pollers stop,
    /// even with the second seat empty.
    pub async fn status(
        &self,
        room: &RoomCode,
    ) -> Result<MatchmakingStatus, MatchError> {
        Ok(match self.coordinator.find(room).await? {
            None => MatchmakingStatus::NotFound,
            Some(record) if record.participant_b.is_none() && !record.status.is_terminal() => {
                MatchmakingStatus::Waiting {
                    record: Box::new(record),
                }
            }
            Some(record) => MatchmakingStatus::Ready {
                record: Box::new(record),
            },
        })
    }
}
