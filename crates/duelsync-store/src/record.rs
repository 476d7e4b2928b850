//! The durable match record.

use duelsync_protocol::{
    DeckId, GameState, MatchSnapshot, MatchStatus, PlayerId, RoomCode,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A match as persisted by a [`MatchStore`](crate::MatchStore).
///
/// Records are never deleted; terminal ones stay for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Internal numeric id, assigned by the store.
    pub id: u64,
    /// External, unique room code.
    pub room: RoomCode,
    pub participant_a: PlayerId,
    pub participant_b: Option<PlayerId>,
    pub deck_a: Option<DeckId>,
    pub deck_b: Option<DeckId>,
    pub status: MatchStatus,
    /// Starts at 0 and grows by exactly one per accepted transition.
    pub version: u64,
    pub state: GameState,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
    /// Copy of the state at the moment the match became terminal.
    pub snapshot: Option<GameState>,
}

impl MatchRecord {
    /// The `{state, version, status}` view handed to callers.
    pub fn to_snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            room: self.room.clone(),
            state: self.state.clone(),
            version: self.version,
            status: self.status,
        }
    }

    /// Returns `true` if `player` holds either seat.
    pub fn is_participant(&self, player: PlayerId) -> bool {
        self.participant_a == player || self.participant_b == Some(player)
    }
}

/// Everything the caller decides when creating a record; the store
/// fills in id, version and timestamps.
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub room: RoomCode,
    pub participant_a: PlayerId,
    pub participant_b: Option<PlayerId>,
    pub deck_a: Option<DeckId>,
    pub deck_b: Option<DeckId>,
    pub status: MatchStatus,
    pub state: GameState,
}
