//! The realtime relay envelope.
//!
//! Every frame on a room socket is `{ "type": ..., "payload": ... }`:
//!
//! ```text
//! client → relay   IDENTIFY, INIT_MATCH, BROADCAST_ACTION, UPDATE_MATCH_STATE
//! relay  → client  PRESENCE_UPDATE, SYNC_STATE, BROADCAST_ACTION,
//!                  UPDATE_MATCH_STATE, ERROR
//! ```
//!
//! Nothing on this channel is authoritative. State arriving here is a
//! hint; the Coordinator's version is the truth.

use serde::{Deserialize, Serialize};

use crate::{GameState, PlayerId};

/// A state blob travelling through the relay, optionally tagged with the
/// Coordinator version it was confirmed at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub state: GameState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

/// Advisory connection count for a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    /// Number of open connections.
    pub count: usize,
    /// Players that identified themselves, ascending, without duplicates.
    pub players: Vec<PlayerId>,
}

/// One frame on a room socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayMessage {
    /// Associates a player with the connection. Diagnostic only.
    Identify { player_id: PlayerId },

    /// Seeds the room cache if nothing seeded it yet.
    InitMatch(StateUpdate),

    /// Opaque low-latency cue forwarded to every other connection.
    BroadcastAction(serde_json::Value),

    /// Replaces the cached state and is echoed to every connection.
    UpdateMatchState(StateUpdate),

    /// Current presence, sent after every connect and disconnect.
    PresenceUpdate(Presence),

    /// Full cached state, sent only to a newly attached connection.
    SyncState(StateUpdate),

    /// Something about the last frame or the connection was rejected.
    Error { code: u16, message: String },
}

impl RelayMessage {
    /// Returns `true` for kinds a client may send.
    ///
    /// Server-originated kinds arriving from a client are dropped.
    pub fn is_client_message(&self) -> bool {
        matches!(
            self,
            Self::Identify { .. }
                | Self::InitMatch(_)
                | Self::BroadcastAction(_)
                | Self::UpdateMatchState(_)
        )
    }

    /// The wire name of this message kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Identify { .. } => "IDENTIFY",
            Self::InitMatch(_) => "INIT_MATCH",
            Self::BroadcastAction(_) => "BROADCAST_ACTION",
            Self::UpdateMatchState(_) => "UPDATE_MATCH_STATE",
            Self::PresenceUpdate(_) => "PRESENCE_UPDATE",
            Self::SyncState(_) => "SYNC_STATE",
            Self::Error { .. } => "ERROR",
        }
    }
}
