//! Identity types and the shapes shared by the HTTP API and the relay.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player, as known to the external player service.
///
/// Serializes as a plain number so clients can send `"player_id": 42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A deck owned by a player in the external collection service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeckId(pub u64);

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D-{}", self.0)
    }
}

/// Human-shareable identifier for a lobby or match, e.g. `ABC123`.
///
/// Always uppercase ASCII alphanumerics, 4 to 12 characters. Parsing
/// normalises case so `abc123` and `ABC123` name the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Shortest accepted code.
    pub const MIN_LEN: usize = 4;
    /// Longest accepted code.
    pub const MAX_LEN: usize = 12;

    /// Validates and normalises a room code.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let trimmed = raw.trim();
        let len = trimmed.chars().count();
        if !(Self::MIN_LEN..=Self::MAX_LEN).contains(&len)
            || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ProtocolError::InvalidRoomCode(raw.to_owned()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Match shapes
// ---------------------------------------------------------------------------

/// Opaque game state: turn, current player, phase, per-player data.
///
/// The subsystem never interprets it beyond merging top-level fields.
pub type GameState = serde_json::Map<String, serde_json::Value>;

/// Lifecycle status of a durable match.
///
/// ```text
/// Waiting ──join──→ Active ──patch──→ Finished
///    │                 │
///    └─────cancel──────┴──────────────→ Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Created by one player; the second seat is still empty.
    Waiting,
    /// Both seats filled; transitions are being applied.
    Active,
    /// Ended normally.
    Finished,
    /// Abandoned or withdrawn.
    Cancelled,
}

impl MatchStatus {
    /// Terminal records accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// The externally visible view of a match: `{state, version, status}`.
///
/// Returned by Get and Patch, and carried by version conflicts so the
/// caller can rebase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub room: RoomCode,
    pub state: GameState,
    pub version: u64,
    pub status: MatchStatus,
}
