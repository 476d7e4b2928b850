//! Quick-room types and the two-tier expiry rule.

use std::fmt;
use std::time::Duration;

use duelsync_protocol::PlayerId;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::QuickRoomConfig;

/// Who the room is played against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickRoomMode {
    Bot,
    Pvp,
}

impl QuickRoomMode {
    /// Prefix of every id generated for this mode.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::Pvp => "pvp",
        }
    }
}

/// Bot strength. Only meaningful in [`QuickRoomMode::Bot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickRoomStatus {
    #[default]
    Waiting,
    Active,
    Finished,
}

impl fmt::Display for QuickRoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Finished => "finished",
        })
    }
}

/// Input to [`QuickRoomRegistry::create`](crate::QuickRoomRegistry::create).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuickRoom {
    pub mode: QuickRoomMode,
    /// Card ids. Must hold exactly the configured deck size.
    pub deck: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
}

/// An ephemeral session descriptor.
///
/// Both timestamps are stored with the room, so any store holding it can
/// decide expiry without the process that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickRoom {
    pub id: String,
    pub mode: QuickRoomMode,
    pub deck: Vec<String>,
    pub difficulty: Option<Difficulty>,
    pub player_id: Option<PlayerId>,
    pub participants: usize,
    pub status: QuickRoomStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_activity_at: OffsetDateTime,
    /// Where the client should go to play.
    pub redirect: String,
}

impl QuickRoom {
    pub(crate) fn new(id: String, request: CreateQuickRoom, now: OffsetDateTime) -> Self {
        let difficulty = match request.mode {
            QuickRoomMode::Bot => Some(request.difficulty.unwrap_or_default()),
            QuickRoomMode::Pvp => None,
        };
        Self {
            redirect: format!("/play/{id}"),
            id,
            mode: request.mode,
            deck: request.deck,
            difficulty,
            player_id: request.player_id,
            participants: 1,
            status: QuickRoomStatus::Waiting,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Returns `true` once the room should be treated as gone.
    ///
    /// Past the absolute TTL every room expires. Past the idle TTL only
    /// rooms that are not `active` do.
    pub fn is_expired(&self, now: OffsetDateTime, config: &QuickRoomConfig) -> bool {
        if now - self.created_at > config.absolute_ttl {
            return true;
        }
        now - self.last_activity_at > config.idle_ttl && self.status != QuickRoomStatus::Active
    }

    /// Lifetime left under the absolute TTL.
    pub(crate) fn remaining(&self, now: OffsetDateTime, config: &QuickRoomConfig) -> Duration {
        let age = Duration::try_from(now - self.created_at).unwrap_or_default();
        config.absolute_ttl.saturating_sub(age)
    }
}
