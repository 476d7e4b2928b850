//! The match coordinator: version-guarded transitions over a
//! [`MatchStore`].
//!
//! The coordinator holds no locks and no cached records. Every mutation
//! goes through [`MatchStore::update_if_version`], so any number of
//! coordinators can share one store. Reads done before an update are
//! only used to choose *what* to write; the version guard decides
//! *whether* it is written.

use std::fmt;
use std::sync::Arc;

use duelsync_protocol::{
    DeckId, GameState, MatchSnapshot, MatchStatus, PlayerId, ProtocolError,
    RoomCode,
};
use duelsync_store::{MatchRecord, MatchStore, NewMatch, StoreError};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::code::generate_room_code;
use crate::state::{merge_fields, seat_players};
use crate::{CoordinatorConfig, MatchError};

type CodeSource =
    Arc<dyn Fn() -> Result<RoomCode, ProtocolError> + Send + Sync>;

/// Input to [`MatchCoordinator::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMatch {
    /// Requested room code. Generated when absent.
    #[serde(default, alias = "room_id")]
    pub room: Option<RoomCode>,
    pub participant_a: PlayerId,
    #[serde(default)]
    pub participant_b: Option<PlayerId>,
    #[serde(default)]
    pub deck_a: Option<DeckId>,
    #[serde(default)]
    pub deck_b: Option<DeckId>,
    /// Initial state. When both seats are filled the players are seated
    /// into it (or into an empty state) with A moving first.
    #[serde(default)]
    pub state: Option<GameState>,
}

/// Input to [`MatchCoordinator::patch`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchPatch {
    /// Top-level fields to replace.
    #[serde(default)]
    pub state: GameState,
    /// New status, typically `finished`.
    #[serde(default)]
    pub status: Option<MatchStatus>,
}

/// Create, join, read, patch and cancel matches.
pub struct MatchCoordinator<S> {
    store: S,
    config: CoordinatorConfig,
    codes: CodeSource,
}

impl<S> fmt::Debug for MatchCoordinator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchCoordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: MatchStore> MatchCoordinator<S> {
    pub fn new(store: S, config: CoordinatorConfig) -> Self {
        Self {
            store,
            config,
            codes: Arc::new(generate_room_code),
        }
    }

    /// Replaces the room-code generator.
    pub fn with_code_generator<F>(mut self, codes: F) -> Self
    where
        F: Fn() -> Result<RoomCode, ProtocolError> + Send + Sync + 'static,
    {
        self.codes = Arc::new(codes);
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persists a new match at version 0.
    ///
    /// Status is `active` when both participants are given, `waiting`
    /// otherwise.
    ///
    /// # Errors
    /// - [`MatchError::Conflict`] on self-play, a taken room code, or
    ///   when every generated code collided.
    pub async fn create(
        &self,
        request: CreateMatch,
    ) -> Result<MatchRecord, MatchError> {
        if request.participant_b == Some(request.participant_a) {
            return Err(MatchError::Conflict(
                "a player cannot be both participants".into(),
            ));
        }

        let mut state = request.state.unwrap_or_default();
        let status = match request.participant_b {
            Some(b) => {
                seat_players(
                    &mut state,
                    (request.participant_a, request.deck_a),
                    (b, request.deck_b),
                );
                MatchStatus::Active
            }
            None => MatchStatus::Waiting,
        };

        let template = |room: RoomCode| NewMatch {
            room,
            participant_a: request.participant_a,
            participant_b: request.participant_b,
            deck_a: request.deck_a,
            deck_b: request.deck_b,
            status,
            state: state.clone(),
        };

        if let Some(room) = request.room {
            let record = self.store.insert(template(room)).await?;
            log_created(&record);
            return Ok(record);
        }

        for attempt in 1..=self.config.code_attempts {
            let room = (self.codes)()?;
            match self.store.insert(template(room)).await {
                Ok(record) => {
                    log_created(&record);
                    return Ok(record);
                }
                Err(StoreError::Duplicate(code)) => {
                    tracing::debug!(%code, attempt, "room code collision");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(
            attempts = self.config.code_attempts,
            "room code space exhausted"
        );
        Err(MatchError::Conflict(format!(
            "no free room code after {} attempts",
            self.config.code_attempts
        )))
    }

    /// Fills the second seat and starts the match.
    ///
    /// Repeating a successful join with the same player returns the
    /// stored record unchanged.
    ///
    /// # Errors
    /// - [`MatchError::NotFound`] if the room does not exist
    /// - [`MatchError::Conflict`] if the seat is taken by someone else,
    ///   the joiner is participant A, or the match is over
    pub async fn join(
        &self,
        room: &RoomCode,
        player: PlayerId,
        deck: Option<DeckId>,
    ) -> Result<MatchRecord, MatchError> {
        for _ in 0..=self.config.contention_retries {
            let record = self.require(room).await?;

            if record.status.is_terminal() {
                return Err(MatchError::Conflict(format!(
                    "match {room} is {}",
                    record.status
                )));
            }
            if record.participant_a == player {
                return Err(MatchError::Conflict(
                    "cannot join your own match".into(),
                ));
            }
            match record.participant_b {
                Some(b) if b == player => return Ok(record),
                Some(_) => {
                    return Err(MatchError::Conflict(format!(
                        "room {room} is full"
                    )));
                }
                None => {}
            }

            let result = self
                .store
                .update_if_version(room, record.version, move |r| {
                    let a = (r.participant_a, r.deck_a);
                    r.participant_b = Some(player);
                    r.deck_b = deck;
                    r.status = MatchStatus::Active;
                    r.started_at = Some(OffsetDateTime::now_utc());
                    seat_players(&mut r.state, a, (player, deck));
                })
                .await;

            match result {
                Ok(updated) => {
                    tracing::info!(
                        %room,
                        player_id = %player,
                        version = updated.version,
                        "match joined"
                    );
                    return Ok(updated);
                }
                Err(StoreError::VersionMismatch { .. }) => {
                    tracing::debug!(%room, player_id = %player, "join lost a race, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(contended(room))
    }

    /// The `{state, version, status}` view of a match.
    pub async fn get(&self, room: &RoomCode) -> Result<MatchSnapshot, MatchError> {
        Ok(self.require(room).await?.to_snapshot())
    }

    /// The full stored record.
    pub async fn record(&self, room: &RoomCode) -> Result<MatchRecord, MatchError> {
        self.require(room).await
    }

    /// Looks a match up without treating absence as an error.
    pub async fn find(
        &self,
        room: &RoomCode,
    ) -> Result<Option<MatchRecord>, MatchError> {
        Ok(self.store.find_by_code(room).await?)
    }

    /// Applies `patch` if the stored version is still `expected_version`.
    ///
    /// Never merges concurrent writers: a stale caller gets
    /// [`MatchError::VersionConflict`] carrying the current snapshot and
    /// must rebase. A terminal status stamps `finished_at` and keeps a
    /// snapshot of the resulting state.
    pub async fn patch(
        &self,
        room: &RoomCode,
        expected_version: u64,
        patch: MatchPatch,
    ) -> Result<MatchSnapshot, MatchError> {
        let current = self.require(room).await?;
        if current.version != expected_version {
            tracing::debug!(
                %room,
                expected = expected_version,
                version = current.version,
                "stale patch rejected"
            );
            return Err(MatchError::VersionConflict {
                expected: expected_version,
                current: Box::new(current.to_snapshot()),
            });
        }
        if current.status.is_terminal() {
            return Err(MatchError::Conflict(format!(
                "match {room} is {}",
                current.status
            )));
        }
        match (patch.status, current.status) {
            (Some(MatchStatus::Waiting), _) => {
                return Err(MatchError::Validation(
                    "a match cannot return to waiting".into(),
                ));
            }
            (Some(MatchStatus::Active), MatchStatus::Waiting) => {
                return Err(MatchError::Validation(
                    "a match becomes active by being joined".into(),
                ));
            }
            _ => {}
        }

        let MatchPatch { state, status } = patch;
        let updated = self
            .store
            .update_if_version(room, expected_version, move |r| {
                merge_fields(&mut r.state, state);
                if let Some(status) = status {
                    r.status = status;
                    if status.is_terminal() {
                        r.finished_at = Some(OffsetDateTime::now_utc());
                        r.snapshot = Some(r.state.clone());
                    }
                }
            })
            .await?;

        if updated.status.is_terminal() {
            tracing::info!(%room, status = %updated.status, version = updated.version, "match ended");
        } else {
            tracing::debug!(%room, version = updated.version, "match patched");
        }
        Ok(updated.to_snapshot())
    }

    /// Soft-cancels a match. Terminal matches are returned unchanged.
    pub async fn cancel(&self, room: &RoomCode) -> Result<MatchRecord, MatchError> {
        for _ in 0..=self.config.contention_retries {
            let record = self.require(room).await?;
            if record.status.is_terminal() {
                return Ok(record);
            }

            let result = self
                .store
                .update_if_version(room, record.version, |r| {
                    r.status = MatchStatus::Cancelled;
                    r.finished_at = Some(OffsetDateTime::now_utc());
                    r.snapshot = Some(r.state.clone());
                })
                .await;

            match result {
                Ok(updated) => {
                    tracing::info!(%room, version = updated.version, "match cancelled");
                    return Ok(updated);
                }
                Err(StoreError::VersionMismatch { .. }) => {
                    tracing::debug!(%room, "cancel lost a race, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(contended(room))
    }

    async fn require(&self, room: &RoomCode) -> Result<MatchRecord, MatchError> {
        self.store
            .find_by_code(room)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("match {room}")))
    }
}

fn log_created(record: &MatchRecord) {
    tracing::info!(
        room = %record.room,
        player_id = %record.participant_a,
        status = %record.status,
        "match created"
    );
}

fn contended(room: &RoomCode) -> MatchError {
    tracing::warn!(%room, "gave up after repeated version races");
    MatchError::Conflict(format!("match {room} is busy, retry"))
}
