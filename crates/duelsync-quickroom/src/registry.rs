//! The quick-room registry.

use duelsync_store::KeyValueStore;
use rand::Rng;

use crate::{
    Clock, CreateQuickRoom, QuickRoom, QuickRoomConfig, QuickRoomError,
    QuickRoomMode, QuickRoomStatus,
};

/// How often a patch re-reads after losing a compare-and-set.
const PATCH_ATTEMPTS: usize = 4;

/// How many fresh ids `create` tries before giving up.
const ID_ATTEMPTS: usize = 8;

/// Create, read, update and delete quick rooms with lazy expiry.
pub struct QuickRoomRegistry<K> {
    kv: K,
    config: QuickRoomConfig,
    clock: Clock,
}

impl<K: KeyValueStore<QuickRoom>> QuickRoomRegistry<K> {
    pub fn new(kv: K, config: QuickRoomConfig) -> Self {
        Self::with_clock(kv, config, Clock::new())
    }

    pub fn with_clock(kv: K, config: QuickRoomConfig, clock: Clock) -> Self {
        Self { kv, config, clock }
    }

    pub fn config(&self) -> &QuickRoomConfig {
        &self.config
    }

    /// Validates and stores a new room in `waiting`.
    ///
    /// # Errors
    /// [`QuickRoomError::Validation`] if the deck is not exactly
    /// `deck_size` cards, contains a blank card id, or a difficulty is
    /// given for a PvP room.
    pub async fn create(
        &self,
        request: CreateQuickRoom,
    ) -> Result<QuickRoom, QuickRoomError> {
        if request.deck.len() != self.config.deck_size {
            return Err(QuickRoomError::Validation(format!(
                "deck must hold exactly {} cards, got {}",
                self.config.deck_size,
                request.deck.len()
            )));
        }
        if request.deck.iter().any(|card| card.trim().is_empty()) {
            return Err(QuickRoomError::Validation("deck contains a blank card id".into()));
        }
        if request.mode == QuickRoomMode::Pvp && request.difficulty.is_some() {
            return Err(QuickRoomError::Validation(
                "difficulty only applies to bot rooms".into(),
            ));
        }

        for _ in 0..ID_ATTEMPTS {
            let id = generate_id(request.mode.prefix());
            let room = QuickRoom::new(id, request.clone(), self.clock.now());
            if self
                .kv
                .set_if_absent(&key(&room.id), room.clone(), Some(self.config.absolute_ttl))
                .await?
            {
                tracing::info!(id = %room.id, mode = room.mode.prefix(), "quick room created");
                return Ok(room);
            }
            tracing::debug!(id = %room.id, "quick room id taken, retrying");
        }
        Err(QuickRoomError::Storage(format!(
            "no free quick room id after {ID_ATTEMPTS} attempts"
        )))
    }

    /// Returns the live room. Expired rooms are purged and reported as
    /// not found.
    pub async fn get(&self, id: &str) -> Result<QuickRoom, QuickRoomError> {
        let key = key(id);
        let room = self
            .kv
            .get(&key)
            .await?
            .ok_or_else(|| QuickRoomError::NotFound(id.to_owned()))?;

        if room.is_expired(self.clock.now(), &self.config) {
            self.kv.delete(&key).await?;
            tracing::info!(%id, status = %room.status, "quick room purged");
            return Err(QuickRoomError::NotFound(id.to_owned()));
        }
        Ok(room)
    }

    /// Sets the status and marks the room as just used.
    pub async fn patch(
        &self,
        id: &str,
        status: QuickRoomStatus,
    ) -> Result<QuickRoom, QuickRoomError> {
        let key = key(id);
        for _ in 0..PATCH_ATTEMPTS {
            let current = self.get(id).await?;
            let now = self.clock.now();
            let mut updated = current.clone();
            updated.status = status;
            updated.last_activity_at = now;

            let ttl = current.remaining(now, &self.config);
            if self
                .kv
                .compare_and_set(&key, &current, updated.clone(), Some(ttl))
                .await?
            {
                tracing::debug!(%id, %status, "quick room patched");
                return Ok(updated);
            }
        }
        Err(QuickRoomError::Storage(format!(
            "quick room {id} kept changing, retry"
        )))
    }

    /// Removes the room.
    pub async fn delete(&self, id: &str) -> Result<(), QuickRoomError> {
        if self.kv.delete(&key(id)).await? {
            tracing::info!(%id, "quick room deleted");
            Ok(())
        } else {
            Err(QuickRoomError::NotFound(id.to_owned()))
        }
    }

    /// Drops rooms past the absolute TTL from the backing store. Idle
    /// rooms are still caught on their next access.
    pub async fn sweep(&self) -> Result<usize, QuickRoomError> {
        let removed = self.kv.sweep().await?;
        if removed > 0 {
            tracing::info!(removed, "quick rooms swept");
        }
        Ok(removed)
    }
}

fn key(id: &str) -> String {
    format!("quickroom:{id}")
}

/// `<prefix>_<16 hex chars>`, 64 bits of randomness.
fn generate_id(prefix: &str) -> String {
    let bytes: [u8; 8] = rand::rng().random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{prefix}_{hex}")
}
