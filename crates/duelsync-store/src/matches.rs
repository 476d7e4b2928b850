//! Durable match storage with a version-guarded update.
//!
//! The only way to change a stored record is
//! [`update_if_version`](MatchStore::update_if_version), the equivalent
//! of
//!
//! ```sql
//! UPDATE matches SET ..., version = version + 1
//!  WHERE room = $1 AND version = $2
//! ```
//!
//! executed as one atomic step. There is no read-then-write pair for a
//! racing writer to slip between.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use duelsync_protocol::{MatchStatus, RoomCode};
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{MatchRecord, NewMatch, StoreError};

/// Persistence seam for [`MatchRecord`]s.
pub trait MatchStore: Send + Sync + 'static {
    /// Inserts a new record at version 0.
    ///
    /// Fails with [`StoreError::Duplicate`] if the room code is taken.
    fn insert(
        &self,
        new: NewMatch,
    ) -> impl Future<Output = Result<MatchRecord, StoreError>> + Send;

    /// Looks a record up by room code.
    fn find_by_code(
        &self,
        room: &RoomCode,
    ) -> impl Future<Output = Result<Option<MatchRecord>, StoreError>> + Send;

    /// Applies `apply` and bumps the version, only if the stored version
    /// equals `expected_version`. Returns the updated record.
    ///
    /// `apply` may not change the id, room code or version; any such
    /// change is discarded.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`]: no record for `room`
    /// - [`StoreError::VersionMismatch`]: carries the current record
    fn update_if_version<F>(
        &self,
        room: &RoomCode,
        expected_version: u64,
        apply: F,
    ) -> impl Future<Output = Result<MatchRecord, StoreError>> + Send
    where
        F: FnOnce(&mut MatchRecord) + Send;
}

#[derive(Debug, Default)]
struct Table {
    next_id: u64,
    by_code: HashMap<RoomCode, MatchRecord>,
}

/// In-process [`MatchStore`]. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryMatchStore {
    table: Arc<Mutex<Table>>,
}

impl MemoryMatchStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records, terminal ones included.
    pub async fn len(&self) -> usize {
        self.table.lock().await.by_code.len()
    }

    /// Returns `true` if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl MatchStore for MemoryMatchStore {
    async fn insert(&self, new: NewMatch) -> Result<MatchRecord, StoreError> {
        let mut table = self.table.lock().await;
        if table.by_code.contains_key(&new.room) {
            return Err(StoreError::Duplicate(new.room.to_string()));
        }

        table.next_id += 1;
        let now = OffsetDateTime::now_utc();
        let record = MatchRecord {
            id: table.next_id,
            room: new.room.clone(),
            participant_a: new.participant_a,
            participant_b: new.participant_b,
            deck_a: new.deck_a,
            deck_b: new.deck_b,
            status: new.status,
            version: 0,
            state: new.state,
            created_at: now,
            started_at: (new.status == MatchStatus::Active).then_some(now),
            finished_at: None,
            snapshot: None,
        };
        table.by_code.insert(new.room, record.clone());
        Ok(record)
    }

    async fn find_by_code(
        &self,
        room: &RoomCode,
    ) -> Result<Option<MatchRecord>, StoreError> {
        Ok(self.table.lock().await.by_code.get(room).cloned())
    }

    async fn update_if_version<F>(
        &self,
        room: &RoomCode,
        expected_version: u64,
        apply: F,
    ) -> Result<MatchRecord, StoreError>
    where
        F: FnOnce(&mut MatchRecord) + Send,
    {
        let mut table = self.table.lock().await;
        let stored = table
            .by_code
            .get_mut(room)
            .ok_or_else(|| StoreError::NotFound(room.to_string()))?;

        if stored.version != expected_version {
            return Err(StoreError::VersionMismatch {
                expected: expected_version,
                current: Box::new(stored.clone()),
            });
        }

        let mut updated = stored.clone();
        apply(&mut updated);
        updated.id = stored.id;
        updated.room = stored.room.clone();
        updated.version = expected_version + 1;
        *stored = updated.clone();
        Ok(updated)
    }
}
