//! The room-local state cache.

use duelsync_protocol::{GameState, RelayMessage, StateUpdate};

/// Outcome of [`StateCache::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The cache now holds the update.
    Replaced,
    /// The update carried a version no newer than the cached one.
    Stale { cached: u64 },
}

/// Last state a room's relay has seen.
///
/// Seeding is first-writer-wins: [`try_seed`](Self::try_seed) swaps a
/// seeded flag and only the caller that flipped it writes. Updates,
/// including confirmed snapshots offered on connect, are accepted unless
/// both they and the cache carry a version and theirs is not newer.
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    state: Option<GameState>,
    version: Option<u64>,
    seeded: bool,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the cache if nothing has yet. Returns whether it did.
    pub fn try_seed(&mut self, update: StateUpdate) -> bool {
        if std::mem::replace(&mut self.seeded, true) {
            return false;
        }
        self.state = Some(update.state);
        self.version = update.version;
        true
    }

    /// Replaces the cached state unless `update` is stale.
    ///
    /// An unversioned update always replaces the state and leaves the
    /// cached version as it was.
    pub fn apply(&mut self, update: StateUpdate) -> Applied {
        if let (Some(incoming), Some(cached)) = (update.version, self.version) {
            if incoming <= cached {
                return Applied::Stale { cached };
            }
        }
        self.state = Some(update.state);
        if update.version.is_some() {
            self.version = update.version;
        }
        self.seeded = true;
        Applied::Replaced
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// The cached state as a `SYNC_STATE` frame, if there is one.
    pub fn sync_message(&self) -> Option<RelayMessage> {
        self.state.as_ref().map(|state| {
            RelayMessage::SyncState(StateUpdate {
                state: state.clone(),
                version: self.version,
            })
        })
    }
}
