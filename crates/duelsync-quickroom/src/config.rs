//! Quick-room tunables.

use std::time::Duration;

/// Configuration for [`QuickRoomRegistry`](crate::QuickRoomRegistry).
#[derive(Debug, Clone)]
pub struct QuickRoomConfig {
    /// Hard upper bound on a room's lifetime, whatever its status.
    ///
    /// Default: 2 hours.
    pub absolute_ttl: Duration,

    /// How long a room that is not `active` may go untouched.
    ///
    /// Default: 15 minutes.
    pub idle_ttl: Duration,

    /// Exact number of cards a deck must hold.
    ///
    /// Default: 20.
    pub deck_size: usize,
}

impl Default for QuickRoomConfig {
    fn default() -> Self {
        Self {
            absolute_ttl: Duration::from_secs(2 * 60 * 60),
            idle_ttl: Duration::from_secs(15 * 60),
            deck_size: 20,
        }
    }
}
