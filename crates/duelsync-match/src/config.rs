//! Tunables for the coordinator and the lobby.

use std::time::Duration;

/// Configuration for [`MatchCoordinator`](crate::MatchCoordinator).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// How many generated room codes to try before giving up.
    pub code_attempts: usize,

    /// How many times Join and Cancel re-read and retry after losing a
    /// version race. Patch never retries; its caller rebases.
    pub contention_retries: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            code_attempts: 5,
            contention_retries: 8,
        }
    }
}

/// Configuration for [`Lobby`](crate::Lobby).
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// How long an unpromoted lobby survives.
    pub ttl: Duration,

    /// How many times a join re-reads the entry after a lost
    /// compare-and-set before answering Conflict.
    pub contention_retries: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
            contention_retries: 8,
        }
    }
}
