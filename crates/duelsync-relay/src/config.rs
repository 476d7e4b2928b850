//! Relay configuration.

use std::time::Duration;

/// Settings shared by every room actor a [`RelayHub`](crate::RelayHub)
/// spawns.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Capacity of each actor's command channel. Senders wait when it is
    /// full.
    pub channel_size: usize,

    /// How long an actor with no connections lingers before stopping.
    pub idle_grace: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel_size: 64,
            idle_grace: Duration::from_secs(60),
        }
    }
}
