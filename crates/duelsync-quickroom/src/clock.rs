//! Wall-clock timestamps that follow Tokio's clock.

use time::OffsetDateTime;
use tokio::time::Instant;

/// Reads UTC time as a fixed wall-clock anchor plus Tokio-measured
/// elapsed time.
///
/// Timestamps stay serializable, so rooms round-trip through an external
/// store, while paused-time tests can still move them with
/// `tokio::time::advance`.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    wall: OffsetDateTime,
    mono: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self::starting_at(OffsetDateTime::now_utc())
    }

    /// A clock whose current reading is `wall`.
    pub fn starting_at(wall: OffsetDateTime) -> Self {
        Self {
            wall,
            mono: Instant::now(),
        }
    }

    pub fn now(&self) -> OffsetDateTime {
        self.wall + self.mono.elapsed()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
