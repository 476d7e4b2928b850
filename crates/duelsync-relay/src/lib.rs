//! Realtime relay for duelsync.
//!
//! One actor per room, each a Tokio task fed through an mpsc channel.
//! The actor owns the room's connection set and a cached copy of the
//! last state it saw, so nothing inside a room needs a lock:
//!
//! ```text
//! connection handler ──RelayHandle──▶ [room actor] ──UnboundedSender──▶ each connection
//! ```
//!
//! Nothing here is durable. A restart loses every cache and presence
//! set; clients recover by fetching from the coordinator.
//!
//! # Key types
//!
//! - [`RelayHub`] finds or spawns the actor for a room code
//! - [`RelayHandle`] sends commands to one running actor
//! - [`StateCache`] first-writer-wins seeding and version-guarded updates

mod actor;
mod cache;
mod config;
mod error;
mod hub;

pub use actor::{RelayHandle, RelayInfo, RelaySender};
pub use cache::{Applied, StateCache};
pub use config::RelayConfig;
pub use error::RelayError;
pub use hub::RelayHub;
