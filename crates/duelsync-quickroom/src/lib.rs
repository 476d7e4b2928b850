//! Quick rooms for duelsync.
//!
//! A quick room is an ad-hoc session (typically against a bot) that never
//! touches the durable match store. Rooms live in a
//! [`KeyValueStore`](duelsync_store::KeyValueStore) and are reclaimed
//! lazily:
//!
//! ```text
//!  age > absolute_ttl                        -> gone
//!  idle > idle_ttl  and  status != active    -> gone
//! ```
//!
//! The check runs on every access. [`QuickRoomRegistry::sweep`] clears
//! entries past the absolute TTL for memory hygiene; nothing depends on
//! it running.

#![allow(async_fn_in_trait)]

mod clock;
mod config;
mod error;
mod registry;
mod room;

pub use clock::Clock;
pub use config::QuickRoomConfig;
pub use error::QuickRoomError;
pub use registry::QuickRoomRegistry;
pub use room::{CreateQuickRoom, Difficulty, QuickRoom, QuickRoomMode, QuickRoomStatus};
