//! Storage seams for duelsync.
//!
//! Two kinds of state, two traits:
//!
//! - [`KeyValueStore`]: short-lived, TTL-bounded entries (lobbies, quick
//!   rooms). No durability promise; losing it only costs callers a retry.
//! - [`MatchStore`]: the durable match record, mutated only through a
//!   single atomic version-guarded update.
//!
//! Both ship with in-memory implementations ([`MemoryKv`],
//! [`MemoryMatchStore`]); an external backend implements the same trait
//! so multiple service instances share one view of state.

#![allow(async_fn_in_trait)]

mod error;
mod kv;
mod matches;
mod record;

pub use error::StoreError;
pub use kv::{KeyValueStore, MemoryKv};
pub use matches::{MatchStore, MemoryMatchStore};
pub use record::{MatchRecord, NewMatch};
