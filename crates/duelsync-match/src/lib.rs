//! Match coordination for duelsync.
//!
//! - [`MatchCoordinator`]: create, join, get, patch and cancel with
//!   optimistic concurrency over a [`MatchStore`](duelsync_store::MatchStore).
//! - [`Lobby`]: key-value rendezvous that promotes into a durable match
//!   once both players are present.
//! - [`Matchmaker`]: deck-checked create/join straight against the
//!   durable store.
//!
//! Deck ownership is answered by a [`DeckDirectory`].

#![allow(async_fn_in_trait)]

mod code;
mod config;
mod coordinator;
mod decks;
mod error;
mod lobby;
mod matchmaker;
mod state;

pub use code::{generate_room_code, ROOM_CODE_LEN};
pub use config::{CoordinatorConfig, LobbyConfig};
pub use coordinator::{CreateMatch, MatchCoordinator, MatchPatch};
pub use decks::{ensure_deck_owner, DeckDirectory, InMemoryDecks};
pub use error::MatchError;
pub use lobby::{Lobby, LobbyEntry, LobbyStatus, Seat};
pub use matchmaker::{Matchmaker, MatchmakingStatus};
pub use state::{initial_state, merge_fields, seat_players};
