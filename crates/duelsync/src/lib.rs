//! # duelsync
//!
//! Real-time match synchronization and matchmaking for two-player card
//! games.
//!
//! The server is split into two planes:
//!
//! - **Authoritative**: the HTTP API over the Match Coordinator. Every
//!   accepted state transition bumps the match version by exactly one;
//!   writers carrying a stale version are rejected, never merged.
//! - **Advisory**: the realtime relay. One actor per room fans state hints
//!   and action cues out to connected clients. Nothing it says is truth.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duelsync::{DuelsyncServer, ServerConfig};
//!
//! # async fn run() -> Result<(), duelsync::DuelsyncError> {
//! duelsync::telemetry::init();
//! let server = DuelsyncServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod api;
mod config;
mod error;
mod handler;
mod server;
mod services;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::DuelsyncError;
pub use server::{DuelsyncServer, ServerBuilder};
pub use services::{Backend, InMemoryBackend, Services};

/// Convenience re-exports of the sub-crates.
pub mod prelude {
    pub use duelsync_match::{
        CreateMatch, InMemoryDecks, LobbyStatus, MatchCoordinator, MatchError,
        MatchPatch, MatchmakingStatus,
    };
    pub use duelsync_protocol::{
        DeckId, GameState, MatchSnapshot, MatchStatus, PlayerId, RelayMessage,
        RoomCode, StateUpdate,
    };
    pub use duelsync_quickroom::{
        CreateQuickRoom, QuickRoom, QuickRoomMode, QuickRoomStatus,
    };
    pub use duelsync_store::MatchRecord;

    pub use crate::{DuelsyncError, DuelsyncServer, ServerConfig};
}
