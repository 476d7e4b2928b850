//! Shared vocabulary for duelsync.
//!
//! - **Identifiers** ([`PlayerId`], [`DeckId`], [`RoomCode`])
//! - **Match shapes** ([`MatchStatus`], [`MatchSnapshot`], [`GameState`])
//!   returned by the Coordinator and the HTTP API
//! - **Relay envelope** ([`RelayMessage`]) spoken on room sockets
//! - **Codec** ([`Codec`], [`JsonCodec`]) turning envelopes into frames
//!
//! ```text
//! Transport (frames) → Protocol (RelayMessage) → Relay (room actor)
//! ```

mod codec;
mod error;
mod relay;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use relay::{Presence, RelayMessage, StateUpdate};
pub use types::{
    DeckId, GameState, MatchSnapshot, MatchStatus, PlayerId, RoomCode,
};
