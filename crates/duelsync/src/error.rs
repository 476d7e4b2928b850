//! Unified error type for the duelsync server.

use duelsync_match::MatchError;
use duelsync_protocol::ProtocolError;
use duelsync_quickroom::QuickRoomError;
use duelsync_relay::RelayError;
use duelsync_store::StoreError;
use duelsync_transport::TransportError;

/// Top-level error wrapping every crate-specific error.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum DuelsyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    QuickRoom(#[from] QuickRoomError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    /// A malformed setting, typically from the environment.
    #[error("configuration error: {0}")]
    Config(String),

    /// Binding or serving the HTTP listener failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
