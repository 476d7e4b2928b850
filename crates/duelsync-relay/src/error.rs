//! Error types for the relay.

use duelsync_protocol::RoomCode;
use duelsync_transport::ConnectionId;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The room actor has stopped or its channel is closed.
    #[error("relay for room {0} is unavailable")]
    Unavailable(RoomCode),

    /// The connection is already attached to this room.
    #[error("{0} is already attached to room {1}")]
    AlreadyConnected(ConnectionId, RoomCode),
}
