use std::net::SocketAddr;

use crate::ConnectionId;

/// Errors raised while listening on or talking over a socket.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The listener itself failed. Usually fatal for the accept loop.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// One client failed to complete the WebSocket upgrade. Other
    /// clients are unaffected.
    #[error("upgrade from {peer} failed: {reason}")]
    Upgrade { peer: SocketAddr, reason: String },

    /// Outbound frames are text; this one was not UTF-8.
    #[error("{0}: outbound frame is not valid UTF-8")]
    NotUtf8(ConnectionId),

    #[error("{0} is closed")]
    Closed(ConnectionId),

    #[error("{conn}: {source}")]
    Socket {
        conn: ConnectionId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl TransportError {
    /// Returns `true` if only a single client was affected and the
    /// listener can keep accepting.
    pub fn is_per_client(&self) -> bool {
        !matches!(self, Self::Bind { .. } | Self::Accept(_))
    }
}
