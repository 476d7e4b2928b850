//! Socket plumbing for the duelsync realtime relay.
//!
//! The relay handler gets clients from a [`Transport`] and talks to them
//! through [`Connection`]; neither names a socket type. A connection
//! remembers the path it was upgraded on, which is how a client names
//! its room (`/rooms/<code>`).
//!
//! The `websocket` feature (default) provides [`WebSocketTransport`]
//! over `tokio-tungstenite`.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{TransportConfig, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one open socket.
///
/// Presence is counted per connection, not per player: a player who
/// reconnects may briefly hold two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// A fresh id, unique within this process.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Produces upgraded client connections.
pub trait Transport: Send + 'static {
    type Connection: Connection;

    /// Waits for the next client and completes its upgrade.
    ///
    /// Errors for which [`TransportError::is_per_client`] holds concern
    /// only that client; keep accepting.
    async fn accept(&mut self) -> Result<Self::Connection, TransportError>;

    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// One upgraded client socket carrying text frames.
///
/// Sending and receiving are independent: one task may be parked in
/// [`recv`](Connection::recv) while another sends.
pub trait Connection: Send + Sync + 'static {
    /// Sends one text frame. `frame` must be UTF-8.
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// The next data frame, or `Ok(None)` once the peer has gone.
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Starts a clean close. Closing twice is not an error.
    async fn close(&self) -> Result<(), TransportError>;

    fn id(&self) -> ConnectionId;

    /// Request path of the upgrade, without the query string.
    fn path(&self) -> &str;

    fn peer_addr(&self) -> SocketAddr;
}
