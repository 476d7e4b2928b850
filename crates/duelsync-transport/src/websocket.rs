//! WebSocket transport over `tokio-tungstenite`.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

use crate::{Connection, ConnectionId, Transport, TransportError};

type WsStream = WebSocketStream<TcpStream>;

/// Listener settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// How long a client may take to finish the upgrade. Upgrades run on
    /// the accept path, so this bounds how long one slow client can hold
    /// up the next.
    pub handshake_timeout: Duration,
    /// Largest inbound message, in bytes.
    pub max_message_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            max_message_size: 64 * 1024,
        }
    }
}

/// Accepts WebSocket upgrades on a TCP listener.
pub struct WebSocketTransport {
    listener: TcpListener,
    config: TransportConfig,
}

impl WebSocketTransport {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        Self::bind_with(addr, TransportConfig::default()).await
    }

    pub async fn bind_with(addr: &str, config: TransportConfig) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_owned(),
                source,
            })?;
        tracing::info!(addr, "relay transport listening");
        Ok(Self { listener, config })
    }

    async fn upgrade(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> Result<WebSocketConnection, TransportError> {
        let mut path = String::new();
        let record_path = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            path = req.uri().path().to_owned();
            Ok(resp)
        };
        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(self.config.max_message_size);

        let handshake =
            tokio_tungstenite::accept_hdr_async_with_config(stream, record_path, Some(ws_config));
        let ws = match tokio::time::timeout(self.config.handshake_timeout, handshake).await {
            Ok(Ok(ws)) => ws,
            Ok(Err(e)) => {
                return Err(TransportError::Upgrade {
                    peer,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(TransportError::Upgrade {
                    peer,
                    reason: "handshake timed out".into(),
                });
            }
        };

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id: ConnectionId::next(),
            path,
            peer,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn accept(&mut self) -> Result<WebSocketConnection, TransportError> {
        let (stream, peer) = self.listener.accept().await.map_err(TransportError::Accept)?;
        // Relay frames are small and latency-bound.
        let _ = stream.set_nodelay(true);

        let conn = self.upgrade(stream, peer).await?;
        tracing::debug!(conn_id = %conn.id, %peer, path = %conn.path, "websocket upgraded");
        Ok(conn)
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// One upgraded WebSocket client.
///
/// The socket is split and each half has its own lock, so a parked
/// `recv` never delays a `send`.
pub struct WebSocketConnection {
    id: ConnectionId,
    path: String,
    peer: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    fn socket_error(&self, err: tungstenite::Error) -> TransportError {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransportError::Closed(self.id)
            }
            other => TransportError::Socket {
                conn: self.id,
                source: Box::new(other),
            },
        }
    }
}

impl Connection for WebSocketConnection {
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let text = std::str::from_utf8(frame).map_err(|_| TransportError::NotUtf8(self.id))?;
        self.sink
            .lock()
            .await
            .send(Message::Text(text.to_owned().into()))
            .await
            .map_err(|e| self.socket_error(e))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut stream = self.stream.lock().await;
        while let Some(frame) = stream.next().await {
            let msg = match frame {
                Ok(msg) => msg,
                Err(e) => {
                    return match self.socket_error(e) {
                        TransportError::Closed(_) => Ok(None),
                        other => Err(other),
                    };
                }
            };
            match msg {
                Message::Text(text) => return Ok(Some(text.as_bytes().to_vec())),
                Message::Binary(data) => return Ok(Some(data.to_vec())),
                Message::Close(_) => return Ok(None),
                // tungstenite answers pings itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        match self.sink.lock().await.close().await {
            Ok(()) => Ok(()),
            Err(e) => match self.socket_error(e) {
                TransportError::Closed(_) => Ok(()),
                other => Err(other),
            },
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
