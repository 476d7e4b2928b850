//! Per-connection relay handler.
//!
//! Each accepted socket gets its own Tokio task running this handler:
//!   1. Parse `/rooms/<code>` from the upgrade path
//!   2. Seed from the stored match, if any, and attach to the room actor
//!   3. Pump frames both ways until either side hangs up

use std::sync::Arc;

use duelsync_protocol::{Codec, ProtocolError, RelayMessage, RoomCode, StateUpdate};
use duelsync_relay::RelayHandle;
use duelsync_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::{Backend, DuelsyncError, Services};

/// Detaches the connection from its room when the handler exits.
///
/// `Drop` is synchronous, so the detach runs on a spawned task.
struct RelayGuard {
    conn_id: ConnectionId,
    handle: RelayHandle,
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let handle = self.handle.clone();
        tokio::spawn(async move {
            let _ = handle.disconnect(conn_id).await;
        });
    }
}

/// Handles a single relay connection from accept to close.
pub(crate) async fn handle_connection<B, C>(
    conn: WebSocketConnection,
    services: Arc<Services<B>>,
    codec: C,
) -> Result<(), DuelsyncError>
where
    B: Backend,
    C: Codec,
{
    let conn_id = conn.id();
    let room = match room_from_path(conn.path()) {
        Ok(room) => room,
        Err(e) => {
            send_error(&conn, &codec, 400, &e.to_string()).await?;
            let _ = conn.close().await;
            return Err(e.into());
        }
    };
    tracing::debug!(%conn_id, %room, "relay connection opened");

    let seed = match services.coordinator.find(&room).await {
        Ok(record) => record.map(|r| StateUpdate {
            state: r.state,
            version: Some(r.version),
        }),
        Err(e) => {
            tracing::warn!(%room, error = %e, "seed lookup failed, attaching unseeded");
            None
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = services.relay.connect(&room, conn_id, tx, seed).await?;
    let _guard = RelayGuard {
        conn_id,
        handle: handle.clone(),
    };

    loop {
        tokio::select! {
            inbound = conn.recv() => {
                let data = match inbound {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::debug!(%conn_id, %room, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, %room, error = %e, "recv error");
                        break;
                    }
                };
                match codec.decode::<RelayMessage>(&data) {
                    Ok(msg) => handle.send_message(conn_id, msg).await?,
                    Err(e) => {
                        tracing::debug!(%conn_id, %room, error = %e, "undecodable frame");
                        send_error(&conn, &codec, 400, &e.to_string()).await?;
                    }
                }
            }
            outbound = rx.recv() => {
                // The actor dropped our sender: it stopped under us.
                let Some(msg) = outbound else { break };
                let bytes = codec.encode(&msg)?;
                conn.send(&bytes).await?;
            }
        }
    }

    // _guard drops here and detaches the connection.
    Ok(())
}

/// Extracts the room code from `/rooms/<code>`.
fn room_from_path(path: &str) -> Result<RoomCode, ProtocolError> {
    let path = path.split('?').next().unwrap_or_default();
    match path.trim_end_matches('/').strip_prefix("/rooms/") {
        Some(raw) if !raw.contains('/') => RoomCode::parse(raw),
        _ => Err(ProtocolError::InvalidMessage(format!(
            "expected /rooms/<code>, got {path}"
        ))),
    }
}

async fn send_error<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    code: u16,
    message: &str,
) -> Result<(), DuelsyncError> {
    let frame = RelayMessage::Error {
        code,
        message: message.to_string(),
    };
    let bytes = codec.encode(&frame)?;
    conn.send(&bytes).await?;
    Ok(())
}
