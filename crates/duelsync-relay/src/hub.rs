//! Room code to relay actor routing.

use std::collections::HashMap;
use std::sync::Arc;

use duelsync_protocol::{RoomCode, StateUpdate};
use duelsync_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::actor::spawn_relay;
use crate::{RelayConfig, RelayError, RelayHandle, RelaySender};

/// Finds the running actor for a room, spawning one on first use.
///
/// Actors stop themselves when idle; the hub notices a closed handle on
/// the next lookup and spawns a fresh actor in its place.
#[derive(Debug, Clone, Default)]
pub struct RelayHub {
    rooms: Arc<Mutex<HashMap<RoomCode, RelayHandle>>>,
    config: RelayConfig,
}

impl RelayHub {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            rooms: Arc::default(),
            config,
        }
    }

    /// The live actor for `room`.
    pub async fn room(&self, room: &RoomCode) -> RelayHandle {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(room).filter(|h| !h.is_closed()) {
            return handle.clone();
        }
        let handle = spawn_relay(room.clone(), self.config.clone());
        rooms.insert(room.clone(), handle.clone());
        handle
    }

    /// Attaches a connection to `room`.
    ///
    /// An actor can stop between lookup and attach; in that case the
    /// attach is retried once on a freshly spawned actor.
    pub async fn connect(
        &self,
        room: &RoomCode,
        conn_id: ConnectionId,
        sender: RelaySender,
        seed: Option<StateUpdate>,
    ) -> Result<RelayHandle, RelayError> {
        let handle = self.room(room).await;
        match handle.connect(conn_id, sender.clone(), seed.clone()).await {
            Err(RelayError::Unavailable(_)) => {
                tracing::debug!(%room, %conn_id, "relay stopped during attach, respawning");
                let handle = self.room(room).await;
                handle.connect(conn_id, sender, seed).await?;
                Ok(handle)
            }
            other => other.map(|()| handle),
        }
    }

    /// Forgets handles whose actors have stopped. Returns how many.
    pub async fn prune(&self) -> usize {
        let mut rooms = self.rooms.lock().await;
        let before = rooms.len();
        rooms.retain(|_, handle| !handle.is_closed());
        before - rooms.len()
    }

    /// Number of tracked rooms, stopped ones included until pruned.
    pub async fn len(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stops every actor.
    pub async fn shutdown(&self) {
        let handles: Vec<RelayHandle> =
            self.rooms.lock().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            let _ = handle.shutdown().await;
        }
    }
}
