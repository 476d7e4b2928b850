//! Room actor: one Tokio task per room code.
//!
//! Every connection attached to a room talks to the same actor through
//! its channel, so messages for a room are handled one at a time in
//! arrival order.

use std::collections::{BTreeMap, BTreeSet};

use duelsync_protocol::{PlayerId, Presence, RelayMessage, RoomCode, StateUpdate};
use duelsync_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::{Applied, RelayConfig, RelayError, StateCache};

/// Channel the actor uses to push frames to one connection.
pub type RelaySender = mpsc::UnboundedSender<RelayMessage>;

pub(crate) enum RelayCommand {
    Connect {
        conn_id: ConnectionId,
        sender: RelaySender,
        seed: Option<StateUpdate>,
        reply: oneshot::Sender<Result<(), RelayError>>,
    },
    Message {
        conn_id: ConnectionId,
        msg: RelayMessage,
    },
    Disconnect {
        conn_id: ConnectionId,
    },
    Info {
        reply: oneshot::Sender<RelayInfo>,
    },
    Shutdown,
}

/// Snapshot of a room actor's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayInfo {
    pub room: RoomCode,
    pub connections: usize,
    pub players: Vec<PlayerId>,
    pub seeded: bool,
    pub version: Option<u64>,
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    room: RoomCode,
    sender: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    pub fn room(&self) -> &RoomCode {
        &self.room
    }

    /// Attaches a connection and offers `seed` to the cache.
    ///
    /// A versioned seed is a confirmed snapshot and replaces the cache
    /// when it is newer. An unversioned seed follows the first-writer-wins
    /// rule of `INIT_MATCH`.
    ///
    /// Returns once the actor has registered the connection, broadcast
    /// presence and sent any sync frame.
    pub async fn connect(
        &self,
        conn_id: ConnectionId,
        sender: RelaySender,
        seed: Option<StateUpdate>,
    ) -> Result<(), RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Connect {
            conn_id,
            sender,
            seed,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Delivers a client frame (fire-and-forget).
    pub async fn send_message(
        &self,
        conn_id: ConnectionId,
        msg: RelayMessage,
    ) -> Result<(), RelayError> {
        self.send(RelayCommand::Message { conn_id, msg }).await
    }

    pub async fn disconnect(&self, conn_id: ConnectionId) -> Result<(), RelayError> {
        self.send(RelayCommand::Disconnect { conn_id }).await
    }

    pub async fn info(&self) -> Result<RelayInfo, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Info { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    pub async fn shutdown(&self) -> Result<(), RelayError> {
        self.send(RelayCommand::Shutdown).await
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves when the actor stops.
    pub async fn closed(&self) {
        self.sender.closed().await
    }

    async fn send(&self, cmd: RelayCommand) -> Result<(), RelayError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RelayError {
        RelayError::Unavailable(self.room.clone())
    }
}

struct Attached {
    sender: RelaySender,
    player: Option<PlayerId>,
}

struct RelayActor {
    room: RoomCode,
    config: RelayConfig,
    connections: BTreeMap<ConnectionId, Attached>,
    cache: StateCache,
    receiver: mpsc::Receiver<RelayCommand>,
}

impl RelayActor {
    async fn run(mut self) {
        tracing::info!(room = %self.room, "relay actor started");

        loop {
            let cmd = if self.connections.is_empty() {
                tokio::select! {
                    cmd = self.receiver.recv() => cmd,
                    () = tokio::time::sleep(self.config.idle_grace) => {
                        tracing::info!(room = %self.room, "relay idle, stopping");
                        break;
                    }
                }
            } else {
                self.receiver.recv().await
            };

            match cmd {
                Some(RelayCommand::Connect {
                    conn_id,
                    sender,
                    seed,
                    reply,
                }) => {
                    let _ = reply.send(self.handle_connect(conn_id, sender, seed));
                }
                Some(RelayCommand::Message { conn_id, msg }) => {
                    self.handle_message(conn_id, msg);
                }
                Some(RelayCommand::Disconnect { conn_id }) => {
                    self.handle_disconnect(conn_id);
                }
                Some(RelayCommand::Info { reply }) => {
                    let _ = reply.send(self.info());
                }
                Some(RelayCommand::Shutdown) | None => break,
            }
        }

        tracing::info!(room = %self.room, "relay actor stopped");
    }

    fn handle_connect(
        &mut self,
        conn_id: ConnectionId,
        sender: RelaySender,
        seed: Option<StateUpdate>,
    ) -> Result<(), RelayError> {
        if self.connections.contains_key(&conn_id) {
            return Err(RelayError::AlreadyConnected(conn_id, self.room.clone()));
        }
        match seed {
            Some(seed) if seed.version.is_some() => self.refresh(conn_id, seed),
            Some(seed) => self.seed(conn_id, seed),
            None => {}
        }

        self.connections.insert(
            conn_id,
            Attached {
                sender,
                player: None,
            },
        );
        tracing::info!(
            room = %self.room,
            %conn_id,
            connections = self.connections.len(),
            "connection attached"
        );

        self.broadcast_presence();
        if let Some(sync) = self.cache.sync_message() {
            self.send_to(conn_id, sync);
        }
        Ok(())
    }

    fn handle_disconnect(&mut self, conn_id: ConnectionId) {
        if self.connections.remove(&conn_id).is_none() {
            return;
        }
        tracing::info!(
            room = %self.room,
            %conn_id,
            connections = self.connections.len(),
            "connection detached"
        );
        self.broadcast_presence();
    }

    fn handle_message(&mut self, conn_id: ConnectionId, msg: RelayMessage) {
        if !self.connections.contains_key(&conn_id) {
            tracing::warn!(room = %self.room, %conn_id, "message from unattached connection");
            return;
        }

        match msg {
            RelayMessage::Identify { player_id } => {
                if let Some(attached) = self.connections.get_mut(&conn_id) {
                    attached.player = Some(player_id);
                }
                tracing::debug!(room = %self.room, %conn_id, %player_id, "connection identified");
                self.broadcast_presence();
            }
            RelayMessage::InitMatch(update) => self.seed(conn_id, update),
            RelayMessage::BroadcastAction(payload) => {
                let msg = RelayMessage::BroadcastAction(payload);
                for (&id, attached) in &self.connections {
                    if id != conn_id {
                        let _ = attached.sender.send(msg.clone());
                    }
                }
            }
            RelayMessage::UpdateMatchState(update) => {
                match self.cache.apply(update.clone()) {
                    Applied::Replaced => {
                        self.broadcast(RelayMessage::UpdateMatchState(update));
                    }
                    Applied::Stale { cached } => {
                        tracing::debug!(
                            room = %self.room,
                            %conn_id,
                            version = ?update.version,
                            cached,
                            "stale state update dropped"
                        );
                    }
                }
            }
            other => {
                tracing::debug!(room = %self.room, %conn_id, kind = other.kind(), "server-only kind from client");
                self.send_to(
                    conn_id,
                    RelayMessage::Error {
                        code: 400,
                        message: format!("{} may not be sent by clients", other.kind()),
                    },
                );
            }
        }
    }

    fn seed(&mut self, conn_id: ConnectionId, update: StateUpdate) {
        if self.cache.try_seed(update) {
            tracing::debug!(room = %self.room, %conn_id, version = ?self.cache.version(), "relay seeded");
        } else {
            tracing::debug!(room = %self.room, %conn_id, "seed ignored, already seeded");
        }
    }

    fn refresh(&mut self, conn_id: ConnectionId, update: StateUpdate) {
        let version = update.version;
        match self.cache.apply(update) {
            Applied::Replaced => {
                tracing::debug!(room = %self.room, %conn_id, ?version, "relay refreshed from store");
            }
            Applied::Stale { cached } => {
                tracing::debug!(room = %self.room, %conn_id, ?version, cached, "stored seed not newer, kept cache");
            }
        }
    }

    fn presence(&self) -> Presence {
        let players: BTreeSet<PlayerId> = self
            .connections
            .values()
            .filter_map(|attached| attached.player)
            .collect();
        Presence {
            count: self.connections.len(),
            players: players.into_iter().collect(),
        }
    }

    fn broadcast_presence(&self) {
        self.broadcast(RelayMessage::PresenceUpdate(self.presence()));
    }

    fn broadcast(&self, msg: RelayMessage) {
        for attached in self.connections.values() {
            let _ = attached.sender.send(msg.clone());
        }
    }

    /// Drops the frame if the connection is gone.
    fn send_to(&self, conn_id: ConnectionId, msg: RelayMessage) {
        if let Some(attached) = self.connections.get(&conn_id) {
            let _ = attached.sender.send(msg);
        }
    }

    fn info(&self) -> RelayInfo {
        RelayInfo {
            room: self.room.clone(),
            connections: self.connections.len(),
            players: self.presence().players,
            seeded: self.cache.is_seeded(),
            version: self.cache.version(),
        }
    }
}

/// Spawns a room actor and returns its handle.
pub(crate) fn spawn_relay(room: RoomCode, config: RelayConfig) -> RelayHandle {
    let (tx, rx) = mpsc::channel(config.channel_size);
    let actor = RelayActor {
        room: room.clone(),
        config,
        connections: BTreeMap::new(),
        cache: StateCache::new(),
        receiver: rx,
    };
    tokio::spawn(actor.run());
    RelayHandle { room, sender: tx }
}
