//! The service graph shared by the HTTP API and the relay handler.

use std::sync::Arc;

use duelsync_match::{
    DeckDirectory, InMemoryDecks, Lobby, LobbyEntry, MatchCoordinator, Matchmaker,
};
use duelsync_quickroom::{QuickRoom, QuickRoomRegistry};
use duelsync_relay::RelayHub;
use duelsync_store::{KeyValueStore, MatchStore, MemoryKv, MemoryMatchStore};

use crate::ServerConfig;

/// The storage and collaborator types a server runs on.
///
/// Swap in shared external stores here to run several instances side by
/// side.
pub trait Backend: Send + Sync + 'static {
    type Matches: MatchStore;
    type Lobbies: KeyValueStore<LobbyEntry>;
    type QuickRooms: KeyValueStore<QuickRoom>;
    type Decks: DeckDirectory;
}

/// Everything in process memory. One instance, no durability.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryBackend;

impl Backend for InMemoryBackend {
    type Matches = MemoryMatchStore;
    type Lobbies = MemoryKv<LobbyEntry>;
    type QuickRooms = MemoryKv<QuickRoom>;
    type Decks = InMemoryDecks;
}

pub struct Services<B: Backend> {
    pub coordinator: Arc<MatchCoordinator<B::Matches>>,
    pub lobby: Lobby<B::Lobbies, B::Matches, B::Decks>,
    pub matchmaker: Matchmaker<B::Matches, B::Decks>,
    pub quick_rooms: QuickRoomRegistry<B::QuickRooms>,
    pub relay: RelayHub,
}

impl<B: Backend> Services<B> {
    pub fn new(
        matches: B::Matches,
        lobbies: B::Lobbies,
        quick_rooms: B::QuickRooms,
        decks: Arc<B::Decks>,
        config: &ServerConfig,
    ) -> Self {
        let coordinator = Arc::new(MatchCoordinator::new(
            matches,
            config.coordinator.clone(),
        ));
        Self {
            lobby: Lobby::new(
                lobbies,
                Arc::clone(&coordinator),
                Arc::clone(&decks),
                config.lobby.clone(),
            ),
            matchmaker: Matchmaker::new(Arc::clone(&coordinator), decks),
            quick_rooms: QuickRoomRegistry::new(quick_rooms, config.quick_room.clone()),
            relay: RelayHub::new(config.relay.clone()),
            coordinator,
        }
    }

    /// One round of resource hygiene: expired lobbies and quick rooms,
    /// stopped relay actors.
    pub async fn sweep(&self) {
        match self.lobby.sweep().await {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "expired lobbies swept"),
            Err(e) => tracing::warn!(error = %e, "lobby sweep failed"),
        }
        if let Err(e) = self.quick_rooms.sweep().await {
            tracing::warn!(error = %e, "quick-room sweep failed");
        }
        let pruned = self.relay.prune().await;
        if pruned > 0 {
            tracing::debug!(pruned, "stopped relays pruned");
        }
    }
}

impl Services<InMemoryBackend> {
    /// In-memory services with the given deck directory.
    pub fn in_memory(decks: Arc<InMemoryDecks>, config: &ServerConfig) -> Self {
        Self::new(
            MemoryMatchStore::new(),
            MemoryKv::new(),
            MemoryKv::new(),
            decks,
            config,
        )
    }
}
