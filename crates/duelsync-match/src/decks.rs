//! Deck ownership, answered by the external collection service.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use duelsync_protocol::{DeckId, PlayerId};
use tokio::sync::RwLock;

use crate::MatchError;

/// "Fetch deck by id and confirm ownership."
///
/// Implemented against whatever service owns decks. Card content and
/// deck legality are not this subsystem's concern.
pub trait DeckDirectory: Send + Sync + 'static {
    /// Returns `true` if `player` owns `deck`. An unknown deck is simply
    /// not owned.
    fn owns_deck(
        &self,
        player: PlayerId,
        deck: DeckId,
    ) -> impl Future<Output = Result<bool, MatchError>> + Send;
}

/// Fails with [`MatchError::Forbidden`] unless `player` owns `deck`.
pub async fn ensure_deck_owner<D: DeckDirectory>(
    decks: &D,
    player: PlayerId,
    deck: DeckId,
) -> Result<(), MatchError> {
    if decks.owns_deck(player, deck).await? {
        Ok(())
    } else {
        tracing::debug!(%player, %deck, "deck ownership check failed");
        Err(MatchError::Forbidden(format!(
            "deck {deck} does not belong to player {player}"
        )))
    }
}

/// In-process [`DeckDirectory`] for development and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDecks {
    owners: Arc<RwLock<HashMap<DeckId, PlayerId>>>,
}

impl InMemoryDecks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `player` as the owner of `deck`.
    pub async fn grant(&self, player: PlayerId, deck: DeckId) {
        self.owners.write().await.insert(deck, player);
    }
}

impl DeckDirectory for InMemoryDecks {
    async fn owns_deck(
        &self,
        player: PlayerId,
        deck: DeckId,
    ) -> Result<bool, MatchError> {
        Ok(self.owners.read().await.get(&deck) == Some(&player))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_deck_owner_accepts_owner() {
        let decks = InMemoryDecks::new();
        decks.grant(PlayerId(1), DeckId(10)).await;
        assert!(ensure_deck_owner(&decks, PlayerId(1), DeckId(10)).await.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_deck_owner_rejects_other_player() {
        let decks = InMemoryDecks::new();
        decks.grant(PlayerId(1), DeckId(10)).await;
        let result = ensure_deck_owner(&decks, PlayerId(2), DeckId(10)).await;
        assert!(matches!(result, Err(MatchError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_ensure_deck_owner_rejects_unknown_deck() {
        let decks = InMemoryDecks::new();
        let result = ensure_deck_owner(&decks, PlayerId(1), DeckId(404)).await;
        assert!(matches!(result, Err(MatchError::Forbidden(_))));
    }
}
