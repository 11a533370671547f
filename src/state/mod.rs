mod game;
mod timer;

use crate::types::*;
use crate::views::GameEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock};

/// Owns every active game, its countdown handle, and the event channel
/// the transport layer subscribes to. Passed explicitly to callers; no
/// ambient singleton.
#[derive(Clone)]
pub struct GameStore {
    pub(crate) games: Arc<RwLock<HashMap<RoomCode, Game>>>,
    /// Cancel handles for running countdowns, keyed by room code
    pub(crate) timers: Arc<RwLock<HashMap<RoomCode, watch::Sender<bool>>>>,
    events: broadcast::Sender<GameEvent>,
    pub(crate) config: GameConfig,
}

impl GameStore {
    pub fn new(config: GameConfig) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            games: Arc::new(RwLock::new(HashMap::new())),
            timers: Arc::new(RwLock::new(HashMap::new())),
            events: tx,
            config,
        }
    }

    /// Subscribe to tick and round-end events for all rooms
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: GameEvent) {
        // Ignore send errors (no receivers connected is fine)
        let _ = self.events.send(event);
    }

    /// Get a snapshot of the current game state for a room
    pub async fn get_game(&self, room_code: &str) -> Option<Game> {
        self.games.read().await.get(room_code).cloned()
    }
}

impl Default for GameStore {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn lobby(room: &str, names: &[(&str, &str)]) -> LobbySnapshot {
        let mut players = IndexMap::new();
        for (id, name) in names {
            players.insert(id.to_string(), name.to_string());
        }
        LobbySnapshot {
            room_code: room.to_string(),
            players,
        }
    }

    #[tokio::test]
    async fn test_store_holds_independent_games() {
        let store = GameStore::default();
        store.start_game(lobby("AAAA", &[("p1", "Alice")])).await;
        store.start_game(lobby("BBBB", &[("p2", "Bob")])).await;

        let a = store.get_game("AAAA").await.unwrap();
        let b = store.get_game("BBBB").await.unwrap();
        assert_eq!(a.players.len(), 1);
        assert!(a.players.contains_key("p1"));
        assert!(b.players.contains_key("p2"));
        assert!(store.get_game("CCCC").await.is_none());
    }

    #[tokio::test]
    async fn test_emitted_events_reach_subscribers() {
        let store = GameStore::default();
        let mut rx = store.subscribe();
        store.emit(GameEvent::RoundEnd {
            room_code: "AAAA".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            GameEvent::RoundEnd {
                room_code: "AAAA".to_string()
            }
        );
    }
}
