use super::GameStore;
use crate::types::{remaining_seconds, GameStatus};
use crate::views::GameEvent;
use std::time::Duration;
use tokio::sync::watch;

impl GameStore {
    /// Arm the per-second countdown for a room's current round. Any
    /// previous countdown for the room is cancelled first.
    pub(crate) async fn start_round_timer(&self, room_code: &str) {
        self.cancel_timer(room_code).await;

        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        self.timers
            .write()
            .await
            .insert(room_code.to_string(), cancel_tx);

        let store = self.clone();
        let room = room_code.to_string();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick completes immediately; consume it so the
            // countdown fires at 1s, 2s, ... like a wall-clock interval
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let remaining = {
                            let games = store.games.read().await;
                            match games.get(&room) {
                                // Countdown only runs while submissions are open
                                Some(game) if game.status == GameStatus::Riddle => {
                                    remaining_seconds(game.round_deadline)
                                }
                                _ => break,
                            }
                        };

                        store.emit(GameEvent::Tick {
                            room_code: room.clone(),
                            remaining_seconds: remaining,
                        });

                        if remaining == 0 {
                            store.emit(GameEvent::RoundEnd {
                                room_code: room.clone(),
                            });
                            break;
                        }
                    }
                    _ = cancel_rx.changed() => break,
                }
            }
        });
    }

    /// Cancel a room's countdown if one is running; safe to call when
    /// no timer is active.
    pub(crate) async fn cancel_timer(&self, room_code: &str) {
        if let Some(cancel) = self.timers.write().await.remove(room_code) {
            let _ = cancel.send(true);
        }
    }
}
