use super::GameStore;
use crate::judge::{self, RoundOutcome, StageProvider, Submission};
use crate::photos::PhotoSource;
use crate::riddles;
use crate::types::*;
use crate::views::GameEvent;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Duration, Utc};
use indexmap::IndexMap;

impl GameStore {
    /// Initialize a game from a lobby snapshot and arm the first
    /// round's countdown
    pub async fn start_game(&self, lobby: LobbySnapshot) -> Game {
        let players: IndexMap<PlayerId, PlayerGameState> = lobby
            .players
            .iter()
            .map(|(id, name)| {
                (
                    id.clone(),
                    PlayerGameState {
                        id: id.clone(),
                        name: name.clone(),
                        score: 0,
                        has_submitted: false,
                        photo_path: None,
                    },
                )
            })
            .collect();

        let game = Game {
            room_code: lobby.room_code.clone(),
            players,
            current_round: 1,
            total_rounds: self.config.total_rounds,
            current_riddle: riddles::draw_riddle().to_string(),
            round_deadline: Utc::now() + Duration::seconds(self.config.round_seconds as i64),
            status: GameStatus::Riddle,
        };

        self.games
            .write()
            .await
            .insert(lobby.room_code.clone(), game.clone());
        self.start_round_timer(&lobby.room_code).await;

        game
    }

    /// Record a photo submission for the current round. Late, duplicate
    /// and unknown submissions are expected races and report `false`
    /// rather than erroring. Completing the set ends the round at once.
    pub async fn submit_photo(&self, room_code: &str, player_id: &str, photo_ref: &str) -> bool {
        let all_submitted = {
            let mut games = self.games.write().await;
            let Some(game) = games.get_mut(room_code) else {
                return false;
            };
            if game.status != GameStatus::Riddle {
                return false;
            }
            if Utc::now() > game.round_deadline {
                return false;
            }
            let Some(player) = game.players.get_mut(player_id) else {
                return false;
            };
            if player.has_submitted {
                return false;
            }

            player.has_submitted = true;
            player.photo_path = Some(photo_ref.to_string());
            game.all_players_submitted()
        };

        if all_submitted {
            self.finish_round_early(room_code).await;
        }

        true
    }

    /// Force-mark a disconnected player as submitted (with no photo) so
    /// they stop blocking round completion, then re-check the early-end
    /// condition exactly like a real submission would.
    pub async fn disconnect_player(&self, room_code: &str, player_id: &str) {
        let ended = {
            let mut games = self.games.write().await;
            let Some(game) = games.get_mut(room_code) else {
                return;
            };
            if let Some(player) = game.players.get_mut(player_id) {
                if !player.has_submitted {
                    player.has_submitted = true;
                }
            }
            game.status == GameStatus::Riddle && game.all_players_submitted()
        };

        if ended {
            self.finish_round_early(room_code).await;
        }
    }

    async fn finish_round_early(&self, room_code: &str) {
        self.cancel_timer(room_code).await;
        self.emit(GameEvent::RoundEnd {
            room_code: room_code.to_string(),
        });
    }

    /// Judge the current round: close submissions, run the pipeline,
    /// apply round-local scores. Returns `None` when there was nothing
    /// to judge or the pipeline failed; either way the game lands in
    /// `Results` and can advance.
    pub async fn run_judging(
        &self,
        room_code: &str,
        stages: &dyn StageProvider,
        photos: &dyn PhotoSource,
    ) -> Option<RoundOutcome> {
        let (riddle, photo_refs) = {
            let mut games = self.games.write().await;
            let game = games.get_mut(room_code)?;
            game.status = GameStatus::Judging;

            let refs: Vec<(PlayerId, PhotoRef)> = game
                .players
                .values()
                .filter_map(|p| p.photo_path.clone().map(|path| (p.id.clone(), path)))
                .collect();
            (game.current_riddle.clone(), refs)
        };

        let mut submissions = Vec::new();
        for (player_id, photo_ref) in photo_refs {
            match photos.read(&photo_ref).await {
                Ok(bytes) => submissions.push(Submission {
                    player_id,
                    image_base64: STANDARD.encode(&bytes),
                }),
                Err(e) => {
                    // Drop just this submission; the rest of the round
                    // is still judgeable
                    tracing::error!(
                        "Failed to read photo {} for player {}: {}",
                        photo_ref,
                        player_id,
                        e
                    );
                }
            }
        }

        if submissions.is_empty() {
            self.set_status(room_code, GameStatus::Results).await;
            return None;
        }

        match judge::judge_round(stages, &riddle, &submissions).await {
            Ok(outcome) => {
                let mut games = self.games.write().await;
                if let Some(game) = games.get_mut(room_code) {
                    for entry in &outcome.judgment.scoreboard {
                        if let Some(player) = game.players.get_mut(&entry.player_id) {
                            player.score += entry.score;
                        }
                    }
                    game.status = GameStatus::Results;
                }
                Some(outcome)
            }
            Err(e) => {
                tracing::error!("Judging failed for room {}: {}", room_code, e);
                self.set_status(room_code, GameStatus::Results).await;
                None
            }
        }
    }

    async fn set_status(&self, room_code: &str, status: GameStatus) {
        if let Some(game) = self.games.write().await.get_mut(room_code) {
            game.status = status;
        }
    }

    /// Advance past the results screen: either into the next round's
    /// riddle or, after the last round, into the terminal state.
    pub async fn advance(&self, room_code: &str) -> Option<Game> {
        let game = {
            let mut games = self.games.write().await;
            let game = games.get_mut(room_code)?;

            if game.current_round >= game.total_rounds {
                game.status = GameStatus::Finished;
                return Some(game.clone());
            }

            for player in game.players.values_mut() {
                player.has_submitted = false;
                player.photo_path = None;
            }
            game.current_round += 1;
            game.current_riddle = riddles::draw_riddle().to_string();
            game.round_deadline =
                Utc::now() + Duration::seconds(self.config.round_seconds as i64);
            game.status = GameStatus::Riddle;
            game.clone()
        };

        self.start_round_timer(room_code).await;
        Some(game)
    }

    /// Tear down a game and its timers; safe to call when neither exists
    pub async fn end_game(&self, room_code: &str) {
        self.cancel_timer(room_code).await;
        self.games.write().await.remove(room_code);
    }
}
