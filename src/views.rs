use crate::judge::RoundOutcome;
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events the scheduler emits over the store's broadcast channel. The
/// transport layer subscribes and decides what to do with them; the
/// core never broadcasts to clients directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum GameEvent {
    Tick {
        room_code: RoomCode,
        remaining_seconds: u32,
    },
    RoundEnd {
        room_code: RoomCode,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiddleView {
    pub round: u32,
    pub total_rounds: u32,
    pub riddle: String,
    pub deadline: DateTime<Utc>,
    pub remaining_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStartView {
    pub room_code: RoomCode,
    pub players: Vec<PlayerInfo>,
    pub riddle: RiddleView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinnerView {
    pub player_id: PlayerId,
    pub player_name: String,
    pub announcement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreboardRow {
    pub rank: u32,
    pub player_id: PlayerId,
    pub player_name: String,
    /// Cumulative score after this round's points were applied
    pub score: u32,
    /// Points awarded for this round only
    pub round_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResultView {
    pub round: u32,
    pub grand_winner: WinnerView,
    pub troll_winner: WinnerView,
    pub scoreboard: Vec<ScoreboardRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingRow {
    pub rank: u32,
    pub player_id: PlayerId,
    pub player_name: String,
    pub total_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalStandingsView {
    pub standings: Vec<StandingRow>,
}

/// Riddle broadcast for the current round
pub fn riddle_view(game: &Game) -> RiddleView {
    RiddleView {
        round: game.current_round,
        total_rounds: game.total_rounds,
        riddle: game.current_riddle.clone(),
        deadline: game.round_deadline,
        remaining_seconds: remaining_seconds(game.round_deadline),
    }
}

/// Start-of-game broadcast: roster plus the first riddle
pub fn game_start_view(game: &Game) -> GameStartView {
    GameStartView {
        room_code: game.room_code.clone(),
        players: game
            .players
            .values()
            .map(|p| PlayerInfo {
                id: p.id.clone(),
                name: p.name.clone(),
            })
            .collect(),
        riddle: riddle_view(game),
    }
}

fn player_name(game: &Game, player_id: &str) -> String {
    game.players
        .get(player_id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Round-result broadcast built from a game and its round outcome.
/// Expects the outcome's scores to already be applied to the game.
pub fn round_result_view(game: &Game, outcome: &RoundOutcome) -> RoundResultView {
    let scoreboard = outcome
        .judgment
        .scoreboard
        .iter()
        .map(|entry| ScoreboardRow {
            rank: entry.rank,
            player_id: entry.player_id.clone(),
            player_name: player_name(game, &entry.player_id),
            score: game
                .players
                .get(&entry.player_id)
                .map(|p| p.score)
                .unwrap_or(0),
            round_score: entry.score,
        })
        .collect();

    RoundResultView {
        round: game.current_round,
        grand_winner: WinnerView {
            player_id: outcome.judgment.grand_winner_id.clone(),
            player_name: player_name(game, &outcome.judgment.grand_winner_id),
            announcement: outcome.grand_winner_announcement.clone(),
        },
        troll_winner: WinnerView {
            player_id: outcome.judgment.troll_winner_id.clone(),
            player_name: player_name(game, &outcome.judgment.troll_winner_id),
            announcement: outcome.troll_winner_announcement.clone(),
        },
        scoreboard,
    }
}

/// Final standings: descending cumulative score, ties kept in lobby
/// insertion order by the stable sort
pub fn final_standings_view(game: &Game) -> FinalStandingsView {
    let mut players: Vec<&PlayerGameState> = game.players.values().collect();
    players.sort_by(|a, b| b.score.cmp(&a.score));

    FinalStandingsView {
        standings: players
            .into_iter()
            .enumerate()
            .map(|(index, player)| StandingRow {
                rank: index as u32 + 1,
                player_id: player.id.clone(),
                player_name: player.name.clone(),
                total_score: player.score,
            })
            .collect(),
    }
}
