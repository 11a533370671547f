use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type RoomCode = String;
pub type PlayerId = String;
/// Reference to an uploaded photo, resolved through a [`crate::photos::PhotoSource`]
pub type PhotoRef = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// Riddle shown, submissions open, countdown running
    Riddle,
    /// Submissions closed, judging pipeline running
    Judging,
    /// Round outcome available, no countdown
    Results,
    /// Terminal state after the last round
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub round_seconds: u64,
    pub total_rounds: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_seconds: 60,
            total_rounds: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerGameState {
    pub id: PlayerId,
    pub name: String,
    /// Cumulative score across rounds, never reset
    pub score: u32,
    pub has_submitted: bool,
    /// Present only while the current round's photo is pending judging.
    /// A disconnected player can have `has_submitted` with no photo.
    pub photo_path: Option<PhotoRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub room_code: RoomCode,
    /// Insertion order matches the lobby and breaks final-standings ties
    pub players: IndexMap<PlayerId, PlayerGameState>,
    /// 1-based, never exceeds `total_rounds`
    pub current_round: u32,
    pub total_rounds: u32,
    pub current_riddle: String,
    pub round_deadline: DateTime<Utc>,
    pub status: GameStatus,
}

impl Game {
    pub fn all_players_submitted(&self) -> bool {
        self.players.values().all(|p| p.has_submitted)
    }
}

/// Snapshot of a lobby at game start: ordered player id -> display name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbySnapshot {
    pub room_code: RoomCode,
    pub players: IndexMap<PlayerId, String>,
}

/// Whole seconds left until `deadline`, clamped to zero
pub fn remaining_seconds(deadline: DateTime<Utc>) -> u32 {
    let ms = (deadline - Utc::now()).num_milliseconds();
    if ms <= 0 {
        0
    } else {
        (ms as u64).div_ceil(1000) as u32
    }
}
