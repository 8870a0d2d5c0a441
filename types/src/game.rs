use serde::{Deserialize, Serialize};

use crate::{elo::EloChange, lobby::User};

/// Game state as reported in turn notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    Won,
    Lost,
    InGame,
    Draw,
    /// Any code the client does not interpret.
    Other(i64),
}

impl GameState {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => GameState::Won,
            1 => GameState::Lost,
            8 => GameState::InGame,
            9 => GameState::Draw,
            other => GameState::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            GameState::Won => 0,
            GameState::Lost => 1,
            GameState::InGame => 8,
            GameState::Draw => 9,
            GameState::Other(code) => *code,
        }
    }

    /// The match result a terminal state settles to.
    pub fn result(&self) -> Option<MatchResult> {
        match self {
            GameState::Won => Some(MatchResult::Win),
            GameState::Lost => Some(MatchResult::Loss),
            GameState::Draw => Some(MatchResult::Draw),
            GameState::InGame | GameState::Other(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    Win,
    Loss,
    Draw,
}

impl MatchResult {
    /// Picks the delta precomputed for this outcome.
    pub fn delta(&self, change: &EloChange) -> i64 {
        match self {
            MatchResult::Win => change.win,
            MatchResult::Loss => change.loss,
            MatchResult::Draw => change.draw,
        }
    }
}

/// A finished game. Records are appended once and never modified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub player: User,
    pub opponent: User,
    pub result: MatchResult,
    pub elo_delta: i64,
    /// Movetext of the finished game.
    pub final_position: String,
}
