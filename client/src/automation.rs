//! Decisions the bot takes on its own.
//!
//! These are pure functions of the lobby mirror and the [Policy]; the session
//! turns their answers into outgoing messages.
use std::time::Duration;

use kibitz_types::{EloChange, GameState, MatchResult, UNSEATED};
use serde::{Deserialize, Serialize};

/// Default engine search depth in plies.
pub const DEFAULT_ENGINE_DEPTH: u32 = 10;

/// Switches controlling the bot's automatic behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Start a match as soon as both seats are taken.
    pub auto_start: bool,
    /// Vacate the opponent's seat when winning would not gain rating.
    pub kick_low_elo: bool,
    /// Remove the opponent from the room after losing to them.
    pub kick_if_lose: bool,
    /// Remove the opponent from the room after a draw that gained rating.
    pub kick_if_draw: bool,
    pub engine_depth: u32,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            auto_start: false,
            kick_low_elo: false,
            kick_if_lose: false,
            kick_if_draw: false,
            engine_depth: DEFAULT_ENGINE_DEPTH,
        }
    }
}

/// What a turn notification calls for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnDecision {
    /// It is our move.
    Move,
    /// The game we were playing just ended.
    Settle(MatchResult),
    Nothing,
}

pub fn on_turn(
    last: Option<GameState>,
    current: GameState,
    turn: i64,
    local_seat: i64,
) -> TurnDecision {
    if current == GameState::InGame && turn != UNSEATED && turn == local_seat {
        return TurnDecision::Move;
    }
    if last == Some(GameState::InGame) {
        if let Some(result) = current.result() {
            return TurnDecision::Settle(result);
        }
    }
    TurnDecision::Nothing
}

/// Whether to remove the opponent from the room after a finished game.
pub fn kick_after(policy: &Policy, result: MatchResult, change: &EloChange) -> bool {
    match result {
        MatchResult::Win => false,
        MatchResult::Loss => policy.kick_if_lose,
        MatchResult::Draw => policy.kick_if_draw && change.draw > 0,
    }
}

/// What a full local room calls for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeatingDecision {
    VacateOpponent,
    Start,
    Nothing,
}

pub fn on_room_full(policy: &Policy, change: &EloChange) -> SeatingDecision {
    if policy.kick_low_elo && change.win <= 0 {
        SeatingDecision::VacateOpponent
    } else if policy.auto_start {
        SeatingDecision::Start
    } else {
        SeatingDecision::Nothing
    }
}

/// Seat the opponent occupies, seen from `local_seat`.
pub fn opponent_seat(local_seat: i64) -> i64 {
    if local_seat == 1 {
        0
    } else {
        1
    }
}

/// Thinking time reported with a move, in tenths of a second and at least 1.
pub fn think_time(elapsed: Duration) -> i64 {
    i64::try_from(elapsed.as_millis() / 100)
        .unwrap_or(i64::MAX)
        .max(1)
}
