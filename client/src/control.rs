//! Requests from observers (the dashboard) to change what the bot does.
use serde::Deserialize;

/// Deepest search the engine may be asked for.
pub const MAX_ENGINE_DEPTH: u32 = 64;

/// A change requested from outside the lobby connection.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", content = "data", rename_all = "snake_case")]
pub enum ControlEvent {
    AutoStart(bool),
    KickLowElo(bool),
    KickIfLose(bool),
    KickIfDraw(bool),
    #[serde(rename = "depth")]
    EngineDepth(u32),
    CreateRoom,
    JoinSection(String),
    JoinRoom(i64),
    LeaveRoom,
    TakeSeat(i64),
}

impl ControlEvent {
    /// Checks what can be checked without lobby state.
    pub fn is_well_formed(&self) -> bool {
        match self {
            ControlEvent::EngineDepth(depth) => (1..=MAX_ENGINE_DEPTH).contains(depth),
            ControlEvent::JoinSection(section) => !section.trim().is_empty(),
            ControlEvent::TakeSeat(seat) => (0..=1).contains(seat),
            _ => true,
        }
    }
}

/// A question answered with a [crate::Notice].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Query {
    /// The whole rating history.
    #[serde(rename = "init_rating")]
    RatingHistory,
    Info,
}
