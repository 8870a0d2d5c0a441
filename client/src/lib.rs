//! Lobby client for the kibitz chess bot.
//!
//! A [runner::Runner] owns a [session::Session], feeds it payloads read from
//! the lobby websocket ([events::Stream]) together with control events from
//! observers, and writes whatever the session answers back to the server.
pub mod automation;
pub mod board;
pub mod control;
pub mod engine;
pub mod events;
pub mod history;
pub mod login;
pub mod notice;
pub mod runner;
pub mod session;
pub mod state;

pub use board::Board;
pub use control::{ControlEvent, Query};
pub use engine::{MoveGenerator, UciEngine};
pub use events::{PayloadSink, Stream, Writer};
pub use history::MatchHistory;
pub use notice::{InfoSnapshot, Notice};
pub use runner::{Runner, RunnerHandle};
pub use session::Session;
pub use state::{Game, State};

use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed: {0}")]
    Failed(reqwest::StatusCode),
    #[error("login response carried no session cookie")]
    MissingSession,
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue),
    #[error("malformed message: {0}")]
    Decode(#[from] kibitz_types::DecodeError),
    #[error("could not encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid engine move: {0}")]
    Move(#[from] kibitz_types::MoveError),
    #[error("illegal move {san:?}: {reason}")]
    IllegalMove { san: String, reason: String },
    #[error("engine error: {0}")]
    Engine(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected ws or wss)")]
    InvalidScheme(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
