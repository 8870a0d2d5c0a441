//! Common types shared by the kibitz lobby client.
//!
//! The lobby server speaks a positional protocol: every message is a pair of
//! arrays (`i` for integers, `s` for strings) whose meaning depends on the
//! command id in `i[0]`. This crate turns those arrays into typed values and
//! back:
//! - [`api`] holds the wire [`Payload`], the per-command schema table and the
//!   decoded [`Inbound`] / encoded [`Outbound`] messages
//! - [`lobby`] models users, seats and rooms and rebuilds rooms from flattened
//!   arrays
//! - [`game`] holds game states, match results and match records
//! - [`moves`] converts engine moves to and from the server's packed integer
//! - [`elo`] computes rating deltas
pub mod api;
pub mod elo;
pub mod game;
pub mod lobby;
pub mod moves;

pub use api::{CommandId, DecodeError, Inbound, Outbound, Payload};
pub use elo::EloChange;
pub use game::{GameState, Match, MatchResult};
pub use lobby::{Player, Room, RoomFields, RoomIndex, Roster, Seat, User, UNSEATED};
pub use moves::{MoveCodec, MoveError, Promotion, Square, WireMove};
