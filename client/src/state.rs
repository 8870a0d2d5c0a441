//! Local mirror of the lobby.
//!
//! Everything here is written by [crate::Session] alone, in the order messages
//! arrive. Observers get read-only access.
use kibitz_types::{EloChange, GameState, Player, Room, RoomIndex, Roster, User};

use crate::{board::Board, history::MatchHistory};

/// The game the local player is currently playing.
#[derive(Clone, Debug)]
pub struct Game {
    pub turn: i64,
    pub board: Board,
    pub is_white: bool,
    /// Rating change for each outcome, fixed when the game starts.
    pub elo_change: EloChange,
    /// Ply at which a move was last requested, so repeated turn notices for
    /// the same position are answered once.
    pub(crate) answered_ply: Option<usize>,
}

impl Game {
    pub fn new(is_white: bool, elo_change: EloChange) -> Self {
        Self {
            turn: -1,
            board: Board::new(),
            is_white,
            elo_change,
            answered_ply: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct State {
    pub(crate) roster: Roster,
    pub(crate) rooms: RoomIndex,
    pub(crate) sections: Vec<String>,
    pub(crate) player: Player,
    pub(crate) game: Option<Game>,
    pub(crate) last_game_state: Option<GameState>,
    pub(crate) history: MatchHistory,
}

impl State {
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn rooms(&self) -> &RoomIndex {
        &self.rooms
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    pub fn last_game_state(&self) -> Option<GameState> {
        self.last_game_state
    }

    pub fn history(&self) -> &MatchHistory {
        &self.history
    }

    /// The room the local player is in, if the lobby has described it.
    pub fn current_room(&self) -> Option<&Room> {
        self.rooms.get(&self.player.user.room_id)
    }

    /// The other player in the current room.
    ///
    /// Seated at 0 with seat 1 taken, the opponent is seat 1's occupant;
    /// otherwise it is seat 0's.
    pub fn current_opponent(&self) -> User {
        let Some(room) = self.current_room() else {
            return User::default();
        };
        let index = if self.player.current_seat == 0 && room.seats[1].taken {
            1
        } else {
            0
        };
        room.seats[index].occupant.clone()
    }

    /// Rating change for the current room, taking seat 0 as the local player
    /// and seat 1 as the opponent.
    pub fn elo_change(&self) -> EloChange {
        let room = self.current_room().cloned().unwrap_or_default();
        EloChange::compute(room.seats[0].occupant.rating, room.seats[1].occupant.rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kibitz_types::Seat;

    fn user(name: &str, rating: i64) -> User {
        User {
            name: name.to_string(),
            id: 0,
            room_id: 4,
            rating,
        }
    }

    fn state_in_room(seat: i64, seats: [Seat; 2]) -> State {
        let mut state = State::default();
        state.player.user = user("bot", 1500);
        state.player.current_seat = seat;
        state.rooms.insert(
            4,
            Room {
                id: 4,
                in_game: false,
                time_control: "5+0".to_string(),
                seats,
            },
        );
        state
    }

    fn seat(occupant: User) -> Seat {
        Seat {
            taken: true,
            occupant,
        }
    }

    #[test]
    fn test_no_room() {
        let state = State::default();
        assert!(state.current_room().is_none());
        assert_eq!(state.current_opponent(), User::default());
        assert_eq!(
            state.elo_change(),
            EloChange {
                win: 16,
                loss: 0,
                draw: 16
            }
        );
    }

    #[test]
    fn test_opponent_from_seat_zero() {
        let state = state_in_room(0, [seat(user("bot", 1500)), seat(user("carol", 1600))]);
        assert_eq!(state.current_opponent().name, "carol");
    }

    #[test]
    fn test_opponent_from_seat_one() {
        let state = state_in_room(1, [seat(user("carol", 1600)), seat(user("bot", 1500))]);
        assert_eq!(state.current_opponent().name, "carol");
    }

    #[test]
    fn test_opponent_when_seat_one_empty() {
        let state = state_in_room(0, [seat(user("bot", 1500)), Seat::default()]);
        assert_eq!(state.current_opponent().name, "bot");
    }

    #[test]
    fn test_elo_change_uses_seat_order() {
        let state = state_in_room(1, [seat(user("carol", 1400)), seat(user("bot", 1600))]);
        assert_eq!(
            state.elo_change(),
            EloChange {
                win: 24,
                loss: 8,
                draw: 8
            }
        );
    }
}
