use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::api::DecodeError;

/// Seat index of a player who is watching rather than playing.
pub const UNSEATED: i64 = -1;

/// Number of integers describing one room on the wire.
pub const ROOM_INTS: usize = 4;

/// Number of strings describing one room on the wire.
pub const ROOM_STRINGS: usize = 3;

/// Users known to the lobby, keyed by name.
pub type Roster = HashMap<String, User>;

/// Rooms known to the lobby, keyed by room id.
pub type RoomIndex = BTreeMap<i64, Room>;

/// A lobby user as listed in the roster.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub id: i64,
    pub room_id: i64,
    pub rating: i64,
}

/// The local identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub user: User,
    pub current_section: String,
    pub current_seat: i64,
    rating_history: Vec<i64>,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            user: User::default(),
            current_section: String::new(),
            current_seat: UNSEATED,
            rating_history: Vec::new(),
        }
    }
}

impl Player {
    /// Appends a rating to the history unless it repeats the last entry.
    ///
    /// Returns whether the history grew.
    pub fn record_rating(&mut self, rating: i64) -> bool {
        if self.rating_history.last() == Some(&rating) {
            return false;
        }
        self.rating_history.push(rating);
        true
    }

    pub fn rating_history(&self) -> &[i64] {
        &self.rating_history
    }

    pub fn is_seated(&self) -> bool {
        self.current_seat != UNSEATED
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub taken: bool,
    pub occupant: User,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub in_game: bool,
    pub time_control: String,
    pub seats: [Seat; 2],
}

impl Room {
    /// Rebuilds a room from its 4 integers and 3 strings, resolving seated
    /// players through `roster`.
    pub fn build(ints: &[i64], strings: &[String], roster: &Roster) -> Result<Self, DecodeError> {
        Ok(RoomFields::from_slices(ints, strings)?.resolve(roster))
    }

    pub fn seat(&self, index: i64) -> Option<&Seat> {
        usize::try_from(index).ok().and_then(|i| self.seats.get(i))
    }

    pub fn is_full(&self) -> bool {
        self.seats.iter().all(|seat| seat.taken)
    }
}

/// A room as it appears on the wire, before seat names are resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoomFields {
    pub id: i64,
    pub in_game: bool,
    pub time_control: String,
    pub taken: [bool; 2],
    pub names: [String; 2],
}

impl RoomFields {
    /// Reads `[id, in_game, seat0_taken, seat1_taken]` and
    /// `[time_control, seat0_name, seat1_name]`. Flags are set only by an exact `1`.
    pub fn from_slices(ints: &[i64], strings: &[String]) -> Result<Self, DecodeError> {
        if ints.len() < ROOM_INTS || strings.len() < ROOM_STRINGS {
            return Err(DecodeError::Truncated {
                what: "room",
                ints: ints.len(),
                strings: strings.len(),
            });
        }
        Ok(Self {
            id: ints[0],
            in_game: ints[1] == 1,
            time_control: strings[0].clone(),
            taken: [ints[2] == 1, ints[3] == 1],
            names: [strings[1].clone(), strings[2].clone()],
        })
    }

    /// Attaches roster entries to the named seats. Names missing from the
    /// roster resolve to the zero user.
    pub fn resolve(self, roster: &Roster) -> Room {
        let Self {
            id,
            in_game,
            time_control,
            taken,
            names,
        } = self;
        let [name0, name1] = names;
        let seat = |taken: bool, name: String| Seat {
            taken,
            occupant: if name.is_empty() {
                User::default()
            } else {
                roster.get(&name).cloned().unwrap_or_default()
            },
        };
        Room {
            id,
            in_game,
            time_control,
            seats: [seat(taken[0], name0), seat(taken[1], name1)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn alice() -> User {
        User {
            name: "alice".to_string(),
            id: 7,
            room_id: 5,
            rating: 1500,
        }
    }

    #[test]
    fn test_build_room() {
        let mut roster = Roster::new();
        roster.insert("alice".to_string(), alice());

        let room = Room::build(&[5, 1, 1, 0], &strings(&["10+10", "alice", ""]), &roster).unwrap();
        assert_eq!(
            room,
            Room {
                id: 5,
                in_game: true,
                time_control: "10+10".to_string(),
                seats: [
                    Seat {
                        taken: true,
                        occupant: alice()
                    },
                    Seat {
                        taken: false,
                        occupant: User::default()
                    },
                ],
            }
        );
        assert!(!room.is_full());
    }

    #[test]
    fn test_unknown_name_resolves_to_zero_user() {
        let room = Room::build(&[3, 2, 1, 1], &strings(&["3+0", "ghost", "bob"]), &Roster::new())
            .unwrap();
        assert!(!room.in_game);
        assert!(room.is_full());
        assert_eq!(room.seats[0].occupant, User::default());
        assert_eq!(room.seats[1].occupant, User::default());
    }

    #[test]
    fn test_truncated_room() {
        let err = Room::build(&[3, 0, 1], &strings(&["3+0", "", ""]), &Roster::new()).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { what: "room", .. }));
    }

    #[test]
    fn test_rating_history_dedup() {
        let mut player = Player::default();
        assert!(player.record_rating(1500));
        assert!(!player.record_rating(1500));
        assert!(player.record_rating(1520));
        assert_eq!(player.rating_history(), &[1500, 1520]);
    }

    #[test]
    fn test_rating_history_allows_returning_value() {
        let mut player = Player::default();
        for rating in [1500, 1520, 1500] {
            player.record_rating(rating);
        }
        assert_eq!(player.rating_history(), &[1500, 1520, 1500]);
    }

    #[test]
    fn test_seat_lookup() {
        let room = Room::default();
        assert!(room.seat(0).is_some());
        assert!(room.seat(1).is_some());
        assert!(room.seat(2).is_none());
        assert!(room.seat(UNSEATED).is_none());
    }
}
