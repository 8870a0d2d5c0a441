//! Wire messages.
//!
//! Both directions use the same JSON shape, `{"i": [..], "s": [..]}`. Inbound
//! messages carry their command id in `i[0]`; the remaining positions are fixed
//! per command and listed in [`SCHEMA`].
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    game::GameState,
    lobby::{RoomFields, User, ROOM_INTS, ROOM_STRINGS},
};

/// Offset of the first per-entry integer in roster and room-list snapshots.
const SNAPSHOT_OFFSET: usize = 3;

/// Integers per user in a roster snapshot.
const ROSTER_INTS: usize = 3;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message has no command id")]
    Empty,
    #[error("{what} truncated: {ints} ints, {strings} strings")]
    Truncated {
        what: &'static str,
        ints: usize,
        strings: usize,
    },
    #[error("{what} index out of range: {index}")]
    InvalidIndex { what: &'static str, index: i64 },
}

/// A raw protocol message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub i: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub s: Vec<String>,
}

impl Payload {
    pub fn ints(i: Vec<i64>) -> Self {
        Self { i, s: Vec::new() }
    }

    pub fn new(i: Vec<i64>, s: Vec<String>) -> Self {
        Self { i, s }
    }

    pub fn from_json(text: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn command(&self) -> Option<i64> {
        self.i.first().copied()
    }
}

/// Server commands the client understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandId {
    Ping = 1,
    Username = 18,
    UserLeft = 24,
    UserUpdated = 25,
    Roster = 27,
    Sections = 32,
    Rating = 33,
    RoomUpdated = 70,
    RoomList = 71,
    CurrentRoom = 73,
    Seat = 88,
    Turn = 90,
    GameStarted = 91,
    Move = 92,
}

/// Minimum payload lengths, command id included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shape {
    pub ints: usize,
    pub strings: usize,
}

const fn shape(ints: usize, strings: usize) -> Shape {
    Shape { ints, strings }
}

/// Per-command payload layout.
///
/// | id | ints | strings |
/// |----|------|---------|
/// | 1  | `[1]` | - |
/// | 18 | `[18]` | `[name]` |
/// | 24 | `[24]` | `[name]` |
/// | 25 | `[25, id, room, rating]` | `[name]` |
/// | 27 | `[27, _, _, (id, room, rating)*]` | `[name*]` |
/// | 32 | `[32, selected]` | `["section ...\n..."]` |
/// | 33 | `[33, rating]` | - |
/// | 70 | `[70, id, in_game, taken0, taken1]` | `[time, name0, name1]` |
/// | 71 | `[71, _, _, (id, in_game, taken0, taken1)*]` | `[(time, name0, name1)*]` |
/// | 73 | `[73, room]` | - |
/// | 88 | `[88, _, _, _, seat]` | - |
/// | 90 | `[90, _, _, turn, state]` | - |
/// | 91 | `[91, _]` when playing white, longer otherwise | - |
/// | 92 | `[92, ..]` | `[san]` |
pub const SCHEMA: [(CommandId, Shape); 14] = [
    (CommandId::Ping, shape(1, 0)),
    (CommandId::Username, shape(1, 1)),
    (CommandId::UserLeft, shape(1, 1)),
    (CommandId::UserUpdated, shape(4, 1)),
    (CommandId::Roster, shape(SNAPSHOT_OFFSET, 0)),
    (CommandId::Sections, shape(2, 1)),
    (CommandId::Rating, shape(2, 0)),
    (CommandId::RoomUpdated, shape(1 + ROOM_INTS, ROOM_STRINGS)),
    (CommandId::RoomList, shape(SNAPSHOT_OFFSET, 0)),
    (CommandId::CurrentRoom, shape(2, 0)),
    (CommandId::Seat, shape(5, 0)),
    (CommandId::Turn, shape(5, 0)),
    (CommandId::GameStarted, shape(1, 0)),
    (CommandId::Move, shape(1, 1)),
];

impl CommandId {
    pub fn from_code(code: i64) -> Option<Self> {
        SCHEMA
            .iter()
            .map(|(id, _)| *id)
            .find(|id| *id as i64 == code)
    }

    pub fn shape(&self) -> Shape {
        SCHEMA
            .iter()
            .find(|(id, _)| id == self)
            .map(|(_, shape)| *shape)
            .unwrap_or(shape(1, 0))
    }

    fn name(&self) -> &'static str {
        match self {
            CommandId::Ping => "ping",
            CommandId::Username => "username",
            CommandId::UserLeft => "user_left",
            CommandId::UserUpdated => "user_updated",
            CommandId::Roster => "roster",
            CommandId::Sections => "sections",
            CommandId::Rating => "rating",
            CommandId::RoomUpdated => "room_updated",
            CommandId::RoomList => "room_list",
            CommandId::CurrentRoom => "current_room",
            CommandId::Seat => "seat",
            CommandId::Turn => "turn",
            CommandId::GameStarted => "game_started",
            CommandId::Move => "move",
        }
    }
}

/// A decoded server message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    Ping,
    Username(String),
    UserLeft(String),
    UserUpdated(User),
    Roster(Vec<User>),
    Sections { sections: Vec<String>, selected: usize },
    Rating(i64),
    RoomUpdated(RoomFields),
    RoomList(Vec<RoomFields>),
    CurrentRoom(i64),
    Seat(i64),
    Turn { turn: i64, state: GameState },
    GameStarted { is_white: bool },
    Move(String),
    /// A command id without a schema entry.
    Unknown(i64),
}

impl Inbound {
    pub fn decode(payload: &Payload) -> Result<Self, DecodeError> {
        let code = payload.command().ok_or(DecodeError::Empty)?;
        let Some(id) = CommandId::from_code(code) else {
            return Ok(Inbound::Unknown(code));
        };
        let Shape { ints, strings } = id.shape();
        if payload.i.len() < ints || payload.s.len() < strings {
            return Err(DecodeError::Truncated {
                what: id.name(),
                ints: payload.i.len(),
                strings: payload.s.len(),
            });
        }

        let (i, s) = (&payload.i, &payload.s);
        Ok(match id {
            CommandId::Ping => Inbound::Ping,
            CommandId::Username => Inbound::Username(s[0].clone()),
            CommandId::UserLeft => Inbound::UserLeft(s[0].clone()),
            CommandId::UserUpdated => Inbound::UserUpdated(User {
                name: s[0].clone(),
                id: i[1],
                room_id: i[2],
                rating: i[3],
            }),
            CommandId::Roster => Inbound::Roster(decode_roster(i, s)?),
            CommandId::Sections => decode_sections(i[1], &s[0])?,
            CommandId::Rating => Inbound::Rating(i[1]),
            CommandId::RoomUpdated => Inbound::RoomUpdated(RoomFields::from_slices(&i[1..], s)?),
            CommandId::RoomList => Inbound::RoomList(decode_rooms(i, s)?),
            CommandId::CurrentRoom => Inbound::CurrentRoom(i[1]),
            CommandId::Seat => Inbound::Seat(i[4]),
            CommandId::Turn => Inbound::Turn {
                turn: i[3],
                state: GameState::from_code(i[4]),
            },
            CommandId::GameStarted => Inbound::GameStarted {
                is_white: i.len() == 2,
            },
            CommandId::Move => Inbound::Move(s[0].clone()),
        })
    }
}

fn decode_roster(i: &[i64], s: &[String]) -> Result<Vec<User>, DecodeError> {
    let needed = SNAPSHOT_OFFSET + ROSTER_INTS * s.len();
    if i.len() < needed {
        return Err(DecodeError::Truncated {
            what: "roster",
            ints: i.len(),
            strings: s.len(),
        });
    }
    Ok(s.iter()
        .zip(i[SNAPSHOT_OFFSET..].chunks_exact(ROSTER_INTS))
        .map(|(name, fields)| User {
            name: name.clone(),
            id: fields[0],
            room_id: fields[1],
            rating: fields[2],
        })
        .collect())
}

fn decode_sections(selected: i64, listing: &str) -> Result<Inbound, DecodeError> {
    let sections: Vec<String> = listing
        .split('\n')
        .map(|line| line.split(' ').next().unwrap_or_default().to_string())
        .collect();
    let selected = usize::try_from(selected)
        .ok()
        .filter(|index| *index < sections.len())
        .ok_or(DecodeError::InvalidIndex {
            what: "section",
            index: selected,
        })?;
    Ok(Inbound::Sections { sections, selected })
}

fn decode_rooms(i: &[i64], s: &[String]) -> Result<Vec<RoomFields>, DecodeError> {
    let ints = i[SNAPSHOT_OFFSET..].chunks_exact(ROOM_INTS);
    let strings = s.chunks(ROOM_STRINGS);
    if s.len() < ints.len() * ROOM_STRINGS {
        return Err(DecodeError::Truncated {
            what: "room_list",
            ints: i.len(),
            strings: s.len(),
        });
    }
    ints.zip(strings)
        .map(|(ints, strings)| RoomFields::from_slices(ints, strings))
        .collect()
}

/// A client command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    KeepAlive,
    Login(Vec<String>),
    JoinSection(String),
    CreateRoom,
    JoinRoom(i64),
    LeaveRoom(i64),
    Chat { room: i64, text: String },
    TakeSeat { room: i64, seat: i64 },
    VacateSeat { room: i64, seat: i64 },
    StartMatch(i64),
    Move {
        room: i64,
        encoded: u32,
        /// Thinking time in tenths of a second.
        think_time: i64,
    },
}

impl Outbound {
    /// Asks the room host to remove `name` from the room.
    pub fn kick(room: i64, name: &str) -> Self {
        Outbound::Chat {
            room,
            text: format!("/boot {name}"),
        }
    }

    pub fn to_payload(&self) -> Payload {
        match self {
            Outbound::KeepAlive => Payload::ints(vec![2]),
            Outbound::Login(fields) => Payload::new(vec![1710], fields.clone()),
            Outbound::JoinSection(section) => {
                Payload::new(vec![20], vec![format!("/join {section}")])
            }
            Outbound::CreateRoom => Payload::ints(vec![71]),
            Outbound::JoinRoom(room) => Payload::ints(vec![72, *room]),
            Outbound::LeaveRoom(room) => Payload::ints(vec![73, *room]),
            Outbound::Chat { room, text } => Payload::new(vec![81, *room], vec![text.clone()]),
            Outbound::TakeSeat { room, seat } => Payload::ints(vec![83, *room, *seat]),
            Outbound::VacateSeat { room, seat } => Payload::ints(vec![84, *room, *seat]),
            Outbound::StartMatch(room) => Payload::ints(vec![85, *room]),
            Outbound::Move {
                room,
                encoded,
                think_time,
            } => Payload::ints(vec![92, *room, 1, i64::from(*encoded), *think_time]),
        }
    }
}
