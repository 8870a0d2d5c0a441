//! Command dispatcher.
//!
//! A [Session] receives lobby payloads one at a time, updates its [State] and
//! answers with the messages to send back. It never touches the socket, so the
//! same session can be driven by the [crate::Runner] or directly by tests.
use std::time::Instant;

use kibitz_types::{
    EloChange, GameState, Inbound, Match, MatchResult, MoveCodec, Outbound, Payload, RoomFields,
    User,
};
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::{
    automation::{self, Policy, SeatingDecision, TurnDecision},
    control::{ControlEvent, Query},
    engine::MoveGenerator,
    notice::{InfoSnapshot, Notice},
    state::{Game, State},
    Result,
};

const NOTICE_CAPACITY: usize = 256;

pub struct Session<G> {
    state: State,
    policy: Policy,
    codec: MoveCodec,
    generator: G,
    notices: broadcast::Sender<Notice>,
}

impl<G: MoveGenerator> Session<G> {
    pub fn new(generator: G, policy: Policy) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            state: State::default(),
            policy,
            codec: MoveCodec::new(),
            generator,
            notices,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Notices published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub(crate) fn notices(&self) -> broadcast::Sender<Notice> {
        self.notices.clone()
    }

    /// Decodes and handles one payload from the lobby.
    pub async fn handle(&mut self, payload: &Payload) -> Result<Vec<Outbound>> {
        let inbound = Inbound::decode(payload)?;
        self.dispatch(inbound).await
    }

    pub async fn dispatch(&mut self, inbound: Inbound) -> Result<Vec<Outbound>> {
        let mut out = Vec::new();
        match inbound {
            Inbound::Ping => out.push(Outbound::KeepAlive),
            Inbound::Username(name) => {
                info!(name, "lobby assigned name");
                self.state.player.user.name = name;
            }
            Inbound::UserLeft(name) => {
                self.state.roster.remove(&name);
            }
            Inbound::UserUpdated(user) => self.on_user_updated(user),
            Inbound::Roster(users) => {
                debug!(users = users.len(), "roster snapshot");
                self.state.roster = users
                    .into_iter()
                    .map(|user| (user.name.clone(), user))
                    .collect();
            }
            Inbound::Sections { sections, selected } => self.on_sections(sections, selected),
            Inbound::Rating(rating) => self.on_rating(rating),
            Inbound::RoomUpdated(fields) => self.on_room_updated(fields, &mut out),
            Inbound::RoomList(rooms) => self.on_room_list(rooms),
            Inbound::CurrentRoom(room) => {
                debug!(room, "current room");
                self.state.player.user.room_id = room;
            }
            Inbound::Seat(seat) => {
                debug!(seat, "current seat");
                self.state.player.current_seat = seat;
            }
            Inbound::Turn { turn, state } => self.on_turn(turn, state, &mut out).await?,
            Inbound::GameStarted { is_white } => self.on_game_started(is_white),
            Inbound::Move(san) => self.on_move(&san)?,
            Inbound::Unknown(code) => trace!(code, "ignoring command"),
        }
        Ok(out)
    }

    fn on_user_updated(&mut self, user: User) {
        if user.name == self.state.player.user.name {
            self.state.player.user = user.clone();
        }
        self.state.roster.insert(user.name.clone(), user);
    }

    fn on_sections(&mut self, sections: Vec<String>, selected: usize) {
        let current = sections.get(selected).cloned().unwrap_or_default();
        info!(section = %current, available = sections.len(), "joined section");
        self.state.player.current_section = current;
        self.state.sections = sections;
    }

    fn on_rating(&mut self, rating: i64) {
        self.state.player.user.rating = rating;
        if self.state.player.record_rating(rating) {
            info!(rating, "rating changed");
            self.publish(Notice::RatingAdded(vec![rating]));
        }
    }

    /// Seating automation only runs for our own room once both seats are taken
    /// and no game is running, so updates during play never re-send a start.
    fn on_room_updated(&mut self, fields: RoomFields, out: &mut Vec<Outbound>) {
        let room = fields.resolve(&self.state.roster);
        let id = room.id;
        let ready = room.is_full() && !room.in_game;
        self.state.rooms.insert(id, room);
        if id != self.state.player.user.room_id || !ready {
            return;
        }

        let change = self.state.elo_change();
        match automation::on_room_full(&self.policy, &change) {
            SeatingDecision::VacateOpponent => {
                let seat = automation::opponent_seat(self.state.player.current_seat);
                info!(room = id, seat, win = change.win, "vacating opponent seat");
                out.push(Outbound::VacateSeat { room: id, seat });
            }
            SeatingDecision::Start => {
                info!(room = id, "starting match");
                out.push(Outbound::StartMatch(id));
            }
            SeatingDecision::Nothing => {}
        }
    }

    fn on_room_list(&mut self, rooms: Vec<RoomFields>) {
        let roster = &self.state.roster;
        self.state.rooms = rooms
            .into_iter()
            .map(|fields| {
                let room = fields.resolve(roster);
                (room.id, room)
            })
            .collect();
        debug!(rooms = self.state.rooms.len(), "room list");
    }

    async fn on_turn(&mut self, turn: i64, current: GameState, out: &mut Vec<Outbound>) -> Result<()> {
        if let Some(game) = self.state.game.as_mut() {
            game.turn = turn;
        }
        let last = self.state.last_game_state.replace(current);
        match automation::on_turn(last, current, turn, self.state.player.current_seat) {
            TurnDecision::Move => self.play(out).await?,
            TurnDecision::Settle(result) => self.settle(result, out),
            TurnDecision::Nothing => {}
        }
        Ok(())
    }

    async fn play(&mut self, out: &mut Vec<Outbound>) -> Result<()> {
        let Some(game) = self.state.game.as_mut() else {
            warn!("asked to move without a game in progress");
            return Ok(());
        };
        let ply = game.board.ply();
        if game.answered_ply == Some(ply) {
            debug!(ply, "move already submitted for this position");
            return Ok(());
        }
        game.answered_ply = Some(ply);
        let fen = game.board.fen();

        let depth = self.policy.engine_depth;
        let start = Instant::now();
        let text = self.generator.best_move(&fen, depth).await?;
        let think_time = automation::think_time(start.elapsed());
        let encoded = self.codec.encode_str(&text)?;

        let room = self.state.player.user.room_id;
        info!(room, mv = %text, encoded, think_time, "submitting move");
        out.push(Outbound::Move {
            room,
            encoded,
            think_time,
        });
        Ok(())
    }

    fn settle(&mut self, result: MatchResult, out: &mut Vec<Outbound>) {
        let Some(game) = self.state.game.as_ref() else {
            warn!(?result, "game ended before it started");
            return;
        };
        let change = game.elo_change;
        let opponent = self.state.current_opponent();
        let record = Match {
            player: self.state.player.user.clone(),
            opponent: opponent.clone(),
            result,
            elo_delta: result.delta(&change),
            final_position: game.board.movetext(),
        };
        info!(
            ?result,
            opponent = %opponent.name,
            elo_delta = record.elo_delta,
            "game finished"
        );
        self.state.history.record(record);

        if automation::kick_after(&self.policy, result, &change) && !opponent.name.is_empty() {
            let room = self.state.player.user.room_id;
            info!(room, opponent = %opponent.name, "removing opponent");
            out.push(Outbound::kick(room, &opponent.name));
        }
    }

    fn on_game_started(&mut self, is_white: bool) {
        let change: EloChange = self.state.elo_change();
        info!(is_white, ?change, "game started");
        self.state.game = Some(Game::new(is_white, change));
    }

    fn on_move(&mut self, san: &str) -> Result<()> {
        let Some(game) = self.state.game.as_mut() else {
            warn!(san, "move received without a game in progress");
            return Ok(());
        };
        game.board.play_san(san)?;
        debug!(san, ply = game.board.ply(), "move played");
        Ok(())
    }

    /// Applies a control event, returning the messages it calls for. Events
    /// that do not fit the current lobby state are dropped.
    pub fn control(&mut self, event: ControlEvent) -> Vec<Outbound> {
        if !event.is_well_formed() {
            debug!(?event, "rejected control event");
            return Vec::new();
        }
        let room = self.state.player.user.room_id;
        let out = match &event {
            ControlEvent::AutoStart(value) => {
                self.policy.auto_start = *value;
                Vec::new()
            }
            ControlEvent::KickLowElo(value) => {
                self.policy.kick_low_elo = *value;
                Vec::new()
            }
            ControlEvent::KickIfLose(value) => {
                self.policy.kick_if_lose = *value;
                Vec::new()
            }
            ControlEvent::KickIfDraw(value) => {
                self.policy.kick_if_draw = *value;
                Vec::new()
            }
            ControlEvent::EngineDepth(depth) => {
                self.policy.engine_depth = *depth;
                Vec::new()
            }
            ControlEvent::CreateRoom => vec![Outbound::CreateRoom],
            ControlEvent::JoinSection(section) => {
                if !self.state.sections.contains(section) {
                    debug!(section, "unknown section");
                    return Vec::new();
                }
                vec![Outbound::JoinSection(section.clone())]
            }
            ControlEvent::JoinRoom(id) => {
                if !self.state.rooms.contains_key(id) {
                    debug!(room = id, "unknown room");
                    return Vec::new();
                }
                self.state.player.user.room_id = *id;
                vec![Outbound::JoinRoom(*id)]
            }
            ControlEvent::LeaveRoom | ControlEvent::TakeSeat(_)
                if self.state.current_room().is_none() =>
            {
                debug!(?event, "not in a room");
                return Vec::new();
            }
            ControlEvent::LeaveRoom => {
                self.state.player.user.room_id = 0;
                vec![Outbound::LeaveRoom(room)]
            }
            ControlEvent::TakeSeat(seat) => vec![Outbound::TakeSeat { room, seat: *seat }],
        };
        info!(?event, policy = ?self.policy, "control event applied");
        out
    }

    /// Answers an observer's question from the current state.
    pub fn answer(&self, query: Query) -> Notice {
        match query {
            Query::RatingHistory => {
                Notice::RatingAdded(self.state.player.rating_history().to_vec())
            }
            Query::Info => Notice::Info(InfoSnapshot {
                player: self.state.player.user.clone(),
                section: self.state.player.current_section.clone(),
                seat: self.state.player.current_seat,
                movetext: self
                    .state
                    .game
                    .as_ref()
                    .map(|game| game.board.movetext())
                    .unwrap_or_default(),
                matches: self.state.history.len(),
                net_elo: self.state.history.net_elo(),
            }),
        }
    }

    /// Stops the move generator.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.generator.shutdown().await
    }

    fn publish(&self, notice: Notice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }
}
