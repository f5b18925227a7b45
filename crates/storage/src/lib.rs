use std::collections::HashMap;

use chrono::{DateTime, Utc};
use engine::{GameState, MoveError};
use shared::{
    domain::{ConnectionId, Participant, RoomCode, Seat},
    error::{ApiError, ErrorCode},
    protocol::{GameSnapshot, MoveReceipt, ReadySummary},
};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

mod codes;
mod readiness;

pub use codes::{CodeGenerator, RandomCodes, ScriptedCodes};
pub use readiness::{MatchPhase, Readiness};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not in a room")]
    NotInRoom,
    #[error("room not found")]
    RoomNotFound,
    #[error("room is full")]
    RoomFull,
    #[error("player not found in room")]
    SeatNotFound,
    #[error(transparent)]
    Move(#[from] MoveError),
}

impl StoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::NotInRoom => ErrorCode::NotInRoom,
            StoreError::RoomNotFound => ErrorCode::RoomNotFound,
            StoreError::RoomFull => ErrorCode::RoomFull,
            StoreError::SeatNotFound => ErrorCode::SeatNotFound,
            StoreError::Move(err) => err.code(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        ApiError::new(value.code(), value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Play {
    Applied(MoveReceipt),
    /// The move id matched one the caller already had accepted this match;
    /// nothing changed.
    Replayed(MoveReceipt),
}

/// One match between at most two connections.
///
/// `connected` and the game's participant list describe the same people
/// and are only ever changed together.
#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    game: GameState,
    connected: Vec<ConnectionId>,
    readiness: Readiness,
    seats_issued: usize,
    /// Every accepted move id per connection for the current match.
    accepted_moves: HashMap<ConnectionId, HashMap<Uuid, MoveReceipt>>,
    created_at: DateTime<Utc>,
}

impl Room {
    fn new(code: RoomCode) -> Self {
        Self {
            game: GameState::new(code.clone()),
            code,
            connected: Vec::with_capacity(2),
            readiness: Readiness::default(),
            seats_issued: 0,
            accepted_moves: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn occupants(&self) -> &[ConnectionId] {
        &self.connected
    }

    pub fn phase(&self) -> MatchPhase {
        self.readiness.phase()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.game.snapshot()
    }

    pub fn ready_summary(&self) -> ReadySummary {
        self.readiness.summary(&self.game, self.connected.len())
    }

    pub fn seat_of(&self, connection_id: ConnectionId) -> Option<Seat> {
        self.game.seat_of(connection_id)
    }

    /// True when the connected list and the seated players name the same
    /// identities.
    pub fn is_consistent(&self) -> bool {
        self.connected.len() == self.game.players().len()
            && self
                .connected
                .iter()
                .all(|id| self.game.seat_of(*id).is_some())
    }

    /// Seats are handed out once each; a vacated seat stays vacated.
    fn next_seat(&self) -> Option<Seat> {
        if self.connected.len() >= 2 {
            return None;
        }
        match self.seats_issued {
            0 => Some(Seat::First),
            1 => Some(Seat::Second),
            _ => None,
        }
    }

    fn admit(&mut self, connection_id: ConnectionId, seat: Seat) {
        let seated = self.game.seat_participant(Participant {
            connection_id,
            seat,
        });
        if seated {
            self.connected.push(connection_id);
            self.seats_issued += 1;
        }
        debug_assert!(self.is_consistent());
    }

    fn release(&mut self, connection_id: ConnectionId) -> Option<Seat> {
        self.connected.retain(|id| *id != connection_id);
        let seat = self
            .game
            .remove_participant(connection_id)
            .map(|participant| participant.seat);
        self.readiness.forget(connection_id);
        self.accepted_moves.remove(&connection_id);
        debug_assert!(self.is_consistent());
        seat
    }

    fn set_ready(&mut self, connection_id: ConnectionId, ready: bool) -> (ReadySummary, bool) {
        self.readiness.set(connection_id, ready);
        let summary = self.ready_summary();
        let started = self.readiness.try_start(&summary);
        (summary, started)
    }

    /// Routes a drop from `connection_id` through the arbiter.
    ///
    /// A `move_id` the caller already had accepted during this match replays
    /// the stored receipt instead of invoking the arbiter again.
    pub fn play(
        &mut self,
        connection_id: ConnectionId,
        column: usize,
        move_id: Option<Uuid>,
    ) -> Result<Play, StoreError> {
        let seat = self
            .game
            .seat_of(connection_id)
            .ok_or(StoreError::SeatNotFound)?;

        if let Some(recorded) = move_id.and_then(|id| self.accepted_receipt(connection_id, id)) {
            let mut receipt = recorded.clone();
            receipt.replayed = true;
            return Ok(Play::Replayed(receipt));
        }

        let outcome = self.game.submit_move(column, seat)?;
        let receipt = MoveReceipt {
            room_code: self.code.clone(),
            seat: outcome.seat,
            row: outcome.row,
            column: outcome.column,
            winner: outcome.winner,
            game: self.game.snapshot(),
            replayed: false,
        };
        if let Some(move_id) = move_id {
            self.accepted_moves
                .entry(connection_id)
                .or_default()
                .insert(move_id, receipt.clone());
        }
        Ok(Play::Applied(receipt))
    }

    fn accepted_receipt(&self, connection_id: ConnectionId, move_id: Uuid) -> Option<&MoveReceipt> {
        self.accepted_moves.get(&connection_id)?.get(&move_id)
    }

    pub fn reset_for_rematch(&mut self) {
        self.game.reset_for_rematch();
        self.accepted_moves.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room_code: RoomCode,
    pub seat: Option<Seat>,
    pub remaining: Vec<ConnectionId>,
    pub room_closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRoom {
    pub room_code: RoomCode,
    pub departed: Option<Departure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRoom {
    pub room_code: RoomCode,
    pub seat: Seat,
    pub game: GameSnapshot,
    pub occupants: Vec<ConnectionId>,
    pub ready: ReadySummary,
    pub started: bool,
    pub departed: Option<Departure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyChange {
    pub room_code: RoomCode,
    pub occupants: Vec<ConnectionId>,
    pub ready: ReadySummary,
    pub started: bool,
    pub game: GameSnapshot,
}

/// Process-wide registry of live rooms plus the connection-to-room index.
///
/// Both maps are updated together by every mutating method, so callers
/// never observe one without the other.
pub struct RoomStore {
    rooms: HashMap<RoomCode, Room>,
    sessions: HashMap<ConnectionId, RoomCode>,
    codes: Box<dyn CodeGenerator>,
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomStore {
    pub fn new() -> Self {
        Self::with_generator(RandomCodes)
    }

    pub fn with_generator(codes: impl CodeGenerator + 'static) -> Self {
        Self {
            rooms: HashMap::new(),
            sessions: HashMap::new(),
            codes: Box::new(codes),
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room(&self, room_code: &RoomCode) -> Option<&Room> {
        self.rooms.get(room_code)
    }

    pub fn room_mut(&mut self, room_code: &RoomCode) -> Option<&mut Room> {
        self.rooms.get_mut(room_code)
    }

    pub fn room_of(&self, connection_id: ConnectionId) -> Option<&RoomCode> {
        self.sessions.get(&connection_id)
    }

    /// Room the connection is indexed to, failing with `NotInRoom`.
    pub fn resolve(&self, connection_id: ConnectionId) -> Result<RoomCode, StoreError> {
        let room_code = self
            .sessions
            .get(&connection_id)
            .ok_or(StoreError::NotInRoom)?;
        if !self.rooms.contains_key(room_code) {
            return Err(StoreError::RoomNotFound);
        }
        Ok(room_code.clone())
    }

    pub fn create_room(&mut self, creator: ConnectionId) -> CreatedRoom {
        let departed = self.leave(creator);
        let room_code = loop {
            let candidate = self.codes.generate();
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        let mut room = Room::new(room_code.clone());
        room.admit(creator, Seat::First);
        self.rooms.insert(room_code.clone(), room);
        self.sessions.insert(creator, room_code.clone());
        info!(%room_code, connection_id = %creator, "room created");

        CreatedRoom {
            room_code,
            departed,
        }
    }

    pub fn join_room(
        &mut self,
        raw_code: &str,
        joiner: ConnectionId,
    ) -> Result<JoinedRoom, StoreError> {
        let room_code = RoomCode::parse(raw_code).map_err(|_| StoreError::RoomNotFound)?;
        let room = self
            .rooms
            .get(&room_code)
            .ok_or(StoreError::RoomNotFound)?;
        if room.connected.contains(&joiner) {
            return Err(StoreError::RoomFull);
        }
        let seat = room.next_seat().ok_or(StoreError::RoomFull)?;

        let departed = self.leave(joiner);
        let room = self
            .rooms
            .get_mut(&room_code)
            .ok_or(StoreError::RoomNotFound)?;
        room.admit(joiner, seat);
        let ready = room.ready_summary();
        let started = room.readiness.try_start(&ready);
        let joined = JoinedRoom {
            room_code: room_code.clone(),
            seat,
            game: room.snapshot(),
            occupants: room.connected.clone(),
            ready,
            started,
            departed,
        };
        self.sessions.insert(joiner, room_code.clone());
        info!(%room_code, connection_id = %joiner, %seat, "player joined room");
        Ok(joined)
    }

    pub fn set_ready(
        &mut self,
        connection_id: ConnectionId,
        ready: bool,
    ) -> Result<ReadyChange, StoreError> {
        let room_code = self.resolve(connection_id)?;
        let room = self
            .rooms
            .get_mut(&room_code)
            .ok_or(StoreError::RoomNotFound)?;
        if room.seat_of(connection_id).is_none() {
            return Err(StoreError::SeatNotFound);
        }
        let (summary, started) = room.set_ready(connection_id, ready);
        if started {
            info!(%room_code, "match started");
        }
        Ok(ReadyChange {
            occupants: room.connected.clone(),
            game: room.snapshot(),
            room_code,
            ready: summary,
            started,
        })
    }

    /// Removes the connection from its room. Empty rooms are deleted on
    /// the spot. Returns `None` when the connection was not in a room.
    pub fn leave(&mut self, connection_id: ConnectionId) -> Option<Departure> {
        let room_code = self.sessions.remove(&connection_id)?;
        let Some(room) = self.rooms.get_mut(&room_code) else {
            warn!(%room_code, %connection_id, "session pointed at a missing room");
            return None;
        };
        let seat = room.release(connection_id);
        let remaining = room.connected.clone();
        let room_closed = remaining.is_empty();
        if room_closed {
            if let Some(room) = self.rooms.remove(&room_code) {
                let lifetime = Utc::now() - room.created_at;
                info!(
                    %room_code,
                    lifetime_secs = lifetime.num_seconds(),
                    "room deleted (empty)"
                );
            }
        }
        Some(Departure {
            room_code,
            seat,
            remaining,
            room_closed,
        })
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
