use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::{CellRef, ConnectionId, Participant, RoomCode, Seat},
    error::ApiError,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientRequest {
    CreateRoom,
    JoinRoom {
        room_code: String,
    },
    SetReady {
        ready: bool,
    },
    MakeMove {
        column: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        move_id: Option<Uuid>,
    },
    PlayAgain,
    LeaveRoom,
}

/// Full view of a room's match, sent whenever clients must resync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSnapshot {
    pub room_code: RoomCode,
    /// Rows top to bottom; 0 is empty, otherwise the occupying seat number.
    pub board: Vec<Vec<u8>>,
    pub turn: Seat,
    pub players: Vec<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Seat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_drop: Option<CellRef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ReadySummary {
    pub first_ready: bool,
    pub second_ready: bool,
    pub player_count: usize,
}

impl ReadySummary {
    pub fn all_ready(&self) -> bool {
        self.player_count == 2 && self.first_ready && self.second_ready
    }
}

/// Body of a move submitted over the call path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveCall {
    pub connection_id: ConnectionId,
    pub column: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveReceipt {
    pub room_code: RoomCode,
    pub seat: Seat,
    pub row: usize,
    pub column: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Seat>,
    pub game: GameSnapshot,
    /// Set when the move id was already applied and nothing changed.
    #[serde(default)]
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        connection_id: ConnectionId,
    },
    RoomCreated {
        room_code: RoomCode,
        seat: Seat,
    },
    RoomJoined {
        game: GameSnapshot,
        seat: Seat,
    },
    JoinedWaiting {
        player_count: usize,
    },
    ReadyUpdate {
        ready: ReadySummary,
    },
    MatchStart {
        game: GameSnapshot,
    },
    MoveApplied {
        game: GameSnapshot,
        row: usize,
        column: usize,
    },
    MatchOver {
        winner: Seat,
        winner_name: String,
    },
    OpponentLeft,
    RematchState {
        game: GameSnapshot,
    },
    Error(ApiError),
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
