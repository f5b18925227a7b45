use shared::{
    domain::{CellRef, ConnectionId, Participant, RoomCode, Seat},
    error::{ApiError, ErrorCode},
    protocol::GameSnapshot,
};
use thiserror::Error;

use crate::board::{check_winner, Board, COLS};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("column {column} is outside the board")]
    ColumnOutOfRange { column: usize },
    #[error("the match is already decided")]
    MatchAlreadyDecided,
    #[error("it is {expected}'s turn, not {claimed}'s")]
    OutOfTurn { expected: Seat, claimed: Seat },
    #[error("column {column} is full")]
    ColumnFull { column: usize },
}

impl MoveError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MoveError::ColumnOutOfRange { .. } => ErrorCode::MalformedRequest,
            MoveError::MatchAlreadyDecided => ErrorCode::MatchAlreadyDecided,
            MoveError::OutOfTurn { .. } => ErrorCode::OutOfTurn,
            MoveError::ColumnFull { .. } => ErrorCode::ColumnFull,
        }
    }
}

impl From<MoveError> for ApiError {
    fn from(value: MoveError) -> Self {
        ApiError::new(value.code(), value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub seat: Seat,
    pub row: usize,
    pub column: usize,
    /// Set only on the move that decided the match.
    pub winner: Option<Seat>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    room_code: RoomCode,
    board: Board,
    turn: Seat,
    players: Vec<Participant>,
    winner: Option<Seat>,
    last_drop: Option<CellRef>,
}

impl GameState {
    pub fn new(room_code: RoomCode) -> Self {
        Self {
            room_code,
            board: Board::new(),
            turn: Seat::First,
            players: Vec::with_capacity(2),
            winner: None,
            last_drop: None,
        }
    }

    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Seat {
        self.turn
    }

    pub fn winner(&self) -> Option<Seat> {
        self.winner
    }

    pub fn last_drop(&self) -> Option<CellRef> {
        self.last_drop
    }

    pub fn players(&self) -> &[Participant] {
        &self.players
    }

    pub fn seat_of(&self, connection_id: ConnectionId) -> Option<Seat> {
        self.players
            .iter()
            .find(|player| player.connection_id == connection_id)
            .map(|player| player.seat)
    }

    pub fn occupant(&self, seat: Seat) -> Option<ConnectionId> {
        self.players
            .iter()
            .find(|player| player.seat == seat)
            .map(|player| player.connection_id)
    }

    /// Seats a participant. Returns false when the seat or the identity is
    /// already present.
    pub fn seat_participant(&mut self, participant: Participant) -> bool {
        let taken = self.players.iter().any(|player| {
            player.seat == participant.seat || player.connection_id == participant.connection_id
        });
        if taken {
            return false;
        }
        self.players.push(participant);
        true
    }

    pub fn remove_participant(&mut self, connection_id: ConnectionId) -> Option<Participant> {
        let index = self
            .players
            .iter()
            .position(|player| player.connection_id == connection_id)?;
        Some(self.players.remove(index))
    }

    /// Applies a drop for `seat`. Rejected moves leave the state untouched.
    pub fn submit_move(&mut self, column: usize, seat: Seat) -> Result<MoveOutcome, MoveError> {
        if column >= COLS {
            return Err(MoveError::ColumnOutOfRange { column });
        }
        if self.winner.is_some() {
            return Err(MoveError::MatchAlreadyDecided);
        }
        if seat != self.turn {
            return Err(MoveError::OutOfTurn {
                expected: self.turn,
                claimed: seat,
            });
        }
        let row = self
            .board
            .drop_mark(column, seat)
            .ok_or(MoveError::ColumnFull { column })?;
        self.last_drop = Some(CellRef { row, column });

        if check_winner(&self.board, row, column, seat) {
            self.winner = Some(seat);
        } else {
            self.turn = seat.other();
        }

        Ok(MoveOutcome {
            seat,
            row,
            column,
            winner: self.winner,
        })
    }

    /// Clears the board for another match between the same two seats.
    pub fn reset_for_rematch(&mut self) {
        self.board = Board::new();
        self.turn = Seat::First;
        self.winner = None;
        self.last_drop = None;
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            room_code: self.room_code.clone(),
            board: self.board.to_wire(),
            turn: self.turn,
            players: self.players.clone(),
            winner: self.winner,
            last_drop: self.last_drop,
        }
    }
}

#[cfg(test)]
#[path = "tests/game_tests.rs"]
mod tests;
