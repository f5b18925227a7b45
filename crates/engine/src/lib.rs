//! Pure match rules: the gravity board and the turn arbiter.
//!
//! Nothing here knows about connections or rooms. [`GameState::submit_move`]
//! is the only way a mark lands on a board outside of tests.

mod board;
mod game;

pub use board::{check_winner, Board, Cell, COLS, ROWS, WIN_LENGTH};
pub use game::{GameState, MoveError, MoveOutcome};
