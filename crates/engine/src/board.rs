use shared::domain::Seat;

pub const ROWS: usize = 9;
pub const COLS: usize = 9;
pub const WIN_LENGTH: usize = 5;

const AXES: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Taken(Seat),
}

impl Cell {
    pub fn wire_value(self) -> u8 {
        match self {
            Cell::Empty => 0,
            Cell::Taken(seat) => seat.number(),
        }
    }
}

/// A `ROWS` x `COLS` grid. Row 0 is the top; marks settle toward `ROWS - 1`.
///
/// Cells are only written through [`Board::drop_mark`], which keeps every
/// column packed from the bottom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Board {
    cells: [[Cell; COLS]; ROWS],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<Cell> {
        self.cells.get(row)?.get(column).copied()
    }

    /// Row a mark dropped into `column` would land on, or `None` when the
    /// column is full or does not exist.
    pub fn open_row(&self, column: usize) -> Option<usize> {
        if column >= COLS {
            return None;
        }
        (0..ROWS)
            .rev()
            .find(|&row| self.cells[row][column] == Cell::Empty)
    }

    pub fn drop_mark(&mut self, column: usize, seat: Seat) -> Option<usize> {
        let row = self.open_row(column)?;
        self.cells[row][column] = Cell::Taken(seat);
        Some(row)
    }

    pub fn to_wire(&self) -> Vec<Vec<u8>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.wire_value()).collect())
            .collect()
    }

    fn run_length(&self, row: usize, column: usize, (dr, dc): (isize, isize), seat: Seat) -> usize {
        let target = Cell::Taken(seat);
        let mut count = 0;
        let (mut r, mut c) = (row as isize + dr, column as isize + dc);
        while r >= 0 && c >= 0 && (r as usize) < ROWS && (c as usize) < COLS {
            if self.cells[r as usize][c as usize] != target {
                break;
            }
            count += 1;
            r += dr;
            c += dc;
        }
        count
    }
}

/// True when the mark at (`row`, `column`) completes a run of at least
/// [`WIN_LENGTH`] along any axis through that cell.
///
/// Only the placed cell is scanned, so this must be called once per placement.
pub fn check_winner(board: &Board, row: usize, column: usize, seat: Seat) -> bool {
    if board.cell(row, column) != Some(Cell::Taken(seat)) {
        return false;
    }
    AXES.iter().any(|&(dr, dc)| {
        let forward = board.run_length(row, column, (dr, dc), seat);
        let backward = board.run_length(row, column, (-dr, -dc), seat);
        1 + forward + backward >= WIN_LENGTH
    })
}

#[cfg(test)]
#[path = "tests/board_tests.rs"]
mod tests;
