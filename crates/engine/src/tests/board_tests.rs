use super::*;

fn stack(board: &mut Board, column: usize, seat: Seat, count: usize) {
    for _ in 0..count {
        board.drop_mark(column, seat).expect("column has room");
    }
}

#[test]
fn fresh_board_is_empty() {
    let board = Board::new();
    for row in 0..ROWS {
        for column in 0..COLS {
            assert_eq!(board.cell(row, column), Some(Cell::Empty));
        }
    }
    assert!(board.to_wire().iter().flatten().all(|value| *value == 0));
}

#[test]
fn marks_settle_from_the_bottom_row() {
    let mut board = Board::new();
    assert_eq!(board.open_row(3), Some(ROWS - 1));
    assert_eq!(board.drop_mark(3, Seat::First), Some(ROWS - 1));
    assert_eq!(board.drop_mark(3, Seat::Second), Some(ROWS - 2));
    assert_eq!(board.open_row(3), Some(ROWS - 3));
    assert_eq!(board.cell(ROWS - 1, 3), Some(Cell::Taken(Seat::First)));
    assert_eq!(board.to_wire()[ROWS - 2][3], 2);
}

#[test]
fn full_column_has_no_open_row() {
    let mut board = Board::new();
    stack(&mut board, 0, Seat::First, ROWS);
    assert_eq!(board.open_row(0), None);
    assert_eq!(board.drop_mark(0, Seat::Second), None);
}

#[test]
fn out_of_range_column_has_no_open_row() {
    let board = Board::new();
    assert_eq!(board.open_row(COLS), None);
    assert_eq!(board.cell(ROWS, 0), None);
}

#[test]
fn horizontal_five_wins_at_either_open_end() {
    let mut board = Board::new();
    for column in 1..5 {
        board.drop_mark(column, Seat::First);
    }
    let bottom = ROWS - 1;

    let mut left = board.clone();
    left.drop_mark(0, Seat::First);
    assert!(check_winner(&left, bottom, 0, Seat::First));

    let mut right = board.clone();
    right.drop_mark(5, Seat::First);
    assert!(check_winner(&right, bottom, 5, Seat::First));
}

#[test]
fn four_in_a_row_is_not_a_win() {
    let mut board = Board::new();
    for column in 0..4 {
        board.drop_mark(column, Seat::First);
    }
    assert!(!check_winner(&board, ROWS - 1, 3, Seat::First));
}

#[test]
fn gap_filled_later_completes_the_run() {
    let mut board = Board::new();
    let bottom = ROWS - 1;
    for column in [0, 1, 2, 3, 5] {
        board.drop_mark(column, Seat::First);
    }
    assert!(!check_winner(&board, bottom, 5, Seat::First));

    board.drop_mark(4, Seat::First);
    assert!(check_winner(&board, bottom, 4, Seat::First));
}

#[test]
fn vertical_five_wins() {
    let mut board = Board::new();
    stack(&mut board, 4, Seat::Second, 4);
    assert!(!check_winner(&board, ROWS - 4, 4, Seat::Second));
    let row = board.drop_mark(4, Seat::Second).expect("room");
    assert!(check_winner(&board, row, 4, Seat::Second));
}

#[test]
fn rising_diagonal_wins() {
    let mut board = Board::new();
    for column in 1..5 {
        stack(&mut board, column, Seat::Second, column);
    }
    let mut last = (0, 0);
    for column in 0..5 {
        let row = board.drop_mark(column, Seat::First).expect("room");
        last = (row, column);
    }
    assert_eq!(last, (ROWS - 5, 4));
    assert!(check_winner(&board, last.0, last.1, Seat::First));
    assert!(check_winner(&board, ROWS - 1, 0, Seat::First));
}

#[test]
fn falling_diagonal_wins() {
    let mut board = Board::new();
    for column in 0..4 {
        stack(&mut board, column, Seat::Second, 4 - column);
    }
    let mut middle = (0, 0);
    for column in 0..5 {
        let row = board.drop_mark(column, Seat::First).expect("room");
        if column == 2 {
            middle = (row, column);
        }
    }
    assert!(check_winner(&board, middle.0, middle.1, Seat::First));
}

#[test]
fn scan_stops_at_the_board_edge() {
    let mut board = Board::new();
    for column in COLS - 4..COLS {
        board.drop_mark(column, Seat::First);
    }
    assert!(!check_winner(&board, ROWS - 1, COLS - 1, Seat::First));
}

#[test]
fn run_of_the_other_seat_does_not_count() {
    let mut board = Board::new();
    for column in 0..5 {
        board.drop_mark(column, Seat::First);
    }
    assert!(!check_winner(&board, ROWS - 1, 4, Seat::Second));
}

#[test]
fn verdicts_are_fixed_at_placement_time() {
    let mut board = Board::new();
    let bottom = ROWS - 1;
    let mut verdicts = Vec::new();
    for column in 0..5 {
        board.drop_mark(column, Seat::First);
        verdicts.push(check_winner(&board, bottom, column, Seat::First));
    }
    assert_eq!(verdicts, vec![false, false, false, false, true]);
    let recorded = verdicts.clone();

    board.drop_mark(5, Seat::First);
    assert!(check_winner(&board, bottom, 5, Seat::First));
    assert_eq!(verdicts, recorded);
    assert_eq!(board.to_wire()[bottom][..6], [1, 1, 1, 1, 1, 1]);
}
