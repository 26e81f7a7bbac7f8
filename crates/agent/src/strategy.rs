//! Move selection: greedy highest gain.

use rules::{validate, Dir};
use state::GameView;

/// The legal move with the highest gain, or None when every direction is
/// illegal. Ties go to the lowest direction code, so the choice is
/// deterministic for a given board.
pub fn best_move(view: &GameView<'_>, slot: usize) -> Option<Dir> {
    let mut best: Option<(i32, Dir)> = None;
    for dir in Dir::ALL {
        if let Some(gain) = validate(view, slot, dir) {
            match best {
                Some((g, _)) if g >= gain => {}
                _ => best = Some((gain, dir)),
            }
        }
    }
    best.map(|(_, dir)| dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use state::{make_captured, StateHeader};

    fn center_fixture(board: Vec<i32>) -> (StateHeader, Vec<i32>) {
        let mut header = StateHeader::new(3, 3, 1);
        header.agents[0].x = 1;
        header.agents[0].y = 1;
        let mut board = board;
        board[4] = make_captured(0);
        (header, board)
    }

    #[test]
    fn test_picks_highest_gain() {
        let (header, board) = center_fixture(vec![
            1, 2, 3, //
            4, 0, 9, //
            5, 6, 7,
        ]);
        let view = GameView::new(&header, &board);
        // 9 sits east of the center.
        assert_eq!(best_move(&view, 0), Some(Dir::E));
    }

    #[test]
    fn test_tie_breaks_on_lowest_direction_code() {
        let (header, board) = center_fixture(vec![5; 9]);
        let view = GameView::new(&header, &board);
        assert_eq!(best_move(&view, 0), Some(Dir::N));
    }

    #[test]
    fn test_free_cell_beats_nothing() {
        // All neighbors captured except one free cell to the south.
        let (header, mut board) = center_fixture(vec![make_captured(1); 9]);
        board[7] = 0;
        let view = GameView::new(&header, &board);
        assert_eq!(best_move(&view, 0), Some(Dir::S));
    }

    #[test]
    fn test_walled_in_returns_none() {
        let (header, board) = center_fixture(vec![make_captured(1); 9]);
        let view = GameView::new(&header, &board);
        assert_eq!(best_move(&view, 0), None);
    }
}
