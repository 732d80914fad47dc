//! Perft node counting over `move_piece` / `revert_last_move`.
//!
//! Exercises move generation, application and undo together; counts are
//! compared against published reference values.

use crate::errors::BoardResult;
use crate::game_state::board_state::BoardState;
use crate::game_state::move_record::MoveEffect;
use crate::move_generation::legal_move_generator::all_legal_moves;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerftCounts {
    pub nodes: usize,
    pub captures: usize,
    pub en_passant: usize,
    pub castles: usize,
    pub promotions: usize,
}

impl PerftCounts {
    fn merge(&mut self, rhs: PerftCounts) {
        self.nodes += rhs.nodes;
        self.captures += rhs.captures;
        self.en_passant += rhs.en_passant;
        self.castles += rhs.castles;
        self.promotions += rhs.promotions;
    }
}

/// Leaf count only.
pub fn perft(board: &mut BoardState, depth: u8) -> BoardResult<usize> {
    Ok(perft_counts(board, depth)?.nodes)
}

pub fn perft_counts(board: &mut BoardState, depth: u8) -> BoardResult<PerftCounts> {
    if depth == 0 {
        return Ok(PerftCounts {
            nodes: 1,
            ..PerftCounts::default()
        });
    }

    let mut total = PerftCounts::default();
    for mv in all_legal_moves(board)? {
        let record = board.move_piece(mv)?;
        if depth == 1 {
            total.nodes += 1;
            total.captures += usize::from(record.is_capture());
            total.en_passant += usize::from(matches!(record.effect, MoveEffect::EnPassant(_)));
            total.castles += usize::from(record.is_castle());
            total.promotions += usize::from(record.promotion.is_some());
        } else {
            total.merge(perft_counts(board, depth - 1)?);
        }
        board.revert_last_move()?;
    }

    Ok(total)
}

/// Per-root-move node counts, sorted by move token.
pub fn perft_divide(board: &mut BoardState, depth: u8) -> BoardResult<Vec<(String, usize)>> {
    let mut out = Vec::new();
    if depth == 0 {
        return Ok(out);
    }
    for mv in all_legal_moves(board)? {
        board.move_piece(mv)?;
        out.push((mv.to_string(), perft(board, depth - 1)?));
        board.revert_last_move()?;
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::chess_rules::STARTING_POSITION_FEN;

    const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 0";
    const POSITION_3: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";

    fn board(fen: &str) -> BoardState {
        BoardState::from_fen(fen).expect("FEN should parse")
    }

    #[test]
    fn starting_position_counts() {
        let mut board = board(STARTING_POSITION_FEN);
        assert_eq!(perft(&mut board, 1).expect("perft"), 20);
        assert_eq!(perft(&mut board, 2).expect("perft"), 400);
        assert_eq!(perft(&mut board, 3).expect("perft"), 8_902);
        assert_eq!(board.fen(), STARTING_POSITION_FEN);
    }

    #[test]
    fn kiwipete_counts() {
        let mut board = board(KIWIPETE);
        let depth_one = perft_counts(&mut board, 1).expect("perft");
        assert_eq!(depth_one.nodes, 48);
        assert_eq!(depth_one.captures, 8);
        assert_eq!(depth_one.castles, 2);

        let depth_two = perft_counts(&mut board, 2).expect("perft");
        assert_eq!(depth_two.nodes, 2_039);
        assert_eq!(depth_two.captures, 351);
        assert_eq!(depth_two.en_passant, 1);
        assert_eq!(depth_two.castles, 91);
        assert_eq!(board.fen(), KIWIPETE);
    }

    #[test]
    fn position_three_counts() {
        let mut board = board(POSITION_3);
        assert_eq!(perft(&mut board, 1).expect("perft"), 14);
        assert_eq!(perft(&mut board, 2).expect("perft"), 191);
        assert_eq!(perft(&mut board, 3).expect("perft"), 2_812);
    }

    #[test]
    fn divide_sums_to_perft() {
        let mut board = board(STARTING_POSITION_FEN);
        let divide = perft_divide(&mut board, 2).expect("divide");
        assert_eq!(divide.len(), 20);
        assert!(divide.iter().all(|(_, nodes)| *nodes == 20));
        assert_eq!(divide.iter().map(|(_, n)| n).sum::<usize>(), 400);
    }
}
