//! Canonical chess-rule constants.
//!
//! Static rule-related literals: the standard starting FEN and the home
//! squares used for deployment bookkeeping and castling.

use crate::game_state::chess_types::{Color, PieceKind, Square};

/// Standard chess starting position in Forsyth-Edwards Notation (FEN).
pub const STARTING_POSITION_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Files the king lands on when castling.
pub const KINGSIDE_KING_FILE: u8 = 6;
pub const QUEENSIDE_KING_FILE: u8 = 2;

/// Rook (from, to) files for each castling side.
pub const KINGSIDE_ROOK_FILES: (u8, u8) = (7, 5);
pub const QUEENSIDE_ROOK_FILES: (u8, u8) = (0, 3);

#[inline]
pub const fn king_home(color: Color) -> Square {
    Square::at(4, color.back_rank())
}

#[inline]
pub fn is_rook_home(color: Color, square: Square) -> bool {
    square.rank() == color.back_rank() && (square.file() == 0 || square.file() == 7)
}

/// Whether a freshly decoded piece should count as having already moved.
pub fn starts_deployed(color: Color, kind: PieceKind, square: Square) -> bool {
    match kind {
        PieceKind::Pawn => square.rank() != color.pawn_rank(),
        PieceKind::Rook => !is_rook_home(color, square),
        PieceKind::King => square != king_home(color),
        _ => false,
    }
}

/// Rook (from, to) squares for a castle whose king lands on `king_to`.
pub fn castling_rook_squares(king_from: Square, king_to: Square) -> (Square, Square) {
    let (from_file, to_file) = if king_to.file() > king_from.file() {
        KINGSIDE_ROOK_FILES
    } else {
        QUEENSIDE_ROOK_FILES
    };
    (
        Square::at(from_file, king_from.rank()),
        Square::at(to_file, king_from.rank()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_follows_home_squares() {
        let e2 = Square::at(4, 1);
        let e4 = Square::at(4, 3);
        assert!(!starts_deployed(Color::Light, PieceKind::Pawn, e2));
        assert!(starts_deployed(Color::Light, PieceKind::Pawn, e4));
        assert!(!starts_deployed(Color::Dark, PieceKind::Rook, Square::at(7, 7)));
        assert!(starts_deployed(Color::Dark, PieceKind::Rook, Square::at(7, 0)));
        assert!(!starts_deployed(Color::Light, PieceKind::King, Square::at(4, 0)));
        assert!(starts_deployed(Color::Light, PieceKind::King, Square::at(6, 0)));
        assert!(!starts_deployed(Color::Light, PieceKind::Knight, e4));
    }

    #[test]
    fn castling_rook_squares_for_both_sides() {
        let e1 = king_home(Color::Light);
        let (from, to) = castling_rook_squares(e1, Square::at(6, 0));
        assert_eq!((from.to_string(), to.to_string()), ("h1".to_owned(), "f1".to_owned()));
        let e8 = king_home(Color::Dark);
        let (from, to) = castling_rook_squares(e8, Square::at(2, 7));
        assert_eq!((from.to_string(), to.to_string()), ("a8".to_owned(), "d8".to_owned()));
    }
}
