//! King destinations, including castling candidates.

use crate::game_state::chess_rules::{
    king_home, KINGSIDE_KING_FILE, KINGSIDE_ROOK_FILES, QUEENSIDE_KING_FILE, QUEENSIDE_ROOK_FILES,
};
use crate::game_state::chess_types::*;
use crate::game_state::piece_register::{PieceRecord, PieceRegister};
use crate::move_generation::legal_move_checks::is_square_in_check;
use crate::move_generation::legal_move_shared::{check_offset_targets, KING_OFFSETS};

pub fn generate_king_targets(
    pieces: &PieceRegister,
    king: &PieceRecord,
    rights: CastlingRights,
    out: &mut Vec<Square>,
) {
    check_offset_targets(pieces, king.square, king.color, &KING_OFFSETS, out);
    generate_castling_targets(pieces, king, SideRights::of(rights, king.color), out);
}

/// Append the castling landing squares that are currently available.
///
/// A side that fails any condition is skipped; this never errors.
fn generate_castling_targets(pieces: &PieceRegister, king: &PieceRecord, rights: SideRights, out: &mut Vec<Square>) {
    let color = king.color;
    let home = king_home(color);
    if !rights.any() || king.square != home {
        return;
    }
    if is_square_in_check(pieces, home, color) {
        return;
    }

    let rank = home.rank();
    if rights.king_side
        && rook_in_place(pieces, color, Square::at(KINGSIDE_ROOK_FILES.0, rank))
        && path_is_safe(pieces, color, rank, &[5, 6], &[5, 6])
    {
        out.push(Square::at(KINGSIDE_KING_FILE, rank));
    }
    if rights.queen_side
        && rook_in_place(pieces, color, Square::at(QUEENSIDE_ROOK_FILES.0, rank))
        && path_is_safe(pieces, color, rank, &[1, 2, 3], &[3, 2])
    {
        out.push(Square::at(QUEENSIDE_KING_FILE, rank));
    }
}

fn rook_in_place(pieces: &PieceRegister, color: Color, square: Square) -> bool {
    matches!(pieces.at(square), Some(rook) if rook.kind == PieceKind::Rook && rook.color == color)
}

fn path_is_safe(pieces: &PieceRegister, color: Color, rank: u8, empty_files: &[u8], transit_files: &[u8]) -> bool {
    empty_files
        .iter()
        .all(|&file| pieces.is_empty(Square::at(file, rank)))
        && transit_files
            .iter()
            .all(|&file| !is_square_in_check(pieces, Square::at(file, rank), color))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::board_state::BoardState;

    fn king_targets(fen: &str, color: Color) -> Vec<Square> {
        let board = BoardState::from_fen(fen).expect("FEN should parse");
        let king = board.king(color).expect("king present");
        let mut out = Vec::new();
        generate_king_targets(board.pieces(), board.piece(king), board.castling_rights(), &mut out);
        out
    }

    #[test]
    fn both_castles_when_clear() {
        let out = king_targets("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", Color::Light);
        assert!(out.contains(&Square::at(6, 0)));
        assert!(out.contains(&Square::at(2, 0)));
        assert_eq!(out.len(), 7);
    }

    #[test]
    fn attacked_transit_square_omits_that_side() {
        // Dark rook on f8 covers f1.
        let out = king_targets("4kr2/8/8/8/8/8/8/R3K2R w KQ - 0 1", Color::Light);
        assert!(!out.contains(&Square::at(6, 0)));
        assert!(out.contains(&Square::at(2, 0)));
    }

    #[test]
    fn no_castling_out_of_check_or_without_rights() {
        let out = king_targets("4r1k1/8/8/8/8/8/8/R3K2R w KQ - 0 1", Color::Light);
        assert!(!out.contains(&Square::at(6, 0)));
        assert!(!out.contains(&Square::at(2, 0)));

        let out = king_targets("r3k2r/8/8/8/8/8/8/R3K2R w - - 0 1", Color::Light);
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn queenside_needs_the_knight_square_empty_but_not_safe() {
        let out = king_targets("1r2k3/8/8/8/8/8/8/R3K3 w Q - 0 1", Color::Light);
        assert!(out.contains(&Square::at(2, 0)));

        let out = king_targets("4k3/8/8/8/8/8/8/RN2K3 w Q - 0 1", Color::Light);
        assert!(!out.contains(&Square::at(2, 0)));
    }
}
