//! Attack and check predicates.
//!
//! A square is attacked when any live piece of the opposing color targets it
//! under that piece's movement rule, except that pawns attack along their
//! capture diagonals and never straight ahead.

use crate::game_state::chess_types::*;
use crate::game_state::piece_register::{PieceRecord, PieceRegister};
use crate::move_generation::legal_move_shared::{KING_OFFSETS, KNIGHT_OFFSETS};
use crate::move_generation::legal_moves_pawn::pawn_attack_squares;

/// Whether `square` is attacked by any live piece not of `color`.
pub fn is_square_in_check(pieces: &PieceRegister, square: Square, color: Color) -> bool {
    pieces
        .live_of(color.opposite())
        .any(|(_, attacker)| targets_square(pieces, attacker, square))
}

/// Whether the king of `color` currently stands on an attacked square.
pub fn is_king_in_check(pieces: &PieceRegister, color: Color) -> bool {
    match pieces.king(color) {
        Some(king) => is_square_in_check(pieces, pieces.get(king).square, color),
        None => false,
    }
}

/// Live pieces of the other color attacking `square`.
pub fn attackers_of(pieces: &PieceRegister, square: Square, color: Color) -> Vec<Square> {
    pieces
        .live_of(color.opposite())
        .filter(|(_, attacker)| targets_square(pieces, attacker, square))
        .map(|(_, attacker)| attacker.square)
        .collect()
}

fn targets_square(pieces: &PieceRegister, attacker: &PieceRecord, square: Square) -> bool {
    let from = attacker.square;
    if from == square {
        return false;
    }
    let d_file = square.file() as i8 - from.file() as i8;
    let d_rank = square.rank() as i8 - from.rank() as i8;

    match attacker.kind {
        PieceKind::Pawn => pawn_attack_squares(from, attacker.color).any(|target| target == square),
        PieceKind::Knight => KNIGHT_OFFSETS.contains(&(d_file, d_rank)),
        PieceKind::King => KING_OFFSETS.contains(&(d_file, d_rank)),
        PieceKind::Bishop => d_file.abs() == d_rank.abs() && ray_is_clear(pieces, from, square),
        PieceKind::Rook => (d_file == 0 || d_rank == 0) && ray_is_clear(pieces, from, square),
        PieceKind::Queen => {
            (d_file == 0 || d_rank == 0 || d_file.abs() == d_rank.abs())
                && ray_is_clear(pieces, from, square)
        }
    }
}

/// Every square strictly between two aligned squares is empty.
fn ray_is_clear(pieces: &PieceRegister, from: Square, to: Square) -> bool {
    let step_file = (to.file() as i8 - from.file() as i8).signum();
    let step_rank = (to.rank() as i8 - from.rank() as i8).signum();

    let mut cursor = from;
    while let Some(next) = cursor.offset(step_file, step_rank) {
        if next == to {
            return true;
        }
        if !pieces.is_empty(next) {
            return false;
        }
        cursor = next;
    }
    false
}
