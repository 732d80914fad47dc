//! Bishop destinations: the four diagonal rays.

use crate::game_state::chess_types::*;
use crate::game_state::piece_register::PieceRegister;
use crate::move_generation::legal_move_shared::{check_linear_targets, DIAGONAL_DIRECTIONS};

pub fn generate_bishop_targets(pieces: &PieceRegister, from: Square, color: Color, out: &mut Vec<Square>) {
    check_linear_targets(pieces, from, color, &DIAGONAL_DIRECTIONS, out);
}
