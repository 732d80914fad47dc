use crate::game_state::chess_types::*;
use crate::game_state::piece_register::PieceRegister;
use crate::move_generation::legal_move_shared::{check_linear_targets, ALL_DIRECTIONS};

pub fn generate_queen_targets(pieces: &PieceRegister, from: Square, color: Color, out: &mut Vec<Square>) {
    check_linear_targets(pieces, from, color, &ALL_DIRECTIONS, out);
}
