use crate::game_state::chess_types::*;
use crate::game_state::piece_register::PieceRegister;
use crate::move_generation::legal_move_shared::{check_offset_targets, KNIGHT_OFFSETS};

pub fn generate_knight_targets(pieces: &PieceRegister, from: Square, color: Color, out: &mut Vec<Square>) {
    check_offset_targets(pieces, from, color, &KNIGHT_OFFSETS, out);
}
