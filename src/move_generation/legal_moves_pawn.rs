//! Pawn destinations.
//!
//! Forward pushes onto empty squares only, diagonal steps only onto an
//! opponent or the live en-passant target. Promotion classes are expanded by
//! the caller once a destination lands on the final rank.

use crate::game_state::chess_types::*;
use crate::game_state::piece_register::{PieceRecord, PieceRegister};

/// Rank index of the en-passant target a pawn of `color` may capture onto.
#[inline]
pub const fn en_passant_capture_rank(color: Color) -> u8 {
    match color {
        Color::Light => 5,
        Color::Dark => 2,
    }
}

pub fn generate_pawn_targets(
    pieces: &PieceRegister,
    pawn: &PieceRecord,
    en_passant: Option<Square>,
    out: &mut Vec<Square>,
) {
    let forward = pawn.color.forward();

    if let Some(one_step) = pawn.square.offset(0, forward) {
        if pieces.is_empty(one_step) {
            out.push(one_step);
            if !pawn.deployed {
                if let Some(two_step) = one_step.offset(0, forward) {
                    if pieces.is_empty(two_step) {
                        out.push(two_step);
                    }
                }
            }
        }
    }

    for to in pawn_attack_squares(pawn.square, pawn.color) {
        match pieces.color_at(to) {
            Some(occupant) if occupant != pawn.color => out.push(to),
            None if en_passant == Some(to) && has_en_passant_victim(pieces, pawn, to) => out.push(to),
            _ => {}
        }
    }
}

/// A FEN may name a target with nothing capturable behind it; only an enemy
/// pawn beside `pawn` on the target's file can be taken en passant.
fn has_en_passant_victim(pieces: &PieceRegister, pawn: &PieceRecord, to: Square) -> bool {
    if to.rank() != en_passant_capture_rank(pawn.color) {
        return false;
    }
    pieces
        .at(Square::at(to.file(), pawn.square.rank()))
        .is_some_and(|victim| victim.kind == PieceKind::Pawn && victim.color != pawn.color)
}

/// The (up to two) squares a pawn on `square` attacks.
pub fn pawn_attack_squares(square: Square, color: Color) -> impl Iterator<Item = Square> {
    let forward = color.forward();
    [-1i8, 1]
        .into_iter()
        .filter_map(move |d_file| square.offset(d_file, forward))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(pieces: &PieceRegister, square: Square, en_passant: Option<Square>) -> Vec<Square> {
        let id = pieces.id_at(square).expect("pawn on square");
        let mut out = Vec::new();
        generate_pawn_targets(pieces, pieces.get(id), en_passant, &mut out);
        out.sort();
        out
    }

    #[test]
    fn undeployed_pawn_double_steps_unless_blocked() {
        let mut pieces = PieceRegister::new();
        pieces.add(Color::Light, PieceKind::Pawn, Square::at(4, 1));
        assert_eq!(
            targets(&pieces, Square::at(4, 1), None),
            vec![Square::at(4, 2), Square::at(4, 3)]
        );

        pieces.add(Color::Dark, PieceKind::Knight, Square::at(4, 3));
        assert_eq!(targets(&pieces, Square::at(4, 1), None), vec![Square::at(4, 2)]);

        pieces.add(Color::Dark, PieceKind::Knight, Square::at(4, 2));
        assert!(targets(&pieces, Square::at(4, 1), None).is_empty());
    }

    #[test]
    fn diagonals_need_an_opponent_or_the_en_passant_target() {
        let mut pieces = PieceRegister::new();
        let e5 = Square::at(4, 4);
        let id = pieces.add(Color::Light, PieceKind::Pawn, e5);
        pieces.get_mut(id).deployed = true;
        pieces.add(Color::Dark, PieceKind::Pawn, Square::at(3, 4));
        pieces.add(Color::Dark, PieceKind::Bishop, Square::at(5, 5));

        assert_eq!(
            targets(&pieces, e5, Some(Square::at(3, 5))),
            vec![Square::at(3, 5), Square::at(4, 5), Square::at(5, 5)]
        );
        assert_eq!(targets(&pieces, e5, None), vec![Square::at(4, 5), Square::at(5, 5)]);
    }

    #[test]
    fn en_passant_target_without_an_enemy_pawn_behind_it_is_ignored() {
        let mut pieces = PieceRegister::new();
        let e5 = Square::at(4, 4);
        let d6 = Square::at(3, 5);
        let id = pieces.add(Color::Light, PieceKind::Pawn, e5);
        pieces.get_mut(id).deployed = true;
        assert_eq!(targets(&pieces, e5, Some(d6)), vec![Square::at(4, 5)]);

        pieces.add(Color::Light, PieceKind::Pawn, Square::at(3, 4));
        assert_eq!(targets(&pieces, e5, Some(d6)), vec![Square::at(4, 5)]);

        let mut pieces = PieceRegister::new();
        let id = pieces.add(Color::Light, PieceKind::Pawn, e5);
        pieces.get_mut(id).deployed = true;
        pieces.add(Color::Dark, PieceKind::Knight, Square::at(3, 4));
        assert_eq!(targets(&pieces, e5, Some(d6)), vec![Square::at(4, 5)]);
    }

    #[test]
    fn dark_pawns_move_down_the_board() {
        let mut pieces = PieceRegister::new();
        pieces.add(Color::Dark, PieceKind::Pawn, Square::at(0, 6));
        assert_eq!(
            targets(&pieces, Square::at(0, 6), None),
            vec![Square::at(0, 4), Square::at(0, 5)]
        );
    }
}
