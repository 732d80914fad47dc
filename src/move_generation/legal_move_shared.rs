//! Shared targeting primitives for the per-piece generators.

use crate::game_state::chess_types::*;
use crate::game_state::piece_register::PieceRegister;

pub const ORTHOGONAL_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
pub const DIAGONAL_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
pub const ALL_DIRECTIONS: [(i8, i8); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

pub const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// Adjacent squares, shared by king movement and king attacks.
pub const KING_OFFSETS: [(i8, i8); 8] = ALL_DIRECTIONS;

/// True when `square` is empty or holds a live piece of the other color.
#[inline]
pub fn empty_or_opponent(pieces: &PieceRegister, square: Square, color: Color) -> bool {
    pieces.color_at(square) != Some(color)
}

/// Walk each direction from `from` until the board edge or a blocker.
///
/// A friendly blocker ends the ray without being added; an opponent is added
/// and then ends the ray.
pub fn check_linear_targets(
    pieces: &PieceRegister,
    from: Square,
    color: Color,
    directions: &[(i8, i8)],
    out: &mut Vec<Square>,
) {
    for &(d_file, d_rank) in directions {
        let mut cursor = from;
        while let Some(next) = cursor.offset(d_file, d_rank) {
            match pieces.color_at(next) {
                None => out.push(next),
                Some(occupant) => {
                    if occupant != color {
                        out.push(next);
                    }
                    break;
                }
            }
            cursor = next;
        }
    }
}

/// Fixed-offset jumps (knight, king step) filtered by bounds and occupancy.
pub fn check_offset_targets(
    pieces: &PieceRegister,
    from: Square,
    color: Color,
    offsets: &[(i8, i8)],
    out: &mut Vec<Square>,
) {
    out.extend(
        offsets
            .iter()
            .filter_map(|&(d_file, d_rank)| from.offset(d_file, d_rank))
            .filter(|&to| empty_or_opponent(pieces, to, color)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rays_stop_at_blockers() {
        let mut pieces = PieceRegister::new();
        let d4 = Square::at(3, 3);
        pieces.add(Color::Light, PieceKind::Rook, d4);
        pieces.add(Color::Light, PieceKind::Pawn, Square::at(3, 5));
        pieces.add(Color::Dark, PieceKind::Knight, Square::at(5, 3));

        let mut out = Vec::new();
        check_linear_targets(&pieces, d4, Color::Light, &ORTHOGONAL_DIRECTIONS, &mut out);

        // d5 then blocked by own pawn on d6; e4 then capture on f4.
        assert!(out.contains(&Square::at(3, 4)));
        assert!(!out.contains(&Square::at(3, 5)));
        assert!(out.contains(&Square::at(5, 3)));
        assert!(!out.contains(&Square::at(6, 3)));
        assert_eq!(out.len(), 1 + 2 + 3 + 3);
    }

    #[test]
    fn corner_knight_has_two_jumps() {
        let pieces = PieceRegister::new();
        let mut out = Vec::new();
        check_offset_targets(&pieces, Square::at(0, 0), Color::Light, &KNIGHT_OFFSETS, &mut out);
        out.sort();
        assert_eq!(out, vec![Square::at(1, 2), Square::at(2, 1)]);
    }
}
