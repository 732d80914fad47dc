//! Square conversions for algebraic coordinates.
//!
//! Converts between human-readable coordinates (e.g., `e4`) and `Square`
//! values reused by the FEN codec and UCI move tokens.

use crate::errors::{BoardError, BoardResult};
use crate::game_state::chess_types::Square;

/// Convert algebraic notation (for example: "e4") to a square.
#[inline]
pub fn algebraic_to_square(square: &str) -> BoardResult<Square> {
    let bytes = square.as_bytes();
    if bytes.len() != 2 {
        return Err(BoardError::InvalidSquare {
            text: square.to_owned(),
        });
    }

    let file = bytes[0];
    let rank = bytes[1];

    if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
        return Err(BoardError::InvalidSquare {
            text: square.to_owned(),
        });
    }

    Square::new(file - b'a', rank - b'1')
}

/// Convert a square to algebraic notation (for example: "e4").
#[inline]
pub fn square_to_algebraic(square: Square) -> String {
    square.to_string()
}
