//! FEN decoder.
//!
//! Splits a Forsyth-Edwards Notation string into its six fields and decodes
//! each one. Placement is read rank 8 to rank 1, file a to h; digits are runs
//! of empty squares. The result is a plain value; nothing is applied to a
//! board until decoding has fully succeeded.

use crate::errors::{BoardError, BoardResult};
use crate::game_state::chess_types::*;
use crate::utils::algebraic::algebraic_to_square;

/// A fully decoded FEN string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFen {
    /// Pieces in decode order (rank 8 first, file a first).
    pub placement: Vec<(Color, PieceKind, Square)>,
    pub side_to_move: Color,
    pub castling_rights: CastlingRights,
    pub en_passant_square: Option<Square>,
    pub halfmove_clock: u16,
    pub fullmove_number: u16,
}

/// The six space-separated FEN fields, unparsed.
pub fn split_fields(fen: &str) -> BoardResult<[&str; 6]> {
    let parts: Vec<&str> = fen.split_whitespace().collect();
    match parts.as_slice() {
        [board, side, castling, en_passant, halfmove, fullmove] => {
            Ok([*board, *side, *castling, *en_passant, *halfmove, *fullmove])
        }
        _ => Err(BoardError::invalid_fen(
            fen,
            format!("expected 6 fields, found {}", parts.len()),
        )),
    }
}

pub fn parse_fen(fen: &str) -> BoardResult<ParsedFen> {
    let [board_part, side_part, castling_part, en_passant_part, halfmove_part, fullmove_part] =
        split_fields(fen)?;

    let placement = parse_board(fen, board_part)?;
    for color in [Color::Light, Color::Dark] {
        let kings = placement
            .iter()
            .filter(|(c, kind, _)| *c == color && *kind == PieceKind::King)
            .count();
        if kings != 1 {
            return Err(BoardError::invalid_fen(
                fen,
                format!("expected exactly one {color} king, found {kings}"),
            ));
        }
    }

    Ok(ParsedFen {
        placement,
        side_to_move: parse_side_to_move(fen, side_part)?,
        castling_rights: parse_castling_rights(fen, castling_part)?,
        en_passant_square: parse_en_passant_square(fen, en_passant_part)?,
        halfmove_clock: halfmove_part
            .parse::<u16>()
            .map_err(|_| BoardError::invalid_fen(fen, format!("bad halfmove clock '{halfmove_part}'")))?,
        fullmove_number: fullmove_part
            .parse::<u16>()
            .map_err(|_| BoardError::invalid_fen(fen, format!("bad fullmove number '{fullmove_part}'")))?,
    })
}

fn parse_board(fen: &str, board_part: &str) -> BoardResult<Vec<(Color, PieceKind, Square)>> {
    let ranks: Vec<&str> = board_part.split('/').collect();
    if ranks.len() != 8 {
        return Err(BoardError::invalid_fen(fen, "board layout must contain 8 ranks"));
    }

    let mut placement = Vec::with_capacity(32);
    for (fen_rank_idx, rank_str) in ranks.iter().enumerate() {
        let rank = (7 - fen_rank_idx) as u8;
        let mut file = 0u8;

        for ch in rank_str.chars() {
            if let Some(run) = ch.to_digit(10) {
                if !(1..=8).contains(&run) {
                    return Err(BoardError::invalid_fen(fen, format!("invalid empty-square count '{ch}'")));
                }
                file += run as u8;
                if file > 8 {
                    return Err(BoardError::invalid_fen(fen, format!("rank {} overflows the a-h files", rank + 1)));
                }
                continue;
            }

            let (color, kind) = piece_from_fen_char(ch)
                .ok_or_else(|| BoardError::invalid_fen(fen, format!("invalid piece character '{ch}'")))?;
            let square = Square::new(file, rank).map_err(|_| {
                BoardError::invalid_fen(fen, format!("rank {} overflows the a-h files", rank + 1))
            })?;
            placement.push((color, kind, square));
            file += 1;
        }

        if file != 8 {
            return Err(BoardError::invalid_fen(fen, format!("rank {} does not sum to 8 files", rank + 1)));
        }
    }

    Ok(placement)
}

fn parse_side_to_move(fen: &str, side_part: &str) -> BoardResult<Color> {
    match side_part {
        "w" => Ok(Color::Light),
        "b" => Ok(Color::Dark),
        _ => Err(BoardError::invalid_fen(fen, format!("invalid side-to-move field '{side_part}'"))),
    }
}

pub fn parse_castling_rights(fen: &str, castling_part: &str) -> BoardResult<CastlingRights> {
    if castling_part == "-" {
        return Ok(0);
    }

    let mut rights: CastlingRights = 0;
    for ch in castling_part.chars() {
        match ch {
            'K' => rights |= CASTLE_LIGHT_KINGSIDE,
            'Q' => rights |= CASTLE_LIGHT_QUEENSIDE,
            'k' => rights |= CASTLE_DARK_KINGSIDE,
            'q' => rights |= CASTLE_DARK_QUEENSIDE,
            _ => {
                return Err(BoardError::invalid_fen(fen, format!("invalid castling character '{ch}'")));
            }
        }
    }

    Ok(rights)
}

fn parse_en_passant_square(fen: &str, en_passant_part: &str) -> BoardResult<Option<Square>> {
    if en_passant_part == "-" {
        return Ok(None);
    }

    algebraic_to_square(en_passant_part)
        .map(Some)
        .map_err(|_| BoardError::invalid_fen(fen, format!("invalid en-passant square '{en_passant_part}'")))
}

#[cfg(test)]
mod tests {
    use super::parse_fen;
    use crate::errors::BoardError;
    use crate::game_state::chess_rules::STARTING_POSITION_FEN;
    use crate::game_state::chess_types::*;

    #[test]
    fn parse_starting_fen() {
        let parsed = parse_fen(STARTING_POSITION_FEN).expect("starting FEN should parse");

        assert_eq!(parsed.placement.len(), 32);
        assert_eq!(parsed.side_to_move, Color::Light);
        assert_eq!(parsed.castling_rights, 0b1111);
        assert_eq!(parsed.en_passant_square, None);
        assert_eq!(parsed.fullmove_number, 1);
        assert_eq!(parsed.halfmove_clock, 0);
        assert_eq!(parsed.placement[0], (Color::Dark, PieceKind::Rook, Square::at(0, 7)));
    }

    #[test]
    fn parse_en_passant_and_partial_rights() {
        let parsed = parse_fen("rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w Kq c6 0 2")
            .expect("FEN should parse");
        assert_eq!(parsed.castling_rights, CASTLE_LIGHT_KINGSIDE | CASTLE_DARK_QUEENSIDE);
        assert_eq!(parsed.en_passant_square, Some(Square::at(2, 5)));
        assert_eq!(parsed.fullmove_number, 2);
    }

    #[test]
    fn rejects_malformed_input() {
        let bad = [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 extra",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1",
            "rnbqkbnr/ppppxppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/ppppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQxq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq j3 0 1",
            "rnbqqbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        ];
        for fen in bad {
            assert!(
                matches!(parse_fen(fen), Err(BoardError::InvalidFen { .. })),
                "{fen} should be rejected"
            );
        }
    }
}
