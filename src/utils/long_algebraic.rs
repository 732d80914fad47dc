//! Coordinate move tokens (`e2e4`, `d7d8q`) as used on the UCI wire.

use crate::errors::{BoardError, BoardResult};
use crate::game_state::board_state::BoardState;
use crate::game_state::chess_types::*;
use crate::game_state::move_record::{MoveRecord, MoveRequest};
use crate::utils::algebraic::algebraic_to_square;

pub fn move_to_long_algebraic(mv: &MoveRequest) -> String {
    mv.to_string()
}

pub fn record_to_long_algebraic(record: &MoveRecord) -> String {
    record.request().to_string()
}

/// Syntax-only decode: two squares and an optional lowercase promotion letter.
pub fn parse_uci_token(token: &str) -> BoardResult<MoveRequest> {
    if !token.is_ascii() || (token.len() != 4 && token.len() != 5) {
        return Err(BoardError::invalid_token(token, "expected 4 or 5 characters"));
    }

    let from = algebraic_to_square(&token[0..2])
        .map_err(|_| BoardError::invalid_token(token, "bad start square"))?;
    let to = algebraic_to_square(&token[2..4])
        .map_err(|_| BoardError::invalid_token(token, "bad end square"))?;
    if from == to {
        return Err(BoardError::invalid_token(token, "start and end squares are equal"));
    }

    let promotion = match token[4..].chars().next() {
        None => None,
        Some(ch) => Some(char_to_promotion(ch).ok_or_else(|| {
            BoardError::invalid_token(token, format!("invalid promotion letter '{ch}'"))
        })?),
    };

    Ok(MoveRequest { from, to, promotion })
}

/// Decode `token` against `board`, checking the mover and the promotion suffix.
///
/// Legality against check is not examined here.
pub fn long_algebraic_to_move(token: &str, board: &BoardState) -> BoardResult<MoveRequest> {
    let mv = parse_uci_token(token)?;

    let piece = board
        .piece_at(mv.from)
        .ok_or(BoardError::NoPieceOnSquare { square: mv.from })?;
    if piece.color != board.side_to_move() {
        return Err(BoardError::NotSideToMove { square: mv.from });
    }

    let reaches_last_rank = piece.kind == PieceKind::Pawn && mv.to.rank() == piece.color.promotion_rank();
    match (mv.promotion, reaches_last_rank) {
        (Some(_), false) => Err(BoardError::invalid_token(
            token,
            "only a pawn reaching the last rank may promote",
        )),
        (None, true) => Err(BoardError::invalid_token(token, "missing promotion letter")),
        _ => Ok(mv),
    }
}

fn char_to_promotion(ch: char) -> Option<PieceKind> {
    PieceKind::from_lower_char(ch).filter(|kind| kind.is_promotion_target())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BoardError;

    #[test]
    fn parses_plain_and_promotion_tokens() {
        let mv = parse_uci_token("e2e4").expect("token should parse");
        assert_eq!(mv.to_string(), "e2e4");
        assert_eq!(mv.promotion, None);

        let mv = parse_uci_token("d7d8q").expect("token should parse");
        assert_eq!(mv.promotion, Some(PieceKind::Queen));
        assert_eq!(move_to_long_algebraic(&mv), "d7d8q");
    }

    #[test]
    fn rejects_malformed_tokens() {
        for token in ["", "e2", "e2e", "e2e4qq", "i2e4", "e2e9", "e7e8k", "e7e8Q", "e2e2", "é2e4"] {
            assert!(
                matches!(parse_uci_token(token), Err(BoardError::InvalidMoveToken { .. })),
                "{token} should be rejected"
            );
        }
    }

    #[test]
    fn board_checks_mover_and_promotion() {
        let board = BoardState::from_fen("4k3/P7/8/8/8/8/4P3/4K3 w - - 0 1").expect("FEN should parse");
        assert!(long_algebraic_to_move("e2e4", &board).is_ok());
        assert!(long_algebraic_to_move("a7a8n", &board).is_ok());
        assert!(long_algebraic_to_move("a7a8", &board).is_err());
        assert!(long_algebraic_to_move("e2e3q", &board).is_err());
        assert!(matches!(
            long_algebraic_to_move("e8d8", &board),
            Err(BoardError::NotSideToMove { .. })
        ));
        assert!(matches!(
            long_algebraic_to_move("c3c4", &board),
            Err(BoardError::NoPieceOnSquare { .. })
        ));
    }

    #[test]
    fn records_render_with_promotion() {
        let mut board = BoardState::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").expect("FEN should parse");
        let mv = long_algebraic_to_move("a7a8r", &board).expect("token should decode");
        let record = board.move_piece(mv).expect("move applies");
        assert_eq!(record_to_long_algebraic(&record), "a7a8r");
    }
}
