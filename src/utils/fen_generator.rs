use crate::game_state::chess_types::*;
use crate::game_state::piece_register::PieceRegister;

/// Placement field for the live pieces of a register.
pub fn generate_board_field(pieces: &PieceRegister) -> String {
    let mut out = String::new();

    for rank in (0..8u8).rev() {
        let mut empty_count = 0u8;

        for file in 0..8u8 {
            match pieces.at(Square::at(file, rank)) {
                Some(piece) => {
                    if empty_count > 0 {
                        out.push(char::from(b'0' + empty_count));
                        empty_count = 0;
                    }
                    out.push(piece.kind.fen_char(piece.color));
                }
                None => empty_count += 1,
            }
        }

        if empty_count > 0 {
            out.push(char::from(b'0' + empty_count));
        }

        if rank > 0 {
            out.push('/');
        }
    }

    out
}

pub fn generate_castling_field(rights: CastlingRights) -> String {
    let mut out = String::new();

    if (rights & CASTLE_LIGHT_KINGSIDE) != 0 {
        out.push('K');
    }
    if (rights & CASTLE_LIGHT_QUEENSIDE) != 0 {
        out.push('Q');
    }
    if (rights & CASTLE_DARK_KINGSIDE) != 0 {
        out.push('k');
    }
    if (rights & CASTLE_DARK_QUEENSIDE) != 0 {
        out.push('q');
    }

    if out.is_empty() {
        out.push('-');
    }

    out
}

pub fn generate_en_passant_field(square: Option<Square>) -> String {
    square.map_or_else(|| "-".to_owned(), |sq| sq.to_string())
}

#[cfg(test)]
mod tests {
    use super::{generate_board_field, generate_castling_field};
    use crate::game_state::chess_rules::STARTING_POSITION_FEN;
    use crate::game_state::chess_types::{CASTLE_DARK_KINGSIDE, CASTLE_LIGHT_QUEENSIDE};
    use crate::game_state::piece_register::PieceRegister;
    use crate::utils::fen_parser::parse_fen;

    #[test]
    fn board_field_matches_decoded_placement() {
        let fen = "r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/2N2N2/PPPP1PPP/R1BQ1RK1 b kq - 4 6";
        for source in [STARTING_POSITION_FEN, fen] {
            let parsed = parse_fen(source).expect("FEN should parse");
            let mut register = PieceRegister::new();
            for (color, kind, square) in parsed.placement {
                register.add(color, kind, square);
            }
            let board = source.split(' ').next().expect("board field");
            assert_eq!(generate_board_field(&register), board);
        }
    }

    #[test]
    fn castling_field_is_ordered() {
        assert_eq!(generate_castling_field(0), "-");
        assert_eq!(
            generate_castling_field(CASTLE_DARK_KINGSIDE | CASTLE_LIGHT_QUEENSIDE),
            "Qk"
        );
    }
}
