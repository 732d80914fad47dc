//! Incremental FEN rewriting.
//!
//! A move is applied to FEN text directly: only the ranks it touches are
//! expanded from run-length form to one byte per square, edited in place, and
//! collapsed back. Every square a move can affect (including the pawn taken
//! en passant and the castling rook) lies on the start or destination rank.
//! The remaining fields (side to move, castling, en passant, clocks) are
//! rewritten from what the edit observed.

use tracing::trace;

use crate::errors::{BoardError, BoardResult};
use crate::game_state::chess_types::*;
use crate::game_state::chess_rules::castling_rook_squares;
use crate::game_state::move_record::MoveRequest;
use crate::utils::fen_generator::{generate_castling_field, generate_en_passant_field};
use crate::utils::fen_parser::{parse_castling_rights, split_fields};

/// Marker for an empty square in an expanded rank.
pub const EMPTY: u8 = b'1';

/// One rank, one byte per square, file a first.
pub type ExpandedRank = [u8; 8];

/// `"3P4"` becomes `b"111P1111"`.
pub fn expand_rank(rank: &str) -> BoardResult<ExpandedRank> {
    let mut out = [EMPTY; 8];
    let mut file = 0usize;

    for ch in rank.chars() {
        if let Some(run) = ch.to_digit(10) {
            if !(1..=8).contains(&run) {
                return Err(BoardError::invalid_fen(rank, format!("invalid empty-square count '{ch}'")));
            }
            file += run as usize;
        } else {
            if piece_from_fen_char(ch).is_none() {
                return Err(BoardError::invalid_fen(rank, format!("invalid piece character '{ch}'")));
            }
            if file < 8 {
                out[file] = ch as u8;
            }
            file += 1;
        }
        if file > 8 {
            return Err(BoardError::invalid_fen(rank, "rank overflows the a-h files"));
        }
    }

    if file != 8 {
        return Err(BoardError::invalid_fen(rank, "rank does not sum to 8 files"));
    }
    Ok(out)
}

/// Inverse of [`expand_rank`]: runs of empty squares become digits.
pub fn collapse_rank(rank: &ExpandedRank) -> String {
    let mut out = String::with_capacity(8);
    let mut empty_count = 0u8;

    for &cell in rank {
        if cell == EMPTY {
            empty_count += 1;
            continue;
        }
        if empty_count > 0 {
            out.push(char::from(b'0' + empty_count));
            empty_count = 0;
        }
        out.push(char::from(cell));
    }

    if empty_count > 0 {
        out.push(char::from(b'0' + empty_count));
    }
    out
}

/// Placement field with lazily expanded ranks.
struct RankEditor<'a> {
    fen: &'a str,
    /// Index 0 is rank 8, as written in FEN.
    rows: Vec<&'a str>,
    /// Index 0 is rank 1.
    expanded: [Option<ExpandedRank>; 8],
}

impl<'a> RankEditor<'a> {
    fn new(fen: &'a str, board_part: &'a str) -> BoardResult<Self> {
        let rows: Vec<&str> = board_part.split('/').collect();
        if rows.len() != 8 {
            return Err(BoardError::invalid_fen(fen, "board layout must contain 8 ranks"));
        }
        Ok(Self {
            fen,
            rows,
            expanded: [None; 8],
        })
    }

    fn rank_mut(&mut self, rank: u8) -> BoardResult<&mut ExpandedRank> {
        let slot = &mut self.expanded[rank as usize];
        if slot.is_none() {
            let text = self.rows[7 - rank as usize];
            let expanded = expand_rank(text)
                .map_err(|_| BoardError::invalid_fen(self.fen, format!("malformed rank {}", rank + 1)))?;
            *slot = Some(expanded);
        }
        // Filled just above.
        Ok(slot.get_or_insert([EMPTY; 8]))
    }

    fn get(&mut self, square: Square) -> BoardResult<u8> {
        Ok(self.rank_mut(square.rank())?[square.file() as usize])
    }

    fn set(&mut self, square: Square, cell: u8) -> BoardResult<()> {
        self.rank_mut(square.rank())?[square.file() as usize] = cell;
        Ok(())
    }

    fn finish(self) -> String {
        let mut out = String::with_capacity(72);
        for (row_idx, row) in self.rows.iter().enumerate() {
            match &self.expanded[7 - row_idx] {
                Some(expanded) => out.push_str(&collapse_rank(expanded)),
                None => out.push_str(row),
            }
            if row_idx < 7 {
                out.push('/');
            }
        }
        out
    }
}

fn cell_piece(cell: u8) -> Option<(Color, PieceKind)> {
    if cell == EMPTY {
        None
    } else {
        piece_from_fen_char(char::from(cell))
    }
}

/// The single castling right tied to a corner square.
fn corner_right(square: Square) -> Option<CastlingRights> {
    match (square.file(), square.rank()) {
        (0, 0) => Some(CASTLE_LIGHT_QUEENSIDE),
        (7, 0) => Some(CASTLE_LIGHT_KINGSIDE),
        (0, 7) => Some(CASTLE_DARK_QUEENSIDE),
        (7, 7) => Some(CASTLE_DARK_KINGSIDE),
        _ => None,
    }
}

/// Rewrite `fen` to the position after `mv`. The move is assumed legal.
pub fn apply_move_to_fen(fen: &str, mv: MoveRequest) -> BoardResult<String> {
    let [board_part, _side, castling_part, _en_passant, halfmove_part, fullmove_part] =
        split_fields(fen)?;
    let mut castling = parse_castling_rights(fen, castling_part)?;
    let halfmove = halfmove_part
        .parse::<u16>()
        .map_err(|_| BoardError::invalid_fen(fen, format!("bad halfmove clock '{halfmove_part}'")))?;
    let fullmove = fullmove_part
        .parse::<u16>()
        .map_err(|_| BoardError::invalid_fen(fen, format!("bad fullmove number '{fullmove_part}'")))?;

    // 1. expand the ranks the move touches.
    let mut board = RankEditor::new(fen, board_part)?;
    let mover_cell = board.get(mv.from)?;
    let (mover, kind) =
        cell_piece(mover_cell).ok_or(BoardError::NoPieceOnSquare { square: mv.from })?;
    let target_cell = board.get(mv.to)?;
    let mut captured = target_cell != EMPTY;
    let d_file = mv.to.file() as i8 - mv.from.file() as i8;
    let d_rank = mv.to.rank() as i8 - mv.from.rank() as i8;

    // 2. en-passant target after a double step; removal after an en-passant capture.
    let mut en_passant = None;
    if kind == PieceKind::Pawn {
        if d_rank.abs() == 2 {
            let enemy_pawn = PieceKind::Pawn.fen_char(mover.opposite()) as u8;
            for side in [-1i8, 1] {
                if let Some(adjacent) = mv.to.offset(side, 0) {
                    if board.get(adjacent)? == enemy_pawn {
                        en_passant = mv.from.offset(0, d_rank / 2);
                    }
                }
            }
        }
        if d_file != 0 && target_cell == EMPTY {
            board.set(Square::at(mv.to.file(), mv.from.rank()), EMPTY)?;
            captured = true;
        }
    }

    // 3. castling moves the rook and spends both of the mover's rights.
    if kind == PieceKind::King {
        if d_file.abs() == 2 {
            let (rook_from, rook_to) = castling_rook_squares(mv.from, mv.to);
            let rook = board.get(rook_from)?;
            board.set(rook_from, EMPTY)?;
            board.set(rook_to, rook)?;
        }
        castling &= !(kingside_flag(mover) | queenside_flag(mover));
    }

    // 4. corner bookkeeping.
    if kind == PieceKind::Rook {
        if let Some(right) = corner_right(mv.from) {
            castling &= !right;
        }
    }
    if captured {
        if let Some(right) = corner_right(mv.to) {
            castling &= !right;
        }
    }

    // 5. relocate (and possibly promote) the mover.
    let placed = match mv.promotion {
        Some(promotion) if kind == PieceKind::Pawn => promotion.fen_char(mover),
        Some(promotion) => {
            return Err(BoardError::InvalidPromotion {
                from: mv.from,
                to: mv.to,
                kind: promotion,
            })
        }
        None => kind.fen_char(mover),
    };
    board.set(mv.from, EMPTY)?;
    board.set(mv.to, placed as u8)?;

    // 6. collapse; 7. rewrite the remaining fields.
    let placement = board.finish();
    let halfmove = if captured || kind == PieceKind::Pawn {
        0
    } else {
        halfmove.saturating_add(1)
    };
    let fullmove = if mover == Color::Dark {
        fullmove.saturating_add(1)
    } else {
        fullmove
    };

    let next = format!(
        "{} {} {} {} {} {}",
        placement,
        mover.opposite().fen_char(),
        generate_castling_field(castling),
        generate_en_passant_field(en_passant),
        halfmove,
        fullmove
    );
    trace!(from = %fen, to = %next, mv = %mv, "rewrote FEN");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::chess_rules::STARTING_POSITION_FEN;
    use crate::utils::algebraic::algebraic_to_square;

    fn mv(token: &str) -> MoveRequest {
        let from = algebraic_to_square(&token[0..2]).expect("from square");
        let to = algebraic_to_square(&token[2..4]).expect("to square");
        let promotion = token
            .chars()
            .nth(4)
            .and_then(PieceKind::from_lower_char);
        MoveRequest { from, to, promotion }
    }

    #[test]
    fn rank_expansion_is_one_byte_per_square() {
        assert_eq!(&expand_rank("3P4").expect("valid rank"), b"111P1111");
        assert_eq!(&expand_rank("rnbqkbnr").expect("valid rank"), b"rnbqkbnr");
        assert_eq!(&expand_rank("8").expect("valid rank"), b"11111111");
        assert!(expand_rank("3P3").is_err());
        assert!(expand_rank("4P4").is_err());
        assert!(expand_rank("3X4").is_err());
    }

    #[test]
    fn rank_collapse_merges_runs() {
        assert_eq!(collapse_rank(b"111P1111"), "3P4");
        assert_eq!(collapse_rank(b"11111111"), "8");
        assert_eq!(collapse_rank(b"r111k11r"), "r3k2r");
        for rank in ["PPP1PPPP", "2n2n2", "8", "R3K2R", "p1ppqpb1"] {
            let expanded = expand_rank(rank).expect("valid rank");
            assert_eq!(collapse_rank(&expanded), rank);
        }
    }

    #[test]
    fn pawn_double_step_without_neighbours_sets_no_target() {
        let next = apply_move_to_fen(STARTING_POSITION_FEN, mv("d2d4")).expect("legal move");
        assert_eq!(next, "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1");
    }

    #[test]
    fn pawn_double_step_next_to_enemy_pawn_sets_target() {
        let fen = "r1bqkbnr/pppppppp/n7/4P3/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 2";
        let next = apply_move_to_fen(fen, mv("d7d5")).expect("legal move");
        assert_eq!(next, "r1bqkbnr/ppp1pppp/n7/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3");

        let captured = apply_move_to_fen(&next, mv("e5d6")).expect("legal move");
        assert_eq!(captured, "r1bqkbnr/ppp1pppp/n2P4/8/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 3");
    }

    #[test]
    fn castling_moves_the_rook_and_clears_rights() {
        let fen = "r3k2r/pppq1ppp/2nbbn2/3pp3/3PP3/2NBBN2/PPPQ1PPP/R3K2R w KQkq - 6 8";
        let short = apply_move_to_fen(fen, mv("e1g1")).expect("legal castle");
        assert_eq!(short, "r3k2r/pppq1ppp/2nbbn2/3pp3/3PP3/2NBBN2/PPPQ1PPP/R4RK1 b kq - 7 8");

        let long = apply_move_to_fen(&short, mv("e8c8")).expect("legal castle");
        assert_eq!(long, "2kr3r/pppq1ppp/2nbbn2/3pp3/3PP3/2NBBN2/PPPQ1PPP/R4RK1 w - - 8 9");
    }

    #[test]
    fn rook_moves_and_corner_captures_clear_single_rights() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let next = apply_move_to_fen(fen, mv("a1a8")).expect("legal capture");
        assert_eq!(next, "R3k2r/8/8/8/8/8/8/4K2R b Kk - 0 1");

        let next = apply_move_to_fen(fen, mv("h1h4")).expect("legal move");
        assert_eq!(next, "r3k2r/8/8/8/7R/8/8/R3K3 b Qkq - 1 1");
    }

    #[test]
    fn promotion_writes_the_new_letter() {
        let fen = "4k3/1P6/8/8/8/8/8/4K3 w - - 3 40";
        let next = apply_move_to_fen(fen, mv("b7b8q")).expect("legal promotion");
        assert_eq!(next, "1Q2k3/8/8/8/8/8/8/4K3 b - - 0 40");

        let fen = "4k3/8/8/8/8/8/6p1/4K2R b K - 0 40";
        let next = apply_move_to_fen(fen, mv("g2h1n")).expect("legal capture-promotion");
        assert_eq!(next, "4k3/8/8/8/8/8/8/4K2n w - - 0 41");
    }

    #[test]
    fn king_step_spends_both_rights() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1";
        let next = apply_move_to_fen(fen, mv("e8d8")).expect("legal move");
        assert_eq!(next, "r2k3r/8/8/8/8/8/8/R3K2R w KQ - 1 2");
    }

    #[test]
    fn empty_start_square_is_rejected() {
        assert!(matches!(
            apply_move_to_fen(STARTING_POSITION_FEN, mv("e3e4")),
            Err(BoardError::NoPieceOnSquare { .. })
        ));
    }
}
