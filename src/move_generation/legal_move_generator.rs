//! Legal move generation.
//!
//! Builds pseudo-legal destinations per piece class, then filters out every
//! candidate that would leave the mover's own king attacked. Filtering runs on
//! a scratch copy of the piece arena using reversible probe moves, so the
//! board's history, FEN text and castling rights are never touched.

use std::fmt;

use crate::errors::BoardResult;
use crate::game_state::board_state::BoardState;
use crate::game_state::chess_types::*;
use crate::game_state::move_record::MoveRequest;
use crate::game_state::piece_register::{PieceId, PieceRegister};
use crate::move_generation::legal_move_checks::is_square_in_check;
use crate::move_generation::legal_moves_bishop::generate_bishop_targets;
use crate::move_generation::legal_moves_king::generate_king_targets;
use crate::move_generation::legal_moves_knight::generate_knight_targets;
use crate::move_generation::legal_moves_pawn::generate_pawn_targets;
use crate::move_generation::legal_moves_queen::generate_queen_targets;
use crate::move_generation::legal_moves_rook::generate_rook_targets;

/// Result of inspecting the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Check,
    Checkmate { winner: Color },
    Stalemate,
}

impl GameStatus {
    #[inline]
    pub fn is_over(self) -> bool {
        matches!(self, GameStatus::Checkmate { .. } | GameStatus::Stalemate)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Ongoing => write!(f, "ongoing"),
            GameStatus::Check => write!(f, "check"),
            GameStatus::Checkmate { winner } => write!(f, "checkmate, {winner} wins"),
            GameStatus::Stalemate => write!(f, "stalemate"),
        }
    }
}

/// Movement-rule destinations for `id`, before self-check filtering.
pub fn pseudo_legal_targets(board: &BoardState, id: PieceId) -> Vec<Square> {
    let mut out = Vec::with_capacity(28);
    collect_pseudo_legal(board, board.pieces(), id, &mut out);
    out
}

fn collect_pseudo_legal(board: &BoardState, pieces: &PieceRegister, id: PieceId, out: &mut Vec<Square>) {
    let piece = pieces.get(id);
    if piece.captured {
        return;
    }
    match piece.kind {
        PieceKind::Pawn => generate_pawn_targets(pieces, piece, board.en_passant_target(), out),
        PieceKind::Knight => generate_knight_targets(pieces, piece.square, piece.color, out),
        PieceKind::Bishop => generate_bishop_targets(pieces, piece.square, piece.color, out),
        PieceKind::Rook => generate_rook_targets(pieces, piece.square, piece.color, out),
        PieceKind::Queen => generate_queen_targets(pieces, piece.square, piece.color, out),
        PieceKind::King => generate_king_targets(pieces, piece, board.castling_rights(), out),
    }
}

/// Destinations for `id` that do not leave its own king in check.
pub fn get_legal_moves(board: &BoardState, id: PieceId) -> BoardResult<Vec<Square>> {
    let mut scratch = board.pieces().clone();
    legal_targets_on(board, &mut scratch, id)
}

fn legal_targets_on(board: &BoardState, scratch: &mut PieceRegister, id: PieceId) -> BoardResult<Vec<Square>> {
    let mut candidates = Vec::with_capacity(28);
    collect_pseudo_legal(board, scratch, id, &mut candidates);
    if candidates.is_empty() {
        return Ok(candidates);
    }

    let piece = scratch.get(id).clone();
    let king = board.king(piece.color)?;

    candidates.retain(|&to| {
        let en_passant_victim = if piece.kind == PieceKind::Pawn
            && to.file() != piece.square.file()
            && scratch.is_empty(to)
        {
            scratch.id_at(Square::at(to.file(), piece.square.rank()))
        } else {
            None
        };

        let probe = scratch.probe(id, to, en_passant_victim);
        let king_square = scratch.get(king).square;
        let safe = !is_square_in_check(scratch, king_square, piece.color);
        scratch.restore(probe);
        safe
    });

    Ok(candidates)
}

/// Every legal move for the side to move, with back-rank pawn arrivals
/// expanded into one request per promotion class.
pub fn all_legal_moves(board: &BoardState) -> BoardResult<Vec<MoveRequest>> {
    let color = board.side_to_move();
    let mut scratch = board.pieces().clone();
    let movers: Vec<PieceId> = board.pieces().live_of(color).map(|(id, _)| id).collect();

    let mut moves = Vec::with_capacity(64);
    for id in movers {
        let piece = board.piece(id);
        let promotes = piece.kind == PieceKind::Pawn;
        let from = piece.square;
        for to in legal_targets_on(board, &mut scratch, id)? {
            if promotes && to.rank() == color.promotion_rank() {
                moves.extend(
                    PROMOTION_KINDS
                        .iter()
                        .map(|&kind| MoveRequest::with_promotion(from, to, kind)),
                );
            } else {
                moves.push(MoveRequest::new(from, to));
            }
        }
    }
    Ok(moves)
}

/// Whether the side to move has at least one legal move.
pub fn has_legal_move(board: &BoardState) -> BoardResult<bool> {
    let color = board.side_to_move();
    let mut scratch = board.pieces().clone();
    let movers: Vec<PieceId> = board.pieces().live_of(color).map(|(id, _)| id).collect();
    for id in movers {
        if !legal_targets_on(board, &mut scratch, id)?.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn is_move_legal(board: &BoardState, mv: MoveRequest) -> BoardResult<bool> {
    let Some(id) = board.piece_id_at(mv.from) else {
        return Ok(false);
    };
    let piece = board.piece(id);
    if piece.color != board.side_to_move() {
        return Ok(false);
    }
    let reaches_last_rank = piece.kind == PieceKind::Pawn && mv.to.rank() == piece.color.promotion_rank();
    let promotion_ok = match mv.promotion {
        Some(kind) => reaches_last_rank && kind.is_promotion_target(),
        None => !reaches_last_rank,
    };
    Ok(promotion_ok && get_legal_moves(board, id)?.contains(&mv.to))
}

pub fn game_status(board: &BoardState) -> BoardResult<GameStatus> {
    let color = board.side_to_move();
    let king = board.king(color)?;
    let in_check = is_square_in_check(board.pieces(), board.piece(king).square, color);
    let can_move = has_legal_move(board)?;

    Ok(match (in_check, can_move) {
        (true, false) => GameStatus::Checkmate {
            winner: color.opposite(),
        },
        (false, false) => GameStatus::Stalemate,
        (true, true) => GameStatus::Check,
        (false, true) => GameStatus::Ongoing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::chess_rules::STARTING_POSITION_FEN;
    use crate::move_generation::legal_move_checks::is_king_in_check;
    use crate::utils::algebraic::algebraic_to_square;

    fn sq(text: &str) -> Square {
        algebraic_to_square(text).expect("test square")
    }

    fn board(fen: &str) -> BoardState {
        BoardState::from_fen(fen).expect("FEN should parse")
    }

    fn legal_from(board: &BoardState, square: &str) -> Vec<Square> {
        let id = board.piece_id_at(sq(square)).expect("piece on square");
        let mut out = get_legal_moves(board, id).expect("move generation");
        out.sort();
        out
    }

    #[test]
    fn starting_position_has_twenty_moves() {
        let board = board(STARTING_POSITION_FEN);
        assert_eq!(all_legal_moves(&board).expect("moves").len(), 20);
        assert_eq!(game_status(&board).expect("status"), GameStatus::Ongoing);
    }

    #[test]
    fn pinned_piece_cannot_leave_the_line() {
        // The dark bishop on a5 pins d2 against the king on e1.
        let board = board("4k3/8/8/b7/8/8/3B4/4K3 w - - 0 1");
        let moves = legal_from(&board, "d2");
        assert_eq!(moves, vec![sq("a5"), sq("b4"), sq("c3")]);
    }

    #[test]
    fn filtering_leaves_the_board_untouched() {
        let board = board("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        let before_fen = board.fen().to_owned();
        let before = board.placement();
        for (id, _) in board.pieces().live_of(Color::Light) {
            get_legal_moves(&board, id).expect("move generation");
        }
        assert_eq!(board.fen(), before_fen);
        assert_eq!(board.placement(), before);
        assert!(board.history().is_empty());
    }

    #[test]
    fn no_generated_move_leaves_own_king_in_check() {
        let fens = [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        ];
        for fen in fens {
            let mut board = board(fen);
            let mover = board.side_to_move();
            for mv in all_legal_moves(&board).expect("moves") {
                board.move_piece(mv).expect("legal move applies");
                assert!(!is_king_in_check(board.pieces(), mover), "{fen}: {mv}");
                board.revert_last_move().expect("undo");
            }
        }
    }

    #[test]
    fn en_passant_exposing_the_king_is_filtered() {
        // Capturing d6 would clear the fifth rank between the rook and the king.
        let board = board("4k3/8/8/K2pP2r/8/8/8/8 w - d6 0 1");
        let moves = legal_from(&board, "e5");
        assert_eq!(moves, vec![sq("e6")]);
    }

    #[test]
    fn en_passant_capture_is_generated() {
        let board = board("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1");
        assert_eq!(legal_from(&board, "e5"), vec![sq("d6"), sq("e6")]);
    }

    #[test]
    fn stale_en_passant_target_yields_only_applicable_moves() {
        for fen in [
            "4k3/8/8/4P3/8/8/8/4K3 w - d6 0 1",
            "4k3/8/8/3PP3/8/8/8/4K3 w - d6 0 1",
        ] {
            let mut board = board(fen);
            assert_eq!(legal_from(&board, "e5"), vec![sq("e6")], "{fen}");
            for mv in all_legal_moves(&board).expect("moves") {
                board.move_piece(mv).expect("generated move applies");
                board.revert_last_move().expect("undo");
            }
            assert_eq!(board.fen(), fen);
        }
    }

    #[test]
    fn promotions_expand_to_four_requests() {
        let board = board("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1");
        let promotions: Vec<_> = all_legal_moves(&board)
            .expect("moves")
            .into_iter()
            .filter(|mv| mv.from == sq("b7"))
            .collect();
        assert_eq!(promotions.len(), 4);
        assert!(promotions.iter().all(|mv| mv.promotion.is_some()));
        assert!(is_move_legal(&board, MoveRequest::with_promotion(sq("b7"), sq("b8"), PieceKind::Queen))
            .expect("legality"));
        assert!(!is_move_legal(&board, MoveRequest::new(sq("b7"), sq("b8"))).expect("legality"));
    }

    #[test]
    fn detects_mate_and_stalemate() {
        let mate = board("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
        assert_eq!(
            game_status(&mate).expect("status"),
            GameStatus::Checkmate { winner: Color::Dark }
        );

        let stalemate = board("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert_eq!(game_status(&stalemate).expect("status"), GameStatus::Stalemate);

        let check = board("4k3/8/8/8/8/8/8/4K2r w - - 0 1");
        assert_eq!(game_status(&check).expect("status"), GameStatus::Check);
    }
}
