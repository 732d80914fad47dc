//! Authoritative position state.
//!
//! `BoardState` owns the piece arena, the live FEN text and the move history.
//! Every mutation keeps the two in agreement: moves are applied to the pieces
//! and to the FEN text independently, and the side-to-move, castling,
//! en-passant and clock fields are then re-derived from the rewritten FEN.

use tracing::{debug, instrument};

use crate::errors::{BoardError, BoardResult};
use crate::game_state::chess_rules::{castling_rook_squares, starts_deployed, STARTING_POSITION_FEN};
use crate::game_state::chess_types::*;
use crate::game_state::move_record::{MoveEffect, MoveRecord, MoveRequest};
use crate::game_state::piece_register::{PieceId, PieceRecord, PieceRegister};
use crate::utils::fen_editor::apply_move_to_fen;
use crate::utils::fen_generator::{generate_board_field, generate_castling_field, generate_en_passant_field};
use crate::utils::fen_parser::{parse_fen, ParsedFen};

#[derive(Debug, Clone)]
pub struct BoardState {
    pieces: PieceRegister,
    fen: String,

    side_to_move: Color,
    castling_rights: CastlingRights,
    en_passant_square: Option<Square>,
    halfmove_clock: u16,
    fullmove_number: u16,

    history: Vec<MoveRecord>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new_game()
    }
}

impl BoardState {
    pub fn new_game() -> Self {
        let parsed = parse_fen(STARTING_POSITION_FEN).unwrap_or_else(|_| unreachable!("starting FEN always parses"));
        Self::from_parsed(parsed)
    }

    pub fn from_fen(fen: &str) -> BoardResult<Self> {
        Ok(Self::from_parsed(parse_fen(fen)?))
    }

    /// Reset to the standard starting position.
    pub fn reset(&mut self) {
        *self = Self::new_game();
    }

    /// Reset and repopulate from `fen`. On error the board is left untouched.
    #[instrument(skip(self))]
    pub fn new_position(&mut self, fen: &str) -> BoardResult<()> {
        *self = Self::from_fen(fen)?;
        debug!(fen = %self.fen, "loaded position");
        Ok(())
    }

    fn from_parsed(parsed: ParsedFen) -> Self {
        let mut pieces = PieceRegister::new();
        for &(color, kind, square) in &parsed.placement {
            let id = pieces.add(color, kind, square);
            pieces.get_mut(id).deployed = starts_deployed(color, kind, square);
        }

        let mut state = Self {
            pieces,
            fen: String::new(),
            side_to_move: parsed.side_to_move,
            castling_rights: parsed.castling_rights,
            en_passant_square: parsed.en_passant_square,
            halfmove_clock: parsed.halfmove_clock,
            fullmove_number: parsed.fullmove_number,
            history: Vec::new(),
        };
        state.fen = state.compose_fen();
        state
    }

    fn compose_fen(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            generate_board_field(&self.pieces),
            self.side_to_move.fen_char(),
            generate_castling_field(self.castling_rights),
            generate_en_passant_field(self.en_passant_square),
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    /// Re-derive every non-placement field from an already decoded `fen`.
    fn adopt_fen(&mut self, fen: String, parsed: ParsedFen) {
        self.side_to_move = parsed.side_to_move;
        self.castling_rights = parsed.castling_rights;
        self.en_passant_square = parsed.en_passant_square;
        self.halfmove_clock = parsed.halfmove_clock;
        self.fullmove_number = parsed.fullmove_number;
        self.fen = fen;
    }

    /// Mark the pawn on `from` to become `kind` when it moves to `to`.
    ///
    /// Only valid for a pawn arriving on its final rank; the class changes on
    /// the next [`Self::move_piece`] so move and promotion land together.
    pub fn promote_piece(&mut self, from: Square, to: Square, kind: PieceKind) -> BoardResult<()> {
        let id = self
            .pieces
            .id_at(from)
            .ok_or(BoardError::NoPieceOnSquare { square: from })?;
        let piece = self.pieces.get(id);
        if piece.kind != PieceKind::Pawn
            || to.rank() != piece.color.promotion_rank()
            || !kind.is_promotion_target()
        {
            return Err(BoardError::InvalidPromotion { from, to, kind });
        }
        self.pieces.get_mut(id).pending_promotion = Some(kind);
        Ok(())
    }

    /// Apply a move that is already known to be legal and return its record.
    ///
    /// Castling is a king moving two files; en passant is a pawn moving
    /// diagonally onto an empty square. Nothing is mutated if the request is
    /// inconsistent with the position.
    #[instrument(skip(self), fields(mv = %mv))]
    pub fn move_piece(&mut self, mv: MoveRequest) -> BoardResult<MoveRecord> {
        let id = self
            .pieces
            .id_at(mv.from)
            .ok_or(BoardError::NoPieceOnSquare { square: mv.from })?;
        let mover = self.pieces.get(id).clone();
        if mover.color != self.side_to_move {
            return Err(BoardError::NotSideToMove { square: mv.from });
        }

        if let Some(kind) = mv.promotion {
            self.promote_piece(mv.from, mv.to, kind)?;
        }
        let promotion = self.pieces.get(id).pending_promotion;

        let d_file = mv.to.file() as i8 - mv.from.file() as i8;
        let occupant = self.pieces.id_at(mv.to);
        if let Some(occupant) = occupant {
            if self.pieces.get(occupant).color == mover.color {
                return self.abort(id, BoardError::OccupiedByFriendlyPiece { square: mv.to });
            }
        }

        let effect = if mover.kind == PieceKind::King && d_file.abs() == 2 {
            if occupant.is_some() {
                return self.abort(id, BoardError::CaptureAndCastle { token: mv.to_string() });
            }
            let (rook_from, rook_to) = castling_rook_squares(mv.from, mv.to);
            match self.pieces.id_at(rook_from) {
                Some(rook)
                    if self.pieces.get(rook).kind == PieceKind::Rook
                        && self.pieces.get(rook).color == mover.color =>
                {
                    MoveEffect::Castle {
                        rook,
                        rook_from,
                        rook_to,
                    }
                }
                _ => return self.abort(id, BoardError::NoPieceOnSquare { square: rook_from }),
            }
        } else if mover.kind == PieceKind::Pawn && d_file != 0 && occupant.is_none() {
            let victim_square = Square::at(mv.to.file(), mv.from.rank());
            match self.pieces.id_at(victim_square) {
                Some(victim)
                    if self.pieces.get(victim).kind == PieceKind::Pawn
                        && self.pieces.get(victim).color != mover.color =>
                {
                    MoveEffect::EnPassant(victim)
                }
                _ => return self.abort(id, BoardError::NoPieceOnSquare { square: victim_square }),
            }
        } else if let Some(occupant) = occupant {
            MoveEffect::Capture(occupant)
        } else {
            MoveEffect::Quiet
        };

        let request = MoveRequest {
            promotion,
            ..mv
        };
        let (next_fen, parsed) = match apply_move_to_fen(&self.fen, request)
            .and_then(|fen| parse_fen(&fen).map(|parsed| (fen, parsed)))
        {
            Ok(next) => next,
            Err(err) => return self.abort(id, err),
        };
        let prev_fen = std::mem::take(&mut self.fen);
        let record = MoveRecord {
            from: mv.from,
            to: mv.to,
            mover: mover.color,
            piece: id,
            promotion,
            effect,
            first_move: !mover.deployed,
            prev_castling_rights: self.castling_rights,
            prev_fen,
        };

        match effect {
            MoveEffect::Capture(victim) | MoveEffect::EnPassant(victim) => {
                self.pieces.set_captured(victim, true);
            }
            MoveEffect::Castle { rook, rook_to, .. } => {
                self.pieces.relocate(rook, rook_to);
                self.pieces.get_mut(rook).deployed = true;
            }
            MoveEffect::Quiet => {}
        }
        self.pieces.relocate(id, mv.to);
        let piece = self.pieces.get_mut(id);
        piece.deployed = true;
        if let Some(kind) = piece.pending_promotion.take() {
            piece.kind = kind;
        }

        self.history.push(record.clone());
        self.adopt_fen(next_fen, parsed);
        debug!(fen = %self.fen, "applied move");
        Ok(record)
    }

    fn abort<T>(&mut self, id: PieceId, err: BoardError) -> BoardResult<T> {
        self.pieces.get_mut(id).pending_promotion = None;
        Err(err)
    }

    /// Undo the most recent move, restoring the exact pre-move FEN.
    #[instrument(skip(self))]
    pub fn revert_last_move(&mut self) -> BoardResult<MoveRecord> {
        let record = self.history.last().ok_or(BoardError::NoMoveToRevert)?;
        if record.promotion.is_some() && self.pieces.get(record.piece).kind == PieceKind::King {
            return Err(BoardError::CannotDemoteKing { square: record.to });
        }
        let parsed = parse_fen(&record.prev_fen)?;
        let record = self.history.pop().ok_or(BoardError::NoMoveToRevert)?;

        self.pieces.relocate(record.piece, record.from);
        let piece = self.pieces.get_mut(record.piece);
        if record.first_move {
            piece.deployed = false;
        }
        if record.promotion.is_some() {
            piece.kind = PieceKind::Pawn;
        }

        match record.effect {
            MoveEffect::Capture(victim) | MoveEffect::EnPassant(victim) => {
                self.pieces.set_captured(victim, false);
            }
            MoveEffect::Castle { rook, rook_from, .. } => {
                self.pieces.relocate(rook, rook_from);
                self.pieces.get_mut(rook).deployed = false;
            }
            MoveEffect::Quiet => {}
        }

        self.adopt_fen(record.prev_fen.clone(), parsed);
        self.castling_rights = record.prev_castling_rights;
        debug!(fen = %self.fen, "reverted move");
        Ok(record)
    }

    // --- Queries ---

    #[inline]
    pub fn fen(&self) -> &str {
        &self.fen
    }

    #[inline]
    pub fn pieces(&self) -> &PieceRegister {
        &self.pieces
    }

    #[inline]
    pub fn piece(&self, id: PieceId) -> &PieceRecord {
        self.pieces.get(id)
    }

    #[inline]
    pub fn piece_at(&self, square: Square) -> Option<&PieceRecord> {
        self.pieces.at(square)
    }

    #[inline]
    pub fn piece_id_at(&self, square: Square) -> Option<PieceId> {
        self.pieces.id_at(square)
    }

    #[inline]
    pub fn is_square_empty(&self, square: Square) -> bool {
        self.pieces.is_empty(square)
    }

    pub fn find_piece(&self, file: u8, rank: u8) -> BoardResult<Option<PieceId>> {
        Ok(self.pieces.id_at(Square::new(file, rank)?))
    }

    pub fn king(&self, color: Color) -> BoardResult<PieceId> {
        self.pieces.king(color).ok_or(BoardError::MissingKing { color })
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling_rights
    }

    pub fn side_rights(&self, color: Color) -> SideRights {
        SideRights::of(self.castling_rights, color)
    }

    /// Rights of whichever side is to move.
    pub fn active_rights(&self) -> SideRights {
        self.side_rights(self.side_to_move)
    }

    pub fn opponent_rights(&self) -> SideRights {
        self.side_rights(self.side_to_move.opposite())
    }

    #[inline]
    pub fn en_passant_target(&self) -> Option<Square> {
        self.en_passant_square
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    #[inline]
    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    #[inline]
    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn last_move(&self) -> Option<&MoveRecord> {
        self.history.last()
    }

    /// Live pieces as a sorted `(color, kind, square)` list.
    pub fn placement(&self) -> Vec<(Color, PieceKind, Square)> {
        let mut out: Vec<_> = self
            .pieces
            .live()
            .map(|(_, p)| (p.color, p.kind, p.square))
            .collect();
        out.sort();
        out
    }

    /// Whether the placement field of the live FEN matches the piece arena.
    pub fn is_consistent(&self) -> bool {
        self.fen.split(' ').next() == Some(generate_board_field(&self.pieces).as_str())
    }
}
