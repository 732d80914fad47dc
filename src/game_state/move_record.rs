//! Move requests and the undo records produced by applying them.

use std::fmt;

use crate::errors::{BoardError, BoardResult};
use crate::game_state::chess_types::{CastlingRights, Color, PieceKind, Square};
use crate::game_state::piece_register::PieceId;

/// A move as supplied by the caller: start, end and optional promotion class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveRequest {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
}

impl MoveRequest {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn with_promotion(from: Square, to: Square, kind: PieceKind) -> Self {
        Self {
            from,
            to,
            promotion: Some(kind),
        }
    }
}

/// Coordinate notation: `e2e4`, `d7d8q`.
impl fmt::Display for MoveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.lower_char())?;
        }
        Ok(())
    }
}

/// What happened to pieces other than the mover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveEffect {
    Quiet,
    Capture(PieceId),
    EnPassant(PieceId),
    Castle {
        rook: PieceId,
        rook_from: Square,
        rook_to: Square,
    },
}

/// Single undo record for `move_piece` / `revert_last_move`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub from: Square,
    pub to: Square,
    pub mover: Color,
    pub piece: PieceId,
    pub promotion: Option<PieceKind>,
    pub effect: MoveEffect,
    /// The mover had never moved before this move.
    pub first_move: bool,
    pub prev_castling_rights: CastlingRights,
    pub prev_fen: String,
}

impl MoveRecord {
    pub fn request(&self) -> MoveRequest {
        MoveRequest {
            from: self.from,
            to: self.to,
            promotion: self.promotion,
        }
    }

    #[inline]
    pub fn is_capture(&self) -> bool {
        matches!(self.effect, MoveEffect::Capture(_) | MoveEffect::EnPassant(_))
    }

    #[inline]
    pub fn is_castle(&self) -> bool {
        matches!(self.effect, MoveEffect::Castle { .. })
    }

    /// The captured piece. Reading this on a non-capture is a contract breach.
    pub fn captured(&self) -> BoardResult<PieceId> {
        match self.effect {
            MoveEffect::Capture(id) | MoveEffect::EnPassant(id) => Ok(id),
            _ => Err(BoardError::NotACapture {
                token: self.request().to_string(),
            }),
        }
    }

    pub fn castling_rook(&self) -> Option<PieceId> {
        match self.effect {
            MoveEffect::Castle { rook, .. } => Some(rook),
            _ => None,
        }
    }
}
