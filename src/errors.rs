//! Errors used throughout the board and engine-session layers.
//!
//! `BoardError` is returned by position parsing, move application and undo.
//! Its variants fall in two groups:
//! - malformed input (bad FEN, out-of-range squares, unparsable move tokens),
//!   which is always rejected before any state is touched;
//! - logic violations (reverting an empty history, reading a capture on a
//!   quiet move, demoting a king), which indicate a caller contract breach.
//!
//! `EngineError` is returned by the UCI session. Launch and I/O failures are
//! fatal to the caller that triggered them; `ResponseTimeout` is only produced
//! when a response timeout has been configured.

use std::time::Duration;

use derive_more::{Display, Error};

use crate::game_state::chess_types::{Color, PieceKind, Square};

pub type BoardResult<T> = Result<T, BoardError>;
pub type EngineResult<T> = Result<T, EngineError>;

/// Unified error type for position state and move legality.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum BoardError {
    /// The FEN string could not be decoded.
    #[display("invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    /// A file or rank outside `0..=7` (or `a..h` / `1..8`).
    #[display("square out of range: {text}")]
    InvalidSquare { text: String },

    /// A coordinate move token (`e2e4`, `d7d8q`) could not be interpreted.
    #[display("invalid move token '{token}': {reason}")]
    InvalidMoveToken { token: String, reason: String },

    /// Nothing (alive) stands on the requested square.
    #[display("no piece on {square}")]
    NoPieceOnSquare { square: Square },

    /// The piece on the start square does not belong to the side to move.
    #[display("piece on {square} does not belong to the side to move")]
    NotSideToMove { square: Square },

    /// The destination holds a piece of the mover's own color.
    #[display("destination {square} is occupied by a friendly piece")]
    OccupiedByFriendlyPiece { square: Square },

    /// The undo stack is empty.
    #[display("no move to revert")]
    NoMoveToRevert,

    /// The capture field was read on a move that captured nothing.
    #[display("move {token} is not a capture")]
    NotACapture { token: String },

    /// A move tried to both castle and capture.
    #[display("move {token} cannot both castle and capture")]
    CaptureAndCastle { token: String },

    /// A promoted piece was a king when it was about to be demoted.
    #[display("cannot demote the king on {square}")]
    CannotDemoteKing { square: Square },

    /// Promotion requested for a non-pawn, a non-final rank or an invalid class.
    #[display("invalid promotion to {kind:?} from {from} to {to}")]
    InvalidPromotion {
        from: Square,
        to: Square,
        kind: PieceKind,
    },

    /// The position is missing a king for one side.
    #[display("no king found for {color}")]
    MissingKing { color: Color },
}

/// Errors raised by the engine session and its process launcher.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum EngineError {
    /// `start` was called on a session that had already been started.
    #[display("engine session already started")]
    AlreadyStarted,

    /// An operation that needs a running engine was attempted before `start`.
    #[display("engine session not started")]
    NotStarted,

    /// The session has been stopped and accepts no more commands.
    #[display("engine session stopped")]
    Stopped,

    /// The engine process could not be launched.
    #[display("failed to launch engine '{program}': {reason}")]
    Launch { program: String, reason: String },

    /// Writing to or reading from the engine failed.
    #[display("engine I/O failure: {reason}")]
    Io { reason: String },

    /// The expected response did not arrive within the configured window.
    #[display("no response to '{command}' after {waited:?}")]
    ResponseTimeout { command: String, waited: Duration },
}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        EngineError::Io {
            reason: error.to_string(),
        }
    }
}

impl BoardError {
    pub(crate) fn invalid_fen(fen: &str, reason: impl Into<String>) -> Self {
        BoardError::InvalidFen {
            fen: fen.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_token(token: &str, reason: impl Into<String>) -> Self {
        BoardError::InvalidMoveToken {
            token: token.to_owned(),
            reason: reason.into(),
        }
    }
}
