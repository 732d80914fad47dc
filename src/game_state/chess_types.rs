//! Core value types shared by the board, the move generator and the FEN codec.

use std::fmt;

use derive_more::Display;

use crate::errors::{BoardError, BoardResult};

/// Side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum Color {
    #[display("white")]
    Light,
    #[display("black")]
    Dark,
}

impl Color {
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Color::Light => 0,
            Color::Dark => 1,
        }
    }

    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Color::Light => Color::Dark,
            Color::Dark => Color::Light,
        }
    }

    /// Rank index (0-based) the pieces of this color start on.
    #[inline]
    pub const fn back_rank(self) -> u8 {
        match self {
            Color::Light => 0,
            Color::Dark => 7,
        }
    }

    #[inline]
    pub const fn pawn_rank(self) -> u8 {
        match self {
            Color::Light => 1,
            Color::Dark => 6,
        }
    }

    /// Rank index a pawn of this color promotes on.
    #[inline]
    pub const fn promotion_rank(self) -> u8 {
        self.opposite().back_rank()
    }

    /// Rank direction pawns of this color advance in.
    #[inline]
    pub const fn forward(self) -> i8 {
        match self {
            Color::Light => 1,
            Color::Dark => -1,
        }
    }

    #[inline]
    pub const fn fen_char(self) -> char {
        match self {
            Color::Light => 'w',
            Color::Dark => 'b',
        }
    }
}

/// Piece class (color is carried separately on each piece).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

pub const ALL_PIECE_KINDS: [PieceKind; 6] = [
    PieceKind::Pawn,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Rook,
    PieceKind::Queen,
    PieceKind::King,
];

/// Classes a pawn may promote to, strongest first.
pub const PROMOTION_KINDS: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

impl PieceKind {
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            PieceKind::Pawn => 0,
            PieceKind::Knight => 1,
            PieceKind::Bishop => 2,
            PieceKind::Rook => 3,
            PieceKind::Queen => 4,
            PieceKind::King => 5,
        }
    }

    #[inline]
    pub const fn is_promotion_target(self) -> bool {
        matches!(
            self,
            PieceKind::Queen | PieceKind::Rook | PieceKind::Bishop | PieceKind::Knight
        )
    }

    /// Lowercase letter used by FEN and by UCI promotion suffixes.
    #[inline]
    pub const fn lower_char(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    /// FEN letter for this class in the given color.
    #[inline]
    pub fn fen_char(self, color: Color) -> char {
        match color {
            Color::Light => self.lower_char().to_ascii_uppercase(),
            Color::Dark => self.lower_char(),
        }
    }

    pub fn from_lower_char(ch: char) -> Option<Self> {
        let kind = match ch {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return None,
        };
        Some(kind)
    }
}

/// Decode a FEN piece letter into color and class.
pub fn piece_from_fen_char(ch: char) -> Option<(Color, PieceKind)> {
    let color = if ch.is_ascii_uppercase() {
        Color::Light
    } else if ch.is_ascii_lowercase() {
        Color::Dark
    } else {
        return None;
    };

    PieceKind::from_lower_char(ch.to_ascii_lowercase()).map(|kind| (color, kind))
}

/// A board square addressed by 0-based file (a..h) and rank (1..8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    pub fn new(file: u8, rank: u8) -> BoardResult<Self> {
        if file > 7 || rank > 7 {
            return Err(BoardError::InvalidSquare {
                text: format!("file {file}, rank {rank}"),
            });
        }
        Ok(Self { file, rank })
    }

    /// Caller guarantees `file` and `rank` are in `0..=7`.
    pub(crate) const fn at(file: u8, rank: u8) -> Self {
        Self { file, rank }
    }

    #[inline]
    pub const fn file(self) -> u8 {
        self.file
    }

    #[inline]
    pub const fn rank(self) -> u8 {
        self.rank
    }

    /// Index in `0..64` with `a1 == 0` and `h8 == 63`.
    #[inline]
    pub const fn index(self) -> usize {
        self.rank as usize * 8 + self.file as usize
    }

    pub fn from_index(index: usize) -> BoardResult<Self> {
        if index >= 64 {
            return Err(BoardError::InvalidSquare {
                text: format!("index {index}"),
            });
        }
        Ok(Self::at((index % 8) as u8, (index / 8) as u8))
    }

    /// The square reached by stepping `(d_file, d_rank)`, if still on the board.
    #[inline]
    pub fn offset(self, d_file: i8, d_rank: i8) -> Option<Self> {
        let file = self.file as i8 + d_file;
        let rank = self.rank as i8 + d_rank;
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Some(Self::at(file as u8, rank as u8))
        } else {
            None
        }
    }

    pub fn all() -> impl Iterator<Item = Square> {
        (0..64usize).map(|i| Self::at((i % 8) as u8, (i / 8) as u8))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            char::from(b'a' + self.file),
            char::from(b'1' + self.rank)
        )
    }
}

/// Castling rights bitmask, one bit per color and side.
pub type CastlingRights = u8;

pub const CASTLE_LIGHT_KINGSIDE: CastlingRights = 1 << 0;
pub const CASTLE_LIGHT_QUEENSIDE: CastlingRights = 1 << 1;
pub const CASTLE_DARK_KINGSIDE: CastlingRights = 1 << 2;
pub const CASTLE_DARK_QUEENSIDE: CastlingRights = 1 << 3;

#[inline]
pub const fn kingside_flag(color: Color) -> CastlingRights {
    match color {
        Color::Light => CASTLE_LIGHT_KINGSIDE,
        Color::Dark => CASTLE_DARK_KINGSIDE,
    }
}

#[inline]
pub const fn queenside_flag(color: Color) -> CastlingRights {
    match color {
        Color::Light => CASTLE_LIGHT_QUEENSIDE,
        Color::Dark => CASTLE_DARK_QUEENSIDE,
    }
}

/// Castling rights of a single color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideRights {
    pub king_side: bool,
    pub queen_side: bool,
}

impl SideRights {
    pub fn of(rights: CastlingRights, color: Color) -> Self {
        Self {
            king_side: rights & kingside_flag(color) != 0,
            queen_side: rights & queenside_flag(color) != 0,
        }
    }

    #[inline]
    pub fn any(self) -> bool {
        self.king_side || self.queen_side
    }
}
