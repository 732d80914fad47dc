//! Slot-indexed piece arena.
//!
//! Pieces are never removed: capture only flips a liveness flag so undo can
//! bring them back in O(1) and `PieceId`s stay valid for the lifetime of a
//! position. A 64-entry occupancy table tracks which live piece stands on
//! each square.

use crate::game_state::chess_types::{Color, PieceKind, Square};

/// Stable handle to a slot in the `PieceRegister`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceId(usize);

impl PieceId {
    #[inline]
    pub const fn slot(self) -> usize {
        self.0
    }
}

/// A chess piece with its class, color and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceRecord {
    pub color: Color,
    pub kind: PieceKind,
    pub square: Square,
    /// Has moved at least once (or was decoded off its home square).
    pub deployed: bool,
    /// Soft-deleted by a capture; retained for undo.
    pub captured: bool,
    /// Class this pawn turns into on its next move.
    pub pending_promotion: Option<PieceKind>,
}

/// Undo token for a history-free probe move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    piece: PieceId,
    from: Square,
    displaced: [Option<PieceId>; 2],
}

#[derive(Debug, Clone)]
pub struct PieceRegister {
    slots: Vec<PieceRecord>,
    occupancy: [Option<PieceId>; 64],
}

impl Default for PieceRegister {
    fn default() -> Self {
        Self {
            slots: Vec::with_capacity(32),
            occupancy: [None; 64],
        }
    }
}

impl PieceRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a live, undeployed piece. The square must be empty.
    pub fn add(&mut self, color: Color, kind: PieceKind, square: Square) -> PieceId {
        let id = PieceId(self.slots.len());
        self.slots.push(PieceRecord {
            color,
            kind,
            square,
            deployed: false,
            captured: false,
            pending_promotion: None,
        });
        self.occupancy[square.index()] = Some(id);
        id
    }

    #[inline]
    pub fn get(&self, id: PieceId) -> &PieceRecord {
        &self.slots[id.0]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: PieceId) -> &mut PieceRecord {
        &mut self.slots[id.0]
    }

    /// Live piece standing on `square`.
    #[inline]
    pub fn id_at(&self, square: Square) -> Option<PieceId> {
        self.occupancy[square.index()]
    }

    #[inline]
    pub fn at(&self, square: Square) -> Option<&PieceRecord> {
        self.id_at(square).map(|id| self.get(id))
    }

    #[inline]
    pub fn color_at(&self, square: Square) -> Option<Color> {
        self.at(square).map(|p| p.color)
    }

    #[inline]
    pub fn is_empty(&self, square: Square) -> bool {
        self.occupancy[square.index()].is_none()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Every slot, captured pieces included.
    pub fn iter(&self) -> impl Iterator<Item = (PieceId, &PieceRecord)> {
        self.slots.iter().enumerate().map(|(i, p)| (PieceId(i), p))
    }

    pub fn live(&self) -> impl Iterator<Item = (PieceId, &PieceRecord)> {
        self.iter().filter(|(_, p)| !p.captured)
    }

    pub fn live_of(&self, color: Color) -> impl Iterator<Item = (PieceId, &PieceRecord)> {
        self.live().filter(move |(_, p)| p.color == color)
    }

    pub fn king(&self, color: Color) -> Option<PieceId> {
        self.live_of(color)
            .find(|(_, p)| p.kind == PieceKind::King)
            .map(|(id, _)| id)
    }

    /// Move a live piece to `to`. Whatever was on `to` must already be captured.
    pub(crate) fn relocate(&mut self, id: PieceId, to: Square) {
        let from = self.slots[id.0].square;
        if self.occupancy[from.index()] == Some(id) {
            self.occupancy[from.index()] = None;
        }
        self.slots[id.0].square = to;
        self.occupancy[to.index()] = Some(id);
    }

    pub(crate) fn set_captured(&mut self, id: PieceId, captured: bool) {
        let square = self.slots[id.0].square;
        self.slots[id.0].captured = captured;
        if captured {
            if self.occupancy[square.index()] == Some(id) {
                self.occupancy[square.index()] = None;
            }
        } else {
            self.occupancy[square.index()] = Some(id);
        }
    }

    /// Temporarily move `id` to `to`, soft-capturing the occupant and an
    /// optional extra victim (the pawn taken en passant).
    ///
    /// Touches nothing but positions and liveness; undo with [`Self::restore`].
    pub fn probe(&mut self, id: PieceId, to: Square, extra_victim: Option<PieceId>) -> Probe {
        let from = self.slots[id.0].square;
        let occupant = self.id_at(to).filter(|&other| other != id);
        let displaced = [occupant, extra_victim];
        for victim in displaced.into_iter().flatten() {
            self.set_captured(victim, true);
        }
        self.relocate(id, to);
        Probe {
            piece: id,
            from,
            displaced,
        }
    }

    pub fn restore(&mut self, probe: Probe) {
        self.relocate(probe.piece, probe.from);
        for victim in probe.displaced.into_iter().flatten() {
            self.set_captured(victim, false);
        }
    }
}
