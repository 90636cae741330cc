//! Game phase from remaining non-pawn material.

use sable_core::{Board, Piece};

/// Phase of a full starting complement of pieces.
pub const MAX_PHASE: i32 = 24;

/// Phase weight per piece kind, indexed by `Piece as usize`.
///
/// Knight and bishop 1, rook 2, queen 4; pawns and kings do not count.
pub const PHASE_WEIGHT: [i32; 6] = [0, 1, 1, 2, 4, 0];

/// Phase in `0..=MAX_PHASE`; extra promoted pieces cannot push it past the cap.
pub fn game_phase(board: &Board) -> i32 {
    let phase: i32 = Piece::ALL
        .iter()
        .map(|&piece| board.pieces(piece).len() as i32 * PHASE_WEIGHT[piece as usize])
        .sum();
    phase.min(MAX_PHASE)
}
